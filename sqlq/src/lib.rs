//! # sqlq
//!
//! A dialect-aware SQL query builder with Django-style lookups and
//! composable `Q` condition trees for MySQL, PostgreSQL and SQLite.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on
//! `sqlq` for everything, or on the individual crates for finer-grained
//! control.
//!
//! ```
//! use sqlq::prelude::*;
//!
//! let settings = Settings::default();
//! let factory = QueryBuilderFactory::from_settings(&settings, "default").unwrap();
//! let (sql, params) = factory
//!     .query_builder()
//!     .set_from("user")
//!     .filter(Q::and([("name__icontains", "ann")]))
//!     .build()
//!     .unwrap();
//! assert_eq!(sql, "SELECT * FROM \"user\" WHERE \"name\" LIKE ? ESCAPE '\\'");
//! assert_eq!(params, vec![Value::from("%ann%")]);
//! ```

/// Error types, settings, and logging setup.
pub use sqlq_core as core;

/// Dialect adapters, lookups, condition trees, and the query builder.
pub use sqlq_db as db;

/// Execution backends.
pub use sqlq_db_backends as db_backends;

/// The types most programs need.
pub mod prelude {
    pub use sqlq_core::logging::setup_logging;
    pub use sqlq_core::{QueryError, QueryResult, Settings};
    pub use sqlq_db::adapters::Adapter;
    pub use sqlq_db::query::{
        Aggregation, Connector, Expression, Join, JoinType, LookupBuilder, Operand, OrderBy,
        ParamMode, QueryBuilder, QueryBuilderFactory, Row, Schema, SelectItem, StatementType,
        TableDef, Q,
    };
    pub use sqlq_db::Value;
    pub use sqlq_db_backends::Connection;
    #[cfg(feature = "sqlite")]
    pub use sqlq_db_backends::SqliteConnection;
}

// Third-party crates used in the public API.
pub use async_trait;
pub use serde_json;
pub use tracing;
