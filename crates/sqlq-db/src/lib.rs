//! # sqlq-db
//!
//! Query layer for sqlq. Turns lookups such as `name__icontains`, composable
//! [`Q`] trees and fluent [`QueryBuilder`] calls into SQL for MySQL,
//! PostgreSQL and SQLite.
//!
//! ## Module Overview
//!
//! - [`adapters`] - the [`Adapter`] trait and the three dialects
//! - [`query`] - lookups, condition trees, expressions and the builder
//! - [`value`] - the backend-agnostic [`Value`] enum
//!
//! Nothing here performs I/O. A statement is rendered either with values
//! inlined as literals ([`QueryBuilder::to_sql`]) or with placeholders and a
//! parameter list ([`QueryBuilder::to_sql_with_params`]).

// - too_many_lines: statement compilation is one long match per clause
// - format_push_string: format! with push_str is clearer than write! for SQL generation
// - doc_markdown: SQL keywords in docs are not code items
// - return_self_not_must_use: builder methods carry #[must_use] where it matters
#![allow(clippy::too_many_lines)]
#![allow(clippy::format_push_string)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::result_large_err)]

pub mod adapters;
pub mod query;
pub mod value;

pub use adapters::{adapter_for_engine, Adapter, ColumnType, MySqlAdapter, PostgresAdapter, SqliteAdapter};
pub use query::{
    Aggregation, Expression, JoinType, LookupBuilder, LookupOp, Operand, OrderBy, ParamMode,
    QueryBuilder, QueryBuilderFactory, Row, Schema, StatementType, TableDef, Q,
};
pub use value::Value;
