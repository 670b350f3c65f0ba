//! The execution interface.
//!
//! A [`Connection`] runs SQL text produced by the query layer. Builders are
//! rendered in bind mode, so the driver receives the statement and its
//! parameters separately.

use std::sync::Arc;

use sqlq_core::{QueryError, QueryResult};
use sqlq_db::adapters::Adapter;
use sqlq_db::query::{LookupBuilder, QueryBuilder, Row};
use sqlq_db::value::Value;

/// A database connection that executes rendered statements.
///
/// All methods are async because database operations are I/O-bound;
/// synchronous drivers such as `rusqlite` run on the blocking pool.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Returns the vendor name (`"sqlite"`, `"postgresql"`, `"mysql"`).
    fn vendor(&self) -> &str;

    /// Returns the dialect adapter matching this connection.
    fn adapter(&self) -> Arc<dyn Adapter>;

    /// Returns the lookup builder handed to new query builders.
    fn lookup_builder(&self) -> Arc<LookupBuilder> {
        Arc::new(LookupBuilder::new())
    }

    /// Executes a statement that does not return rows and returns the
    /// number of affected rows.
    async fn execute(&self, sql: &str, params: &[Value]) -> QueryResult<u64>;

    /// Executes a query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> QueryResult<Vec<Row>>;

    /// Executes a query that must return exactly one row.
    async fn query_one(&self, sql: &str, params: &[Value]) -> QueryResult<Row> {
        let mut rows = self.query(sql, params).await?;
        match rows.len() {
            1 => Ok(rows.remove(0)),
            n => Err(QueryError::DatabaseError(format!(
                "expected exactly one row, got {n}"
            ))),
        }
    }

    /// A fresh builder for this connection's dialect.
    fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.adapter(), self.lookup_builder())
    }

    /// Renders `builder` with placeholders and executes it.
    async fn execute_builder(&self, builder: &QueryBuilder) -> QueryResult<u64> {
        let (sql, params) = builder.to_sql_with_params()?;
        self.execute(&sql, &params).await
    }

    /// Renders `builder` with placeholders and returns all rows.
    async fn fetch_all(&self, builder: &QueryBuilder) -> QueryResult<Vec<Row>> {
        let (sql, params) = builder.to_sql_with_params()?;
        self.query(&sql, &params).await
    }
}
