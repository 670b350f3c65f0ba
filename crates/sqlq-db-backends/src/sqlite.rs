//! SQLite connection using `rusqlite`.
//!
//! [`SqliteConnection`] implements [`Connection`](crate::base::Connection)
//! by running `rusqlite` calls inside `tokio::task::spawn_blocking`.
//! An in-memory database (`:memory:`) is handy for tests.

use std::path::PathBuf;
use std::sync::Arc;

use sqlq_core::{DatabaseSettings, QueryError, QueryResult};
use sqlq_db::adapters::{Adapter, SqliteAdapter};
use sqlq_db::query::{LookupBuilder, Row};
use sqlq_db::value::Value;
use tokio::sync::Mutex;

use crate::base::Connection;

/// A SQLite connection.
///
/// The handle sits behind an async `Mutex`; statements run one at a time.
pub struct SqliteConnection {
    path: PathBuf,
    conn: Arc<Mutex<rusqlite::Connection>>,
    lookups: Arc<LookupBuilder>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Opens the database at `path`; `:memory:` creates an in-memory one.
    ///
    /// File databases are switched to WAL journaling.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::OperationalError`] if the database cannot be
    /// opened or configured.
    pub fn open(path: impl Into<PathBuf>) -> QueryResult<Self> {
        let path = path.into();
        let in_memory = path.to_str() == Some(":memory:");
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| QueryError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| QueryError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "opened SQLite database");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
            lookups: Arc::new(LookupBuilder::new()),
        })
    }

    /// Opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> QueryResult<Self> {
        Self::open(":memory:")
    }

    /// Opens the database described by a settings entry.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::ConfigurationError`] if the entry is not a
    /// SQLite engine, or the errors of [`open`](Self::open).
    pub fn from_config(config: &DatabaseSettings) -> QueryResult<Self> {
        let engine = config.engine.rsplit('.').next().unwrap_or(&config.engine);
        if !matches!(engine.to_ascii_lowercase().as_str(), "sqlite" | "sqlite3") {
            return Err(QueryError::ConfigurationError(format!(
                "engine '{}' is not a SQLite engine",
                config.engine
            )));
        }
        Self::open(&config.name)
    }

    /// Uses `lookups` (for example one carrying a schema) for new builders.
    #[must_use]
    pub fn with_lookup_builder(mut self, lookups: Arc<LookupBuilder>) -> Self {
        self.lookups = lookups;
        self
    }

    /// Returns the database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Binds `Value`s to a `rusqlite` statement.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> QueryResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Date(_)
                | Value::DateTime(_)
                | Value::DateTimeTz(_)
                | Value::Time(_)
                | Value::Uuid(_)
                | Value::Json(_) => stmt.raw_bind_parameter(idx, param.to_string().as_str()),
                Value::List(vals) => {
                    let json = serde_json::Value::Array(
                        vals.iter()
                            .map(|v| serde_json::Value::String(v.to_string()))
                            .collect(),
                    );
                    stmt.raw_bind_parameter(idx, json.to_string().as_str())
                }
            }
            .map_err(|e| QueryError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite::Row` into a [`Row`].
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> QueryResult<Row> {
        let values = (0..column_names.len())
            .map(|i| {
                let val_ref = sqlite_row
                    .get_ref(i)
                    .map_err(|e| QueryError::DatabaseError(format!("{e}")))?;
                Ok(match val_ref {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
                    rusqlite::types::ValueRef::Real(v) => Value::Float(v),
                    rusqlite::types::ValueRef::Text(b) => {
                        Value::String(String::from_utf8_lossy(b).to_string())
                    }
                    rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;
        Row::new(column_names.to_vec(), values)
    }
}

#[async_trait::async_trait]
impl Connection for SqliteConnection {
    fn vendor(&self) -> &str {
        "sqlite"
    }

    fn adapter(&self) -> Arc<dyn Adapter> {
        Arc::new(SqliteAdapter)
    }

    fn lookup_builder(&self) -> Arc<LookupBuilder> {
        Arc::clone(&self.lookups)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> QueryResult<u64> {
        tracing::debug!(sql, params = params.len(), "executing statement");
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| QueryError::DatabaseError(format!("{e}")))?;
            Self::bind_params(&mut stmt, &params)?;
            let count = stmt
                .raw_execute()
                .map_err(|e| QueryError::DatabaseError(format!("{e}")))?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| QueryError::DatabaseError(format!("Task join error: {e}")))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> QueryResult<Vec<Row>> {
        tracing::debug!(sql, params = params.len(), "running query");
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| QueryError::DatabaseError(format!("{e}")))?;

            let column_names: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();

            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows
                .next()
                .map_err(|e| QueryError::DatabaseError(format!("{e}")))?
            {
                rows.push(Self::convert_row(row, &column_names)?);
            }
            Ok(rows)
        })
        .await
        .map_err(|e| QueryError::DatabaseError(format!("Task join error: {e}")))?
    }
}
