//! Builders pre-wired for one connection.
//!
//! A [`QueryBuilderFactory`] holds the adapter and lookup builder chosen for
//! a database alias and hands out fresh [`QueryBuilder`]s that share them.

use std::sync::Arc;

use sqlq_core::{QueryError, QueryResult, Settings};

use super::builder::QueryBuilder;
use super::compiler::ParamMode;
use super::lookups::LookupBuilder;
use super::schema::Schema;
use crate::adapters::{adapter_for_engine, Adapter};

/// Creates [`QueryBuilder`]s sharing one adapter and lookup builder.
///
/// # Examples
///
/// ```
/// use sqlq_core::Settings;
/// use sqlq_db::query::factory::QueryBuilderFactory;
///
/// let factory = QueryBuilderFactory::from_settings(&Settings::default(), "default").unwrap();
/// assert_eq!(factory.adapter().vendor(), "sqlite");
/// let sql = factory.query_builder().set_from("user").to_sql().unwrap();
/// assert_eq!(sql, "SELECT * FROM \"user\"");
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilderFactory {
    adapter: Arc<dyn Adapter>,
    lookups: Arc<LookupBuilder>,
    param_mode: ParamMode,
}

impl QueryBuilderFactory {
    /// Creates a factory from an adapter and a lookup builder.
    pub fn new(adapter: Arc<dyn Adapter>, lookups: Arc<LookupBuilder>) -> Self {
        Self {
            adapter,
            lookups,
            param_mode: ParamMode::default(),
        }
    }

    /// Creates a factory for the database registered under `alias`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::ConfigurationError`] if the alias is missing or
    /// its engine is not supported.
    pub fn from_settings(settings: &Settings, alias: &str) -> QueryResult<Self> {
        let database = settings.database(alias).ok_or_else(|| {
            QueryError::ConfigurationError(format!("no database configured for alias '{alias}'"))
        })?;
        let adapter = adapter_for_engine(&database.engine)?;
        tracing::debug!(alias, vendor = adapter.vendor(), "query builder factory ready");
        Ok(Self::new(adapter, Arc::new(LookupBuilder::new()))
            .with_param_mode(ParamMode::from_bind_flag(settings.bind_params)))
    }

    /// Resolves relation paths against `schema`, keeping field aliases.
    #[must_use]
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        let lookups = (*self.lookups).clone().with_schema(schema);
        self.lookups = Arc::new(lookups);
        self
    }

    /// Sets the mode used by [`QueryBuilder::build`].
    #[must_use]
    pub fn with_param_mode(mut self, mode: ParamMode) -> Self {
        self.param_mode = mode;
        self
    }

    /// The shared adapter.
    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    /// The shared lookup builder.
    pub fn lookup_builder(&self) -> &Arc<LookupBuilder> {
        &self.lookups
    }

    /// The configured parameter mode.
    pub const fn param_mode(&self) -> ParamMode {
        self.param_mode
    }

    /// A fresh builder.
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.adapter), Arc::clone(&self.lookups))
            .set_param_mode(self.param_mode)
    }
}
