//! Core error types for sqlq.
//!
//! This module provides the [`QueryError`] enum shared by every crate in the
//! workspace. Statement-building errors are programmer or configuration
//! errors: they are returned synchronously from the call that detected them
//! and are never retried.

use thiserror::Error;

/// The primary error type for sqlq.
///
/// The first group of variants covers statement building (lookups, condition
/// trees, identifiers, statement state). The remaining variants cover
/// configuration and execution through a database driver.
#[derive(Error, Debug)]
pub enum QueryError {
    // ── Statement building ───────────────────────────────────────────

    /// A lookup suffix is not part of the vocabulary the adapter can render.
    #[error("Unsupported lookup: {0}")]
    UnsupportedLookup(String),

    /// A condition value is not a raw fragment, a lookup mapping, or a nested tree.
    #[error("Unsupported condition type: {0}")]
    UnsupportedConditionType(String),

    /// A relation path could not be resolved against the schema.
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),

    /// An identifier could not be parsed for quoting.
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// The statement cannot be rendered in its current state.
    #[error("Invalid statement state: {0}")]
    InvalidStatementState(String),

    /// A lookup received a value of the wrong shape (e.g. `range` with one bound).
    #[error("Invalid lookup value: {0}")]
    InvalidLookupValue(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Execution ────────────────────────────────────────────────────

    /// The database rejected a statement.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl QueryError {
    /// Returns `true` for errors raised while building SQL text, as opposed to
    /// configuration or execution failures.
    pub const fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedLookup(_)
                | Self::UnsupportedConditionType(_)
                | Self::UnknownRelation(_)
                | Self::MalformedIdentifier(_)
                | Self::InvalidStatementState(_)
                | Self::InvalidLookupValue(_)
        )
    }
}

/// A convenience type alias for `Result<T, QueryError>`.
pub type QueryResult<T> = Result<T, QueryError>;
