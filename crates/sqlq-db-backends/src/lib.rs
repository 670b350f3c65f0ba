//! # sqlq-db-backends
//!
//! Execution backends for sqlq. The [`Connection`] trait runs statements
//! rendered by `sqlq-db` and maps result rows back to
//! [`Row`](sqlq_db::query::Row).
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)

#![allow(clippy::doc_markdown)]

pub mod base;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::Connection;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;
