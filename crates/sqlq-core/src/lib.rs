//! # sqlq-core
//!
//! Core types, settings, and error types for sqlq. This crate has no
//! dependency on the query layer and provides the foundation for the other
//! crates in the workspace.
//!
//! ## Modules
//!
//! - [`error`] - The [`QueryError`] taxonomy and result alias
//! - [`settings`] - Settings and per-alias database configuration
//! - [`settings_loader`] - TOML/JSON loading with environment overrides
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{QueryError, QueryResult};
pub use settings::{DatabaseSettings, Settings};
