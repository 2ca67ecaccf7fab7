//! Storage Layer
//!
//! Read-only SQLite binding used by the executor and the schema introspector.

pub mod database;

pub use database::{Database, QueryFailure, QueryLimits, resolve_location};

/// Database handle shared between a session's introspector and executor
pub type SharedDatabase = std::sync::Arc<Database>;
