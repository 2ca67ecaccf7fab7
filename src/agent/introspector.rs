//! Schema Introspection
//!
//! Reads table and column metadata from the database catalog. Never touches
//! row data.

use tracing::info;

use crate::storage::Database;
use crate::types::{InsightError, Result, Schema};

/// Source of a database schema
pub trait SchemaIntrospector: Send + Sync {
    /// Read the catalog. Fails with `InsightError::Connection` when the
    /// handle cannot be used.
    fn inspect(&self) -> Result<Schema>;
}

impl SchemaIntrospector for Database {
    fn inspect(&self) -> Result<Schema> {
        let tables = self.read_catalog().map_err(|e| match e {
            InsightError::Connection(_) => e,
            other => InsightError::Connection(format!(
                "unable to read schema from {}: {}",
                self.path().display(),
                other
            )),
        })?;

        let schema = Schema::new(tables);
        info!(
            "Introspected {} tables ({} columns) from {}",
            schema.tables.len(),
            schema.column_count(),
            self.path().display()
        );
        Ok(schema)
    }
}
