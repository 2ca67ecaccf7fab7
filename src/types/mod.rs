//! Core Types
//!
//! Shared data model: the failure taxonomy, the database schema, and query results.

pub mod error;
pub mod result;
pub mod schema;

pub use error::{
    ClassifiedError, ErrorClassifier, ErrorKind, InsightError, Result, ResultExt,
};
pub use result::{ExecutionFault, ResultSet, Row, display_value};
pub use schema::{Column, Schema, Table, TableKind};
