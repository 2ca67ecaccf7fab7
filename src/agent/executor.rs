//! Query Execution
//!
//! Runs a candidate against the bound connection. SQL-level failures are
//! returned as values; the fault discriminator separates them from
//! infrastructure faults.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{QueryLimits, SharedDatabase};
use crate::types::{ExecutionFault, ResultSet};

/// A generated SQL string and the attempt that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub sql: String,
    /// Zero-based attempt index
    pub attempt: u32,
    /// Planner's free-text reasoning, when it gave one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Candidate {
    pub fn new(sql: impl Into<String>, attempt: u32) -> Self {
        Self {
            sql: sql.into(),
            attempt,
            rationale: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        let rationale = rationale.into();
        self.rationale = Some(rationale).filter(|r| !r.trim().is_empty());
        self
    }
}

/// A rejected candidate with the engine's raw message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub message: String,
    pub candidate: Candidate,
    pub fault: ExecutionFault,
}

impl ExecutionError {
    pub fn is_infrastructure(&self) -> bool {
        self.fault == ExecutionFault::Infrastructure
    }
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type ExecutionResult = std::result::Result<ResultSet, ExecutionError>;

/// Executes candidates against one bound connection
pub trait QueryExecutor: Send + Sync {
    fn execute(&self, candidate: &Candidate) -> ExecutionResult;
}

/// SQLite executor with a row cap and statement timeout
pub struct DatabaseExecutor {
    db: SharedDatabase,
    limits: QueryLimits,
}

impl DatabaseExecutor {
    pub fn new(db: SharedDatabase, limits: QueryLimits) -> Self {
        Self { db, limits }
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }
}

impl QueryExecutor for DatabaseExecutor {
    fn execute(&self, candidate: &Candidate) -> ExecutionResult {
        debug!(attempt = candidate.attempt, "Executing: {}", candidate.sql);
        self.db
            .run_query(&candidate.sql, self.limits)
            .map_err(|failure| ExecutionError {
                message: failure.message,
                candidate: candidate.clone(),
                fault: failure.fault,
            })
    }
}
