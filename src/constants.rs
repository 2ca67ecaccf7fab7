//! Global Constants
//!
//! Centralized defaults for configuration and tuning.
//! These are operational starting points, not contractual limits.

/// Self-correction loop constants
pub mod agent {
    /// Maximum query attempts per question
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Past exchanges passed to the planner (0 = one-shot)
    pub const DEFAULT_HISTORY_CONTEXT: usize = 0;

    /// Characters of a raw error kept in trace observations
    pub const MAX_OBSERVATION_CHARS: usize = 500;
}

/// Query execution constants
pub mod execution {
    /// Maximum rows materialized per query
    pub const DEFAULT_ROW_CAP: usize = 200;

    /// Statement execution timeout (seconds)
    pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 15;

    /// Timeout for acquiring the session connection (seconds)
    pub const DEFAULT_POOL_TIMEOUT_SECS: u64 = 5;

    /// SQLite VM instructions between progress-handler checks
    pub const PROGRESS_HANDLER_OPS: i32 = 1_000;

    /// Rows shown when rendering a tabular answer
    pub const MAX_ANSWER_ROWS: usize = 20;
}

/// Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Default maximum output tokens
    pub const DEFAULT_MAX_TOKENS: usize = 2048;

    /// Default sampling temperature for SQL generation
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;
}

/// Database location default
pub const DEFAULT_DATABASE_URL: &str = "sqlite:///dresses.db";
