//! InsightSQL - Natural-Language Questions over SQLite
//!
//! Turns a plain-language question into SQL with a language model, runs it
//! against a read-only database and repairs failing queries under a bounded
//! retry budget, streaming a thought/action/observation trace as it goes.
//!
//! ## Core Features
//!
//! - **Self-Correction Loop**: failed queries are classified and re-planned
//! - **Error Taxonomy**: quota, provider, connection, syntax, semantic, unknown
//! - **Live Reasoning Trace**: synchronous subscribers or a tokio channel
//! - **Session Registry**: one live agent per session, soft and hard reset
//! - **Provider Choice**: Gemini, OpenAI-compatible and Ollama backends
//!
//! ## Quick Start
//!
//! ```ignore
//! use insightsql::{Config, SessionRegistry, SqliteSessionFactory};
//! use insightsql::agent::NullSubscriber;
//!
//! let config = Config::default();
//! let registry = SessionRegistry::new(SqliteSessionFactory::new(config.agent));
//! let session = registry.get_or_create("user-1", &config.connection()).await?;
//! let outcome = session.ask("How many dresses are in stock?", &NullSubscriber).await;
//! println!("{}", outcome.answer().unwrap_or("no answer"));
//! ```
//!
//! ## Modules
//!
//! - [`agent`]: planner, executor, correction loop, trace, sessions
//! - [`ai`]: LLM provider abstraction and call timeouts
//! - [`storage`]: read-only SQLite binding
//! - [`config`]: layered configuration
//! - [`types`]: schema, results and the error taxonomy

pub mod agent;
pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod storage;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{AgentConfig, Config, ConfigLoader, ConnectionConfig, DatabaseConfig, LlmConfig};

// Error Types
pub use types::error::{
    ClassifiedError, ErrorClassifier, ErrorKind, InsightError, Result, ResultExt,
};

// Storage
pub use storage::{Database, SharedDatabase};

// =============================================================================
// Agent Re-exports
// =============================================================================

pub use agent::{
    AgentSession, Candidate, QueryPlanner, QuestionOutcome, SchemaIntrospector,
    SelfCorrectionLoop, SessionFactory, SessionRegistry, SqliteSessionFactory, TraceStep,
    TraceSubscriber,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{Completion, LlmProvider, SharedProvider, TimeoutConfig, create_provider, with_timeout};
