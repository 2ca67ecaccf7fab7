//! Agent Orchestration
//!
//! The question-answering core: introspect once, then plan, execute and
//! repair queries under a bounded retry budget while streaming a reasoning
//! trace.
//!
//! ## Components
//!
//! - [`introspector`]: catalog read, once per session
//! - [`planner`]: question + schema + failures to a SQL candidate
//! - [`executor`]: row-capped, time-bounded statement execution
//! - [`correction`]: the self-correction state machine
//! - [`trace`]: thought/action/observation steps and subscribers
//! - [`session`], [`registry`]: per-session ownership and soft/hard reset

pub mod answer;
pub mod correction;
pub mod executor;
pub mod introspector;
pub mod planner;
pub mod registry;
pub mod session;
pub mod trace;

pub use answer::render_answer;
pub use correction::{QuestionOutcome, SelfCorrectionLoop};
pub use executor::{Candidate, DatabaseExecutor, ExecutionError, ExecutionResult, QueryExecutor};
pub use introspector::SchemaIntrospector;
pub use planner::QueryPlanner;
pub use registry::{SessionFactory, SessionRegistry, SqliteSessionFactory};
pub use session::{AgentSession, Exchange};
pub use trace::{
    ChannelSubscriber, NullSubscriber, StepKind, TraceEmitter, TraceStep, TraceSubscriber,
};
