//! Self-Correction Loop
//!
//! Bounded state machine tying planner and executor together:
//!
//! ```text
//! Planning ──► Executing ──► Succeeded
//!    ▲             │
//!    │             ├──► Failed     (terminal kind or budget exhausted)
//!    └─ Retrying ◄─┘               (retryable kind, budget remains)
//! ```
//!
//! `attempt` counts execution failures. The loop retries while
//! `attempt < max_attempts`, so at most `max_attempts` statements run.

use serde::Serialize;
use tracing::{info, warn};

use crate::agent::answer::render_answer;
use crate::agent::executor::{Candidate, ExecutionError, QueryExecutor};
use crate::agent::planner::QueryPlanner;
use crate::agent::session::Exchange;
use crate::agent::trace::{TraceEmitter, TraceStep, TraceSubscriber, truncate_chars};
use crate::constants::agent::MAX_OBSERVATION_CHARS;
use crate::types::{ClassifiedError, ErrorClassifier, ErrorKind, ResultSet, Schema};

// =============================================================================
// Outcome
// =============================================================================

/// Final record of one question
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuestionOutcome {
    Succeeded {
        answer: String,
        result: ResultSet,
        candidate: Candidate,
        trace: Vec<TraceStep>,
        /// Failed executions before the winning one
        attempt: u32,
        executions: u32,
    },
    Failed {
        error: ClassifiedError,
        trace: Vec<TraceStep>,
        attempt: u32,
        executions: u32,
    },
}

impl QuestionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn trace(&self) -> &[TraceStep] {
        match self {
            Self::Succeeded { trace, .. } | Self::Failed { trace, .. } => trace,
        }
    }

    pub fn attempt(&self) -> u32 {
        match self {
            Self::Succeeded { attempt, .. } | Self::Failed { attempt, .. } => *attempt,
        }
    }

    pub fn executions(&self) -> u32 {
        match self {
            Self::Succeeded { executions, .. } | Self::Failed { executions, .. } => *executions,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Succeeded { answer, .. } => Some(answer),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Succeeded { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Succeeded { candidate, .. } => Some(candidate),
            Self::Failed { .. } => None,
        }
    }
}

// =============================================================================
// State Machine
// =============================================================================

#[derive(Debug)]
enum LoopState {
    Planning,
    Executing(Candidate),
    Retrying(ClassifiedError),
    Succeeded {
        candidate: Candidate,
        result: ResultSet,
    },
    Failed(ClassifiedError),
}

impl LoopState {
    fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed(_))
    }
}

/// Mutable bookkeeping for one question
struct Progress<'s> {
    attempt: u32,
    executions: u32,
    failures: Vec<ExecutionError>,
    trace: TraceEmitter<'s>,
}

pub struct SelfCorrectionLoop<'a> {
    planner: &'a QueryPlanner,
    executor: &'a dyn QueryExecutor,
    schema: &'a Schema,
    history: &'a [Exchange],
    max_attempts: u32,
}

impl<'a> SelfCorrectionLoop<'a> {
    pub fn new(
        planner: &'a QueryPlanner,
        executor: &'a dyn QueryExecutor,
        schema: &'a Schema,
        max_attempts: u32,
    ) -> Self {
        Self {
            planner,
            executor,
            schema,
            history: &[],
            max_attempts: max_attempts.max(1),
        }
    }

    /// Past exchanges handed to the planner as context
    pub fn with_history(mut self, history: &'a [Exchange]) -> Self {
        self.history = history;
        self
    }

    /// Answer one question, streaming every trace step to `subscriber`.
    pub async fn run(&self, question: &str, subscriber: &dyn TraceSubscriber) -> QuestionOutcome {
        let mut progress = Progress {
            attempt: 0,
            executions: 0,
            failures: Vec::new(),
            trace: TraceEmitter::new().with_subscriber(subscriber),
        };

        let mut state = LoopState::Planning;
        while !state.is_terminal() {
            state = self.step(state, question, &mut progress).await;
        }

        let Progress {
            attempt,
            executions,
            trace,
            ..
        } = progress;
        let trace = trace.into_steps();

        match state {
            LoopState::Succeeded { candidate, result } => {
                info!(attempt, executions, rows = result.len(), "Question answered");
                QuestionOutcome::Succeeded {
                    answer: render_answer(&result),
                    result,
                    candidate,
                    trace,
                    attempt,
                    executions,
                }
            }
            LoopState::Failed(error) => {
                info!(attempt, executions, kind = %error.kind, "Question failed");
                QuestionOutcome::Failed {
                    error,
                    trace,
                    attempt,
                    executions,
                }
            }
            // unreachable: the while loop exits only on a terminal state
            other => QuestionOutcome::Failed {
                error: ClassifiedError::new(
                    ErrorKind::Unknown,
                    format!("loop stopped in non-terminal state {:?}", other),
                ),
                trace,
                attempt,
                executions,
            },
        }
    }

    async fn step(&self, state: LoopState, question: &str, p: &mut Progress<'_>) -> LoopState {
        match state {
            LoopState::Planning => self.plan(question, p).await,
            LoopState::Executing(candidate) => self.execute(candidate, p),
            LoopState::Retrying(error) => {
                warn!(
                    attempt = p.attempt,
                    max_attempts = self.max_attempts,
                    kind = %error.kind,
                    "Retrying after failed query"
                );
                LoopState::Planning
            }
            terminal => terminal,
        }
    }

    async fn plan(&self, question: &str, p: &mut Progress<'_>) -> LoopState {
        let thought = match p.failures.last() {
            None => format!("Planning a SQL query for: {}", question),
            Some(last) => format!(
                "Attempt {} of {}: revising the query to fix: {}",
                p.attempt + 1,
                self.max_attempts,
                truncate_chars(&last.message, MAX_OBSERVATION_CHARS)
            ),
        };
        p.trace.thought(thought, p.attempt);

        match self
            .planner
            .plan(question, self.schema, &p.failures, self.history)
            .await
        {
            Ok(candidate) => {
                if let Some(rationale) = &candidate.rationale {
                    p.trace.thought(rationale.clone(), p.attempt);
                }
                p.trace.action(candidate.sql.clone(), p.attempt);
                LoopState::Executing(candidate)
            }
            Err(error) => {
                p.trace.observation(
                    format!(
                        "Planner failed [{}]: {}",
                        error.kind,
                        truncate_chars(&error.raw, MAX_OBSERVATION_CHARS)
                    ),
                    p.attempt,
                );
                LoopState::Failed(error)
            }
        }
    }

    fn execute(&self, candidate: Candidate, p: &mut Progress<'_>) -> LoopState {
        p.executions += 1;
        match self.executor.execute(&candidate) {
            Ok(result) => {
                let noun = if result.len() == 1 { "row" } else { "rows" };
                let mut observation = format!("Query succeeded: {} {}", result.len(), noun);
                if result.truncated {
                    observation.push_str(" (truncated at the row limit)");
                }
                p.trace.observation(observation, candidate.attempt);
                LoopState::Succeeded { candidate, result }
            }
            Err(failure) => {
                let error = if failure.is_infrastructure() {
                    ClassifiedError::new(ErrorKind::ConnectionFailure, failure.message.clone())
                } else {
                    ErrorClassifier::classify(&failure.message)
                };
                p.trace.observation(
                    format!(
                        "Query failed [{}]: {}",
                        error.kind,
                        truncate_chars(&error.raw, MAX_OBSERVATION_CHARS)
                    ),
                    candidate.attempt,
                );

                p.attempt += 1;
                p.failures.push(failure);

                if error.is_retryable() && p.attempt < self.max_attempts {
                    LoopState::Retrying(error)
                } else {
                    LoopState::Failed(error)
                }
            }
        }
    }
}
