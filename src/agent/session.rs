//! Agent Session
//!
//! One schema, one bound planner + executor pair and the exchange history of
//! a logical user session. Questions on a session are serialized.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::agent::correction::{QuestionOutcome, SelfCorrectionLoop};
use crate::agent::executor::QueryExecutor;
use crate::agent::introspector::SchemaIntrospector;
use crate::agent::planner::QueryPlanner;
use crate::agent::trace::{TraceStep, TraceSubscriber};
use crate::config::{AgentConfig, ConnectionConfig};
use crate::types::{Result, Schema};

/// One answered (or failed) question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    /// Answer text, or the failure hint
    pub answer: String,
    /// SQL that produced the answer
    pub sql: Option<String>,
    pub succeeded: bool,
    pub asked_at: DateTime<Utc>,
}

impl Exchange {
    fn from_outcome(question: &str, outcome: &QuestionOutcome, asked_at: DateTime<Utc>) -> Self {
        match outcome {
            QuestionOutcome::Succeeded {
                answer, candidate, ..
            } => Self {
                question: question.to_string(),
                answer: answer.clone(),
                sql: Some(candidate.sql.clone()),
                succeeded: true,
                asked_at,
            },
            QuestionOutcome::Failed { error, .. } => Self {
                question: question.to_string(),
                answer: format!("[{}] {}", error.kind, error.hint),
                sql: None,
                succeeded: false,
                asked_at,
            },
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    history: Vec<Exchange>,
    last_trace: Vec<TraceStep>,
}

pub struct AgentSession {
    id: Uuid,
    config: ConnectionConfig,
    schema: Arc<Schema>,
    planner: QueryPlanner,
    executor: Arc<dyn QueryExecutor>,
    settings: AgentConfig,
    state: Mutex<SessionState>,
    created_at: DateTime<Utc>,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("id", &self.id)
            .field("database", &self.config.database.url)
            .field("provider", &self.config.provider.provider)
            .field("tables", &self.schema.tables.len())
            .finish()
    }
}

impl AgentSession {
    /// Bind a session. The schema is introspected here, exactly once.
    pub fn bind(
        config: ConnectionConfig,
        introspector: &dyn SchemaIntrospector,
        planner: QueryPlanner,
        executor: Arc<dyn QueryExecutor>,
        settings: AgentConfig,
    ) -> Result<Self> {
        let schema = Arc::new(introspector.inspect()?);
        let session = Self {
            id: Uuid::new_v4(),
            config,
            schema,
            planner,
            executor,
            settings,
            state: Mutex::new(SessionState::default()),
            created_at: Utc::now(),
        };
        info!(
            session = %session.id,
            tables = session.schema.tables.len(),
            provider = session.planner.provider_name(),
            model = session.planner.model(),
            "Session bound"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn settings(&self) -> AgentConfig {
        self.settings
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Answer a question. A second caller waits until the first finishes.
    pub async fn ask(&self, question: &str, subscriber: &dyn TraceSubscriber) -> QuestionOutcome {
        let mut state = self.state.lock().await;
        let asked_at = Utc::now();

        let context_start = state
            .history
            .len()
            .saturating_sub(self.settings.history_context);
        let outcome = SelfCorrectionLoop::new(
            &self.planner,
            &*self.executor,
            &self.schema,
            self.settings.max_attempts,
        )
        .with_history(&state.history[context_start..])
        .run(question, subscriber)
        .await;

        state.last_trace = outcome.trace().to_vec();
        state
            .history
            .push(Exchange::from_outcome(question, &outcome, asked_at));
        outcome
    }

    /// Clear history and trace; schema and bindings stay.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.history.clear();
        state.last_trace.clear();
        info!(session = %self.id, "Session history cleared");
    }

    pub async fn history(&self) -> Vec<Exchange> {
        self.state.lock().await.history.clone()
    }

    pub async fn last_trace(&self) -> Vec<TraceStep> {
        self.state.lock().await.last_trace.clone()
    }
}
