//! Session Registry
//!
//! Owns at most one live `AgentSession` per caller-chosen key. An unchanged
//! connection config returns the existing session; a changed one tears it
//! down and builds a new one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::agent::executor::DatabaseExecutor;
use crate::agent::planner::QueryPlanner;
use crate::agent::session::AgentSession;
use crate::ai::{TimeoutConfig, create_provider};
use crate::config::{AgentConfig, ConnectionConfig};
use crate::storage::{Database, QueryLimits};
use crate::types::Result;

/// Builds a fully bound session for a connection config
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn create(&self, config: &ConnectionConfig) -> Result<AgentSession>;
}

/// SQLite database + configured language-model provider
pub struct SqliteSessionFactory {
    settings: AgentConfig,
}

impl SqliteSessionFactory {
    pub fn new(settings: AgentConfig) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for SqliteSessionFactory {
    async fn create(&self, config: &ConnectionConfig) -> Result<AgentSession> {
        let timeouts = TimeoutConfig::from_connection(config);
        let db = Arc::new(Database::open(&config.database)?);
        let provider = create_provider(&config.provider)?;
        let planner = QueryPlanner::new(provider, config.database.row_cap)
            .with_timeout(timeouts.llm_request);
        let executor = Arc::new(DatabaseExecutor::new(
            db.clone(),
            QueryLimits {
                row_cap: config.database.row_cap,
                timeout: timeouts.query,
            },
        ));

        AgentSession::bind(config.clone(), &*db, planner, executor, self.settings)
    }
}

pub struct SessionRegistry<F: SessionFactory> {
    factory: F,
    sessions: Mutex<HashMap<String, Arc<AgentSession>>>,
}

impl<F: SessionFactory> SessionRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Return the live session for `key`, creating or recreating it as needed.
    ///
    /// The registry lock is held across creation, so concurrent callers for
    /// the same key never bind twice.
    pub async fn get_or_create(
        &self,
        key: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<AgentSession>> {
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(key) {
            if existing.config() == config {
                return Ok(existing.clone());
            }
            info!(key, session = %existing.id(), "Connection config changed, recreating session");
            sessions.remove(key);
        }

        let session = Arc::new(self.factory.create(config).await?);
        info!(key, session = %session.id(), "Session created");
        sessions.insert(key.to_string(), session.clone());
        Ok(session)
    }

    /// Soft reset: history and trace cleared, schema and bindings kept.
    pub async fn reset(&self, session: &Arc<AgentSession>) -> Arc<AgentSession> {
        session.clear().await;
        session.clone()
    }

    /// Drop the session for `key`
    pub async fn remove(&self, key: &str) -> Option<Arc<AgentSession>> {
        self.sessions.lock().await.remove(key)
    }

    pub async fn get(&self, key: &str) -> Option<Arc<AgentSession>> {
        self.sessions.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
