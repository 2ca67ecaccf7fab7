//! CLI Common Utilities
//!
//! Shared config loading and session setup for CLI commands.

use std::sync::Arc;

use crate::agent::{AgentSession, SessionRegistry, SqliteSessionFactory};
use crate::config::{Config, ConfigLoader, ConnectionConfig};
use crate::types::Result;

/// Registry key for the single terminal session
pub const CLI_SESSION_KEY: &str = "cli";

/// Command-line overrides applied on top of the layered config
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub database: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl ConnectionOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(db) = &self.database {
            config.database.url = db.clone();
        }
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
    }
}

/// Command execution context
pub struct CommandContext {
    pub config: Config,
    pub registry: SessionRegistry<SqliteSessionFactory>,
}

impl CommandContext {
    /// Load config, apply overrides and validate the result
    pub fn load(overrides: &ConnectionOverrides) -> Result<Self> {
        let mut config = ConfigLoader::load()?;
        overrides.apply(&mut config);
        config.validate()?;

        let registry = SessionRegistry::new(SqliteSessionFactory::new(config.agent));
        Ok(Self { config, registry })
    }

    pub fn connection(&self) -> ConnectionConfig {
        self.config.connection()
    }

    /// Connect (or reuse) the terminal session
    pub async fn session(&self) -> Result<Arc<AgentSession>> {
        self.registry
            .get_or_create(CLI_SESSION_KEY, &self.connection())
            .await
    }
}
