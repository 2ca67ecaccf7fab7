//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/insightsql/) and project (.insightsql/) level configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::ProviderConfig;
use crate::constants::{self, agent, execution, network};
use crate::types::{InsightError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Database location and execution limits
    pub database: DatabaseConfig,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Self-correction loop settings
    pub agent: AgentConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `InsightError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(InsightError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(InsightError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.database.row_cap == 0 {
            return Err(InsightError::Config(
                "Database row_cap must be greater than 0".to_string(),
            ));
        }

        if self.database.query_timeout_secs == 0 {
            return Err(InsightError::Config(
                "Database query_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.agent.max_attempts == 0 {
            return Err(InsightError::Config(
                "Agent max_attempts must be at least 1".to_string(),
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(InsightError::Config("Database url is empty".to_string()));
        }

        Ok(())
    }

    /// Connection config for the session registry
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            database: self.database.clone(),
            provider: self.llm.provider_config(),
        }
    }
}

// =============================================================================
// Database Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path or `sqlite:///path` URI
    pub url: String,

    /// Maximum rows materialized per query
    pub row_cap: usize,

    /// Statement execution timeout in seconds
    pub query_timeout_secs: u64,

    /// Timeout for acquiring the session connection in seconds
    pub pool_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: constants::DEFAULT_DATABASE_URL.to_string(),
            row_cap: execution::DEFAULT_ROW_CAP,
            query_timeout_secs: execution::DEFAULT_QUERY_TIMEOUT_SECS,
            pool_timeout_secs: execution::DEFAULT_POOL_TIMEOUT_SECS,
        }
    }
}

impl DatabaseConfig {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "gemini", "openai", "ollama"
    pub provider: String,

    /// Model name
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature passed through to the provider
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// API key. Never serialized to output.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: network::DEFAULT_TEMPERATURE,
            max_tokens: network::DEFAULT_MAX_TOKENS,
            api_base: None,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            provider: self.provider.clone(),
            model: Some(self.model.clone()).filter(|m| !m.is_empty()),
            timeout_secs: self.timeout_secs,
            temperature: self.temperature,
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

// =============================================================================
// Agent Configuration
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum query attempts per question
    pub max_attempts: u32,

    /// Past exchanges passed to the planner as context (0 = one-shot)
    pub history_context: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: agent::DEFAULT_MAX_ATTEMPTS,
            history_context: agent::DEFAULT_HISTORY_CONTEXT,
        }
    }
}

// =============================================================================
// Connection Configuration
// =============================================================================

/// Everything a session is bound to. A change in any field forces a new session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
}

impl ConnectionConfig {
    pub fn new(database: DatabaseConfig, provider: ProviderConfig) -> Self {
        Self { database, provider }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.agent.max_attempts, 3);
        assert_eq!(config.database.row_cap, 200);
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.agent.max_attempts = 0;
        assert!(matches!(config.validate(), Err(InsightError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_is_redacted_and_not_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("secret-key".to_string());

        let debug = format!("{:?}", config.llm);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn test_connection_config_changes_with_api_key() {
        let mut config = Config::default();
        let before = config.connection();
        config.llm.api_key = Some("new-key".to_string());
        assert_ne!(before, config.connection());
    }
}
