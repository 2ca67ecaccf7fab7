//! Unified Timeout Configuration
//!
//! Bounds the two suspension points of a question: the provider call and
//! the database round-trip. The provider-call wrapper turns an overlong stall
//! into `InsightError::Timeout`, which the planner reports as a provider fault.
//!
//! ## Usage
//!
//! ```ignore
//! use insightsql::ai::timeout::{TimeoutConfig, with_timeout};
//!
//! let config = TimeoutConfig::default();
//! let completion = with_timeout(
//!     config.llm_request,
//!     provider.complete(&prompt),
//!     "LLM request"
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::constants::{execution, network};
use crate::types::{InsightError, Result};

/// Timeout configuration for the agent's external calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Timeout for one provider call (default: 60 seconds)
    pub llm_request: Duration,
    /// Timeout for one SQL statement (default: 15 seconds)
    pub query: Duration,
    /// Timeout for acquiring the session connection (default: 5 seconds)
    pub connection: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            llm_request: Duration::from_secs(network::DEFAULT_TIMEOUT_SECS),
            query: Duration::from_secs(execution::DEFAULT_QUERY_TIMEOUT_SECS),
            connection: Duration::from_secs(execution::DEFAULT_POOL_TIMEOUT_SECS),
        }
    }
}

impl TimeoutConfig {
    /// Build from the loaded configuration
    pub fn from_config(config: &crate::config::Config) -> Self {
        Self::from_connection(&config.connection())
    }

    /// Build from a session's connection config
    pub fn from_connection(config: &crate::config::ConnectionConfig) -> Self {
        Self {
            llm_request: Duration::from_secs(config.provider.timeout_secs),
            query: config.database.query_timeout(),
            connection: config.database.pool_timeout(),
        }
    }
}

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(InsightError::timeout(operation_name, timeout)),
    }
}
