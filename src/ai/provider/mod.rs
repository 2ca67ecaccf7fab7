//! Language Model Providers
//!
//! The agent needs one capability from a model: `complete(prompt) -> text`.
//! Each backend turns that into its own wire format over [`http`], which also
//! maps non-success responses to `InsightError::ProviderStatus` so the status
//! code reaches the classifier as data.

mod gemini;
mod http;
mod ollama;
mod openai;

pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::network;
use crate::types::{InsightError, Result};

/// Token counts reported by the backend, zero when it reports none
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw text reply of one completion call
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    pub elapsed: Duration,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

pub type SharedProvider = Arc<dyn LlmProvider + Send + Sync>;

/// Backend selection and generation settings
///
/// The API key is never serialized and is redacted in debug output.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// "gemini", "openai" or "ollama"
    pub provider: String,
    pub model: Option<String>,
    pub timeout_secs: u64,
    /// Passed through unchanged
    pub temperature: f32,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    network::DEFAULT_MAX_TOKENS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: network::DEFAULT_TEMPERATURE,
            api_key: None,
            api_base: None,
            max_tokens: network::DEFAULT_MAX_TOKENS,
        }
    }
}

impl ProviderConfig {
    /// Explicit key, else the first set environment variable
    fn api_key_or_env(&self, vars: &[&str]) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| vars.iter().find_map(|v| std::env::var(v).ok()))
            .filter(|k| !k.trim().is_empty())
    }
}

/// Opaque completion capability used by the planner
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send one prompt and return the model's text reply.
    ///
    /// Rate limiting surfaces as `ProviderStatus { status: 429, .. }` or as
    /// raw text in `LlmApi`, never as a successful empty reply.
    async fn complete(&self, prompt: &str) -> Result<Completion>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "gemini" => Ok(Arc::new(GeminiProvider::new(config)?)),
        "openai" => Ok(Arc::new(OpenAiProvider::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config)?)),
        other => Err(InsightError::Config(format!(
            "Unknown provider: {}. Supported: gemini, openai, ollama",
            other
        ))),
    }
}
