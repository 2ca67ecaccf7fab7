//! AI Integration Layer
//!
//! Language model providers and the call-timeout wrapper used by the planner.

pub mod provider;
pub mod timeout;

pub use provider::{
    Completion, GeminiProvider, LlmProvider, OllamaProvider, OpenAiProvider, ProviderConfig,
    SharedProvider, TokenUsage, create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
