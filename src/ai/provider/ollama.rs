//! Ollama client for locally served models (`/api/generate`, JSON mode)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use super::{Completion, LlmProvider, ProviderConfig, TokenUsage, http};
use crate::types::{InsightError, Result};

const DEFAULT_API_BASE: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3:latest";

#[derive(Debug)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base = validate_base(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE))?;

        Ok(Self {
            endpoint: format!("{}/api/generate", base),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http::client(config.timeout_secs)?,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
            options: Options {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        }
    }
}

/// http(s) only; a non-local host is allowed but logged
fn validate_base(base: &str) -> Result<String> {
    let url = url::Url::parse(base)
        .map_err(|e| InsightError::Config(format!("Invalid Ollama URL '{}': {}", base, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(InsightError::Config(format!(
            "Ollama URL must be http or https, got: {}",
            url.scheme()
        )));
    }
    if let Some(host) = url.host_str()
        && !matches!(host, "localhost" | "127.0.0.1" | "[::1]")
    {
        warn!("Ollama host {} is not local; questions and schema leave this machine", host);
    }
    Ok(http::trim_base(url.as_str()))
}

fn into_completion(reply: GenerateResponse) -> Result<Completion> {
    if reply.response.trim().is_empty() {
        return Err(InsightError::LlmApi("ollama reply is empty".to_string()));
    }
    Ok(Completion {
        usage: TokenUsage::new(reply.prompt_eval_count, reply.eval_count),
        text: reply.response,
        ..Default::default()
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        let started = Instant::now();
        let request = self.client.post(&self.endpoint);

        let reply: GenerateResponse =
            http::post_json("ollama", request, &self.request(prompt)).await?;
        let mut completion = into_completion(reply)?;
        completion.elapsed = started.elapsed();
        Ok(completion)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    num_predict: usize,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}
