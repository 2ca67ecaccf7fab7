//! OpenAI Chat Completions client (or any compatible endpoint via `api_base`)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{Completion, LlmProvider, ProviderConfig, TokenUsage, http};
use crate::types::{InsightError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const SYSTEM_PROMPT: &str =
    "You write SQLite queries for a read-only analytics database and reply in JSON.";

pub struct OpenAiProvider {
    api_key: SecretString,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.api_key_or_env(&["OPENAI_API_KEY"]).ok_or_else(|| {
            InsightError::Config(
                "OpenAI API key not found. Set OPENAI_API_KEY or llm.api_key".to_string(),
            )
        })?;
        let base = http::trim_base(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE));

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint: format!("{}/chat/completions", base),
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http::client(config.timeout_secs)?,
        })
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        }
    }
}

fn into_completion(reply: ChatResponse) -> Result<Completion> {
    let usage = reply
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();
    let text = reply
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| InsightError::LlmApi("openai reply has no message content".to_string()))?;

    Ok(Completion {
        text,
        usage,
        ..Default::default()
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        let started = Instant::now();
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret());

        let reply: ChatResponse = http::post_json("openai", request, &self.request(prompt)).await?;
        let mut completion = into_completion(reply)?;
        completion.elapsed = started.elapsed();
        Ok(completion)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: usize,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
