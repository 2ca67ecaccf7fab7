//! Google Gemini client (Generative Language API, `generateContent`)
//!
//! Quota exhaustion arrives as HTTP 429 with `RESOURCE_EXHAUSTED` in the body.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{Completion, LlmProvider, ProviderConfig, TokenUsage, http};
use crate::types::{InsightError, Result};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub struct GeminiProvider {
    api_key: SecretString,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key_or_env(&["GOOGLE_API_KEY", "GEMINI_API_KEY"])
            .ok_or_else(|| {
                InsightError::Config(
                    "Google API key not found. Set GOOGLE_API_KEY or llm.api_key".to_string(),
                )
            })?;
        let base = http::trim_base(config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE));
        let model = config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key: SecretString::from(api_key),
            endpoint: format!("{}/models/{}:generateContent", base, model),
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: http::client(config.timeout_secs)?,
        })
    }

    fn request<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
                response_mime_type: "application/json",
            },
        }
    }
}

fn into_completion(reply: GenerateResponse) -> Result<Completion> {
    if let Some(feedback) = reply.prompt_feedback
        && let Some(reason) = feedback.block_reason
    {
        return Err(InsightError::LlmApi(format!(
            "gemini blocked the prompt: {}",
            reason
        )));
    }

    let usage = reply
        .usage_metadata
        .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count))
        .unwrap_or_default();
    let text: String = reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(InsightError::LlmApi(
            "gemini reply has no candidate text".to_string(),
        ));
    }
    Ok(Completion {
        text,
        usage,
        ..Default::default()
    })
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        let started = Instant::now();
        let request = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret());

        let reply: GenerateResponse =
            http::post_json("gemini", request, &self.request(prompt)).await?;
        let mut completion = into_completion(reply)?;
        completion.elapsed = started.elapsed();
        Ok(completion)
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ReplyCandidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct ReplyCandidate {
    content: Option<ReplyContent>,
}

#[derive(Deserialize)]
struct ReplyContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(&ProviderConfig {
            provider: "gemini".to_string(),
            api_key: Some("AIza-test".to_string()),
            api_base: Some("https://example.test/v1beta/".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_includes_model() {
        let p = provider();
        assert_eq!(
            p.endpoint,
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!format!("{:?}", p).contains("AIza-test"));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let body = serde_json::to_value(provider().request("Count items")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Count items");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert!(body["generationConfig"]["maxOutputTokens"].is_number());
    }

    #[test]
    fn test_reply_parts_are_joined() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{
                "candidates": [{"content": {"parts": [{"text": "{\"sql\": "}, {"text": "\"SELECT 1\"}"}], "role": "model"}}],
                "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
            }"#,
        )
        .unwrap();
        let completion = into_completion(reply).unwrap();
        assert_eq!(completion.text, r#"{"sql": "SELECT 1"}"#);
        assert_eq!(completion.usage, TokenUsage::new(12, 4));
    }

    #[test]
    fn test_blocked_prompt_is_error() {
        let reply: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = into_completion(reply).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
