//! Shared HTTP plumbing for the provider clients

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{InsightError, Result};

/// Longest error body kept in `ProviderStatus`
const MAX_ERROR_BODY_CHARS: usize = 2000;

pub(super) fn client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InsightError::LlmApi(format!("Failed to create HTTP client: {}", e)))
}

/// Strip one trailing slash so paths can be appended with `/`
pub(super) fn trim_base(base: &str) -> String {
    base.strip_suffix('/').unwrap_or(base).to_string()
}

/// POST `body` as JSON and decode the reply.
///
/// Transport faults become `LlmApi`; a non-success status becomes
/// `ProviderStatus` carrying the numeric code and the (clipped) body.
pub(super) async fn post_json<B, R>(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    body: &B,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| transport_error(provider, &e))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(status_error(provider, status.as_u16(), &text));
    }
    debug!(provider, status = status.as_u16(), "Provider replied");

    response.json::<R>().await.map_err(|e| {
        InsightError::LlmApi(format!("Failed to parse {} response: {}", provider, e))
    })
}

fn transport_error(provider: &'static str, err: &reqwest::Error) -> InsightError {
    if err.is_connect() {
        InsightError::LlmApi(format!("Failed to reach {} endpoint: {}", provider, err))
    } else if err.is_timeout() {
        InsightError::LlmApi(format!("{} request timed out: {}", provider, err))
    } else {
        InsightError::LlmApi(format!("{} request failed: {}", provider, err))
    }
}

pub(super) fn status_error(provider: &'static str, status: u16, body: &str) -> InsightError {
    let body = match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    };
    InsightError::ProviderStatus {
        provider,
        status,
        body: body.trim().to_string(),
    }
}
