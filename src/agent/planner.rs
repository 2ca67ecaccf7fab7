//! Query Planner
//!
//! Turns a question, the schema and this question's earlier failures into a
//! SQL candidate through one language-model call. The planner never executes
//! what it produces.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::executor::{Candidate, ExecutionError};
use crate::agent::session::Exchange;
use crate::agent::trace::truncate_chars;
use crate::ai::{SharedProvider, with_timeout};
use crate::constants::network;
use crate::types::{ClassifiedError, ErrorClassifier, InsightError, Schema};

const REPLY_FORMAT: &str = "- Reply with one JSON object and nothing else: \
{\"thought\": \"<one or two sentences on the approach>\", \"sql\": \"<the statement>\"}\n";

pub struct QueryPlanner {
    provider: SharedProvider,
    timeout: Duration,
    row_cap: usize,
}

impl QueryPlanner {
    pub fn new(provider: SharedProvider, row_cap: usize) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(network::DEFAULT_TIMEOUT_SECS),
            row_cap,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Produce the next candidate.
    ///
    /// The attempt index is the number of prior failures. Any provider fault
    /// comes back as `QuotaExceeded` or `ProviderFailure`.
    pub async fn plan(
        &self,
        question: &str,
        schema: &Schema,
        prior_failures: &[ExecutionError],
        history: &[Exchange],
    ) -> std::result::Result<Candidate, ClassifiedError> {
        let attempt = prior_failures.len() as u32;
        let prompt = self.build_prompt(question, schema, prior_failures, history);
        debug!(attempt, "Planner prompt:\n{}", prompt);

        let completion = with_timeout(
            self.timeout,
            self.provider.complete(&prompt),
            "LLM request",
        )
        .await
        .map_err(provider_fault)?;

        debug!(
            provider = self.provider.name(),
            model = self.provider.model(),
            tokens = completion.usage.total(),
            elapsed_ms = completion.elapsed.as_millis() as u64,
            "Planner reply received"
        );

        let (sql, thought) = parse_reply(&completion.text).map_err(|raw| {
            warn!("Planner reply unusable: {}", raw);
            ErrorClassifier::classify_provider(&raw)
        })?;

        let mut candidate = Candidate::new(sql, attempt);
        if let Some(thought) = thought {
            candidate = candidate.with_rationale(thought);
        }
        Ok(candidate)
    }

    /// Assemble the prompt. Table and column names appear exactly as in the catalog.
    pub fn build_prompt(
        &self,
        question: &str,
        schema: &Schema,
        prior_failures: &[ExecutionError],
        history: &[Exchange],
    ) -> String {
        let mut prompt = String::with_capacity(2048);

        prompt.push_str(
            "You translate questions into SQLite queries for a read-only database.\n\n",
        );
        prompt.push_str("## Database Schema\n\n");
        prompt.push_str(&schema.to_prompt_context());
        prompt.push_str("\n## Rules\n\n");
        prompt.push_str("- Write exactly one statement, starting with SELECT or WITH.\n");
        prompt.push_str(
            "- Use only the tables and columns listed above, spelled exactly as shown.\n",
        );
        prompt.push_str(&format!(
            "- Unless the question asks for an aggregate, add LIMIT {} or lower.\n",
            self.row_cap
        ));
        prompt.push_str(REPLY_FORMAT);

        if !history.is_empty() {
            prompt.push_str("\n## Earlier In This Conversation\n\n");
            for exchange in history {
                prompt.push_str(&format!("Q: {}\n", exchange.question));
                if let Some(sql) = &exchange.sql {
                    prompt.push_str(&format!("SQL: {}\n", sql));
                }
                prompt.push_str(&format!("A: {}\n\n", exchange.answer));
            }
        }

        if let Some((latest, earlier)) = prior_failures.split_last() {
            prompt.push_str("\n## Previous Attempt Failed\n\n");
            if !earlier.is_empty() {
                prompt.push_str("Earlier rejected queries:\n");
                for failure in earlier {
                    prompt.push_str(&format!("- {}\n", failure.candidate.sql));
                }
                prompt.push('\n');
            }
            prompt.push_str(&format!(
                "The last query was:\n```sql\n{}\n```\nThe database rejected it with:\n{}\n\n",
                latest.candidate.sql, latest.message
            ));
            prompt.push_str("Write a corrected query that fixes this error.\n");
        }

        prompt.push_str(&format!("\n## Question\n\n{}\n", question));
        prompt
    }
}

fn provider_fault(err: InsightError) -> ClassifiedError {
    match &err {
        InsightError::ProviderStatus { status, .. } => {
            ErrorClassifier::classify_http_status(*status, &err.to_string())
        }
        InsightError::LlmApi(raw) => ErrorClassifier::classify_provider(raw),
        _ => ErrorClassifier::classify_provider(&err.to_string()),
    }
}

/// Pull `sql` and `thought` out of the reply text. The error is the raw reason.
///
/// A JSON object is preferred; a bare fenced SQL block is accepted without a thought.
fn parse_reply(text: &str) -> std::result::Result<(String, Option<String>), String> {
    let (sql, thought) = match extract_json(text) {
        Some(Value::Object(map)) => (
            map.get("sql").and_then(Value::as_str).map(normalize_sql),
            map.get("thought")
                .and_then(Value::as_str)
                .map(|t| t.trim().to_string()),
        ),
        Some(Value::String(sql)) => (Some(normalize_sql(&sql)), None),
        _ => (fenced_sql(text), None),
    };

    match sql {
        Some(sql) if !sql.is_empty() => Ok((sql, thought)),
        _ => Err(format!(
            "model reply has no SQL: {}",
            truncate_chars(text.trim(), 200)
        )),
    }
}

/// Bare JSON, JSON inside a fence, or the outermost `{...}` embedded in prose
fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    if let Some(caps) = JSON_FENCE.captures(trimmed)
        && let Some(body) = caps.get(1)
        && let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim())
    {
        return Some(value);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => serde_json::from_str(&trimmed[start..=end]).ok(),
        _ => None,
    }
}

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json[ \t]*\n?(.*?)```").expect("valid regex"));

static SQL_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:sqlite|sql)?[ \t]*\n?(.*?)```").expect("valid regex")
});

/// Strip markdown fences and surrounding whitespace
pub fn normalize_sql(raw: &str) -> String {
    fenced_sql(raw).unwrap_or_else(|| raw.trim().to_string())
}

fn fenced_sql(raw: &str) -> Option<String> {
    SQL_FENCE
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}
