//! Unified Error Type System
//!
//! Centralized error types for the entire application, plus the failure
//! taxonomy that drives the self-correction loop's retry decisions.
//!
//! ## Error Kinds
//!
//! - **QuotaExceeded**: Provider rate limit / resource exhaustion (terminal)
//! - **ProviderFailure**: Any other language-model fault (terminal)
//! - **ConnectionFailure**: Database handle unusable (terminal)
//! - **SqlSyntaxError**: Parser-level complaint (retry with a new candidate)
//! - **SqlSemanticError**: Valid SQL referencing the schema wrongly (retry)
//! - **Unknown**: Anything else, raw message kept verbatim (retry)

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Fixed failure taxonomy used for routing and user-facing hints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Request quota or rate limit exhausted
    QuotaExceeded,
    /// Language model fault that is not a quota signal
    ProviderFailure,
    /// Database connection or file is unusable
    ConnectionFailure,
    /// Query is malformed at the parser level
    SqlSyntaxError,
    /// Query parsed but referenced the schema incorrectly
    SqlSemanticError,
    /// No classification rule matched
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuotaExceeded => write!(f, "QUOTA_EXCEEDED"),
            Self::ProviderFailure => write!(f, "PROVIDER_FAILURE"),
            Self::ConnectionFailure => write!(f, "CONNECTION_FAILURE"),
            Self::SqlSyntaxError => write!(f, "SQL_SYNTAX_ERROR"),
            Self::SqlSemanticError => write!(f, "SQL_SEMANTIC_ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorKind {
    /// Check if the self-correction loop may rewrite the query and try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SqlSyntaxError | Self::SqlSemanticError | Self::Unknown
        )
    }

    /// Fixed hint for this kind. `Unknown` has none: its hint is the raw message.
    fn fixed_hint(&self) -> Option<&'static str> {
        match self {
            Self::QuotaExceeded => Some("request quota exhausted, wait and retry"),
            Self::ProviderFailure => {
                Some("language model request failed, check API key and model")
            }
            Self::ConnectionFailure => Some("check database path/URI"),
            Self::SqlSyntaxError => Some("query is malformed, will retry"),
            Self::SqlSemanticError => Some("query referenced schema incorrectly, will retry"),
            Self::Unknown => None,
        }
    }
}

// =============================================================================
// Classified Error
// =============================================================================

/// A raw failure mapped into the fixed taxonomy
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ClassifiedError {
    /// Taxonomy bucket
    pub kind: ErrorKind,
    /// Raw message as produced by the database or provider
    pub raw: String,
    /// User-facing hint
    pub hint: String,
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.raw)
    }
}

impl std::error::Error for ClassifiedError {}

impl ClassifiedError {
    /// Build a classified error with the kind's standard hint
    pub fn new(kind: ErrorKind, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let hint = kind
            .fixed_hint()
            .map(str::to_string)
            .unwrap_or_else(|| raw.clone());
        Self { kind, raw, hint }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Provider rate-limit phrasing. Word-bounded so an identifier such as
/// `monthly_quota` or a bare `429` in query text never matches.
static QUOTA_SIGNATURES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\bresource[_ ]exhausted\b",
        r"|\binsufficient_quota\b",
        r"|\bquota (?:exceeded|exhausted)\b",
        r"|\bexceeded (?:your )?(?:current )?quota\b",
        r"|\brate[_ ]limit[_ ](?:exceeded|reached)\b",
        r"|\btoo many requests\b",
        r"|\b(?:http|status|code)[ :=]*429\b",
        r"|\(429\b",
    ))
    .expect("valid regex")
});

/// Unusable-handle messages. SQLite and socket errors lead with these, so
/// the match is anchored at the start of the message.
static CONNECTION_SIGNATURES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:unable to open database",
        r"|no such file",
        r"|file is not a database",
        r"|disk i/o error",
        r"|database disk image is malformed",
        r"|connection (?:closed|refused|reset)",
        r"|broken pipe",
        r"|(?:closed|invalid) (?:socket|connection)",
        r"|socket closed)",
    ))
    .expect("valid regex")
});

const SYNTAX_SIGNATURES: &[&str] = &[
    "syntax error",
    "unrecognized token",
    "incomplete input",
    "unexpected token",
    "unterminated",
    "unexpected end",
    "parse error",
    "multiple statements",
];

const SEMANTIC_SIGNATURES: &[&str] = &[
    "no such column",
    "no such table",
    "no such function",
    "unknown column",
    "unknown table",
    "ambiguous column",
    "datatype mismatch",
    "type mismatch",
    "misuse of aggregate",
    "wrong number of arguments",
    "does not exist",
    "has no column",
    "readonly database",
    "query_only",
    "sub-select returns",
    "must appear in the group by",
];

fn matches_any(lower: &str, signatures: &[&str]) -> bool {
    signatures.iter().any(|s| lower.contains(s))
}

/// Pure classifier mapping raw failure text into [`ErrorKind`]
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a raw database or provider message. First matching rule wins.
    pub fn classify(raw: &str) -> ClassifiedError {
        let lower = raw.to_lowercase();

        let kind = if QUOTA_SIGNATURES.is_match(raw) {
            ErrorKind::QuotaExceeded
        } else if CONNECTION_SIGNATURES.is_match(raw.trim_start()) {
            ErrorKind::ConnectionFailure
        } else if matches_any(&lower, SYNTAX_SIGNATURES) {
            ErrorKind::SqlSyntaxError
        } else if matches_any(&lower, SEMANTIC_SIGNATURES) {
            ErrorKind::SqlSemanticError
        } else {
            ErrorKind::Unknown
        };

        ClassifiedError::new(kind, raw)
    }

    /// Classify a planner-side provider fault: quota or generic provider failure
    pub fn classify_provider(raw: &str) -> ClassifiedError {
        if QUOTA_SIGNATURES.is_match(raw) {
            ClassifiedError::new(ErrorKind::QuotaExceeded, raw)
        } else {
            ClassifiedError::new(ErrorKind::ProviderFailure, raw)
        }
    }

    /// Classify a provider's non-success HTTP status. 429 is always quota;
    /// other statuses fall back to the body text.
    pub fn classify_http_status(status: u16, raw: &str) -> ClassifiedError {
        match status {
            429 => ClassifiedError::new(ErrorKind::QuotaExceeded, raw),
            _ => Self::classify_provider(raw),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum InsightError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    /// Language model transport or reply fault, classified by its text
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// Language model API answered with a non-success status
    #[error("{provider} API error (HTTP {status}): {body}")]
    ProviderStatus {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Database could not be opened or introspected
    #[error("Connection failure: {0}")]
    Connection(String),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

}

pub type Result<T> = std::result::Result<T, InsightError>;

impl InsightError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Map this error into the failure taxonomy
    pub fn classify(&self) -> ClassifiedError {
        match self {
            Self::Connection(msg) => ClassifiedError::new(ErrorKind::ConnectionFailure, msg),
            Self::LlmApi(msg) => ErrorClassifier::classify_provider(msg),
            Self::ProviderStatus { status, .. } => {
                ErrorClassifier::classify_http_status(*status, &self.to_string())
            }
            Self::Timeout { .. } => {
                ClassifiedError::new(ErrorKind::ProviderFailure, self.to_string())
            }
            _ => ErrorClassifier::classify(&self.to_string()),
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Wrap the error as a connection failure with context
    fn connection_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn connection_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| InsightError::Connection(format!("{}: {}", context.into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::QuotaExceeded.to_string(), "QUOTA_EXCEEDED");
        assert_eq!(ErrorKind::SqlSyntaxError.to_string(), "SQL_SYNTAX_ERROR");
        assert_eq!(ErrorKind::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_error_kind_retryable() {
        assert!(ErrorKind::SqlSyntaxError.is_retryable());
        assert!(ErrorKind::SqlSemanticError.is_retryable());
        assert!(ErrorKind::Unknown.is_retryable());
        assert!(!ErrorKind::QuotaExceeded.is_retryable());
        assert!(!ErrorKind::ConnectionFailure.is_retryable());
        assert!(!ErrorKind::ProviderFailure.is_retryable());
    }

    #[test]
    fn test_classify_quota() {
        let err = ErrorClassifier::classify(
            "429 RESOURCE_EXHAUSTED: You exceeded your current quota",
        );
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
        assert_eq!(err.hint, "request quota exhausted, wait and retry");
    }

    #[test]
    fn test_classify_connection() {
        let err = ErrorClassifier::classify("unable to open database file: dresses.db");
        assert_eq!(err.kind, ErrorKind::ConnectionFailure);
        assert_eq!(err.hint, "check database path/URI");
    }

    #[test]
    fn test_classify_syntax() {
        let err = ErrorClassifier::classify("near \"SELEC\": syntax error");
        assert_eq!(err.kind, ErrorKind::SqlSyntaxError);

        let err = ErrorClassifier::classify("unrecognized token: \"'abc\"");
        assert_eq!(err.kind, ErrorKind::SqlSyntaxError);

        let err = ErrorClassifier::classify("incomplete input");
        assert_eq!(err.kind, ErrorKind::SqlSyntaxError);
    }

    #[test]
    fn test_classify_semantic() {
        let err = ErrorClassifier::classify("no such column: price_usd");
        assert_eq!(err.kind, ErrorKind::SqlSemanticError);
        assert_eq!(err.hint, "query referenced schema incorrectly, will retry");

        let err = ErrorClassifier::classify("no such table: dress");
        assert_eq!(err.kind, ErrorKind::SqlSemanticError);

        let err = ErrorClassifier::classify("attempt to write a readonly database");
        assert_eq!(err.kind, ErrorKind::SqlSemanticError);
    }

    #[test]
    fn test_classify_unknown_keeps_raw_hint() {
        let err = ErrorClassifier::classify("interrupted");
        assert_eq!(err.kind, ErrorKind::Unknown);
        assert_eq!(err.hint, "interrupted");
        assert_eq!(err.raw, "interrupted");
    }

    #[test]
    fn test_classify_order_quota_beats_connection() {
        // Both signatures present: quota rule is checked first
        let err = ErrorClassifier::classify("rate limit exceeded, connection closed");
        assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    }

    #[test]
    fn test_quota_words_inside_identifiers_do_not_match() {
        let err = ErrorClassifier::classify("no such column: monthly_quota");
        assert_eq!(err.kind, ErrorKind::SqlSemanticError);

        let err = ErrorClassifier::classify("no such column: rate_limit");
        assert_eq!(err.kind, ErrorKind::SqlSemanticError);

        let err = ErrorClassifier::classify("near \"429\": syntax error");
        assert_eq!(err.kind, ErrorKind::SqlSyntaxError);
    }

    #[test]
    fn test_connection_phrase_mid_message_does_not_match() {
        let err = ErrorClassifier::classify("no such column: connection refused");
        assert_eq!(err.kind, ErrorKind::SqlSemanticError);

        let err = ErrorClassifier::classify("connection refused (os error 111)");
        assert_eq!(err.kind, ErrorKind::ConnectionFailure);
    }

    #[test]
    fn test_quota_phrasings() {
        for raw in [
            "openai API error (HTTP 429): {\"error\":{\"code\":\"rate_limit_exceeded\"}}",
            "You exceeded your current quota, please check your plan",
            "insufficient_quota",
            "status: 429",
            "Too Many Requests",
        ] {
            assert_eq!(ErrorClassifier::classify(raw).kind, ErrorKind::QuotaExceeded, "{raw}");
        }
    }

    #[test]
    fn test_classify_provider() {
        let quota = ErrorClassifier::classify_provider("Gemini API error (429): RESOURCE_EXHAUSTED");
        assert_eq!(quota.kind, ErrorKind::QuotaExceeded);

        let other = ErrorClassifier::classify_provider("Gemini API error (400): API_KEY_INVALID");
        assert_eq!(other.kind, ErrorKind::ProviderFailure);
    }

    #[test]
    fn test_classify_http_status() {
        assert_eq!(
            ErrorClassifier::classify_http_status(429, "slow down").kind,
            ErrorKind::QuotaExceeded
        );
        assert_eq!(
            ErrorClassifier::classify_http_status(401, "unauthorized").kind,
            ErrorKind::ProviderFailure
        );
    }

    #[test]
    fn test_insight_error_classify() {
        let err = InsightError::Connection("unable to open database file".to_string());
        assert_eq!(err.classify().kind, ErrorKind::ConnectionFailure);

        let err = InsightError::timeout("LLM request", Duration::from_secs(60));
        assert_eq!(err.classify().kind, ErrorKind::ProviderFailure);

        let err = InsightError::LlmApi("OpenAI API error (429 Too Many Requests)".to_string());
        assert_eq!(err.classify().kind, ErrorKind::QuotaExceeded);

        let err = InsightError::ProviderStatus {
            provider: "gemini",
            status: 429,
            body: "slow down".to_string(),
        };
        let classified = err.classify();
        assert_eq!(classified.kind, ErrorKind::QuotaExceeded);
        assert!(classified.raw.contains("HTTP 429"));

        let err = InsightError::ProviderStatus {
            provider: "gemini",
            status: 403,
            body: "API key not valid".to_string(),
        };
        assert_eq!(err.classify().kind, ErrorKind::ProviderFailure);
    }

    #[test]
    fn test_classified_error_display() {
        let err = ClassifiedError::new(ErrorKind::SqlSemanticError, "no such column: x");
        assert_eq!(err.to_string(), "[SQL_SEMANTIC_ERROR] no such column: x");
    }

    proptest! {
        #[test]
        fn classify_never_drops_raw(raw in ".{0,200}") {
            let err = ErrorClassifier::classify(&raw);
            prop_assert_eq!(&err.raw, &raw);
            if err.kind == ErrorKind::Unknown {
                prop_assert_eq!(&err.hint, &raw);
            } else {
                prop_assert!(!err.hint.is_empty());
            }
        }
    }
}
