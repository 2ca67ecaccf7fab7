//! End-to-end agent scenarios over an on-disk SQLite database with a
//! scripted language model.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::TempDir;

use insightsql::agent::{
    ChannelSubscriber, DatabaseExecutor, NullSubscriber, StepKind, TraceStep, TraceSubscriber,
};
use insightsql::ai::ProviderConfig;
use insightsql::storage::QueryLimits;
use insightsql::{
    AgentConfig, AgentSession, Completion, ConnectionConfig, Database, DatabaseConfig, ErrorKind,
    InsightError, LlmProvider, QueryPlanner, QuestionOutcome, Result,
    SchemaIntrospector, SessionFactory, SessionRegistry,
};

// =============================================================================
// Fixtures
// =============================================================================

fn dresses_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dresses.db");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE items (
            dress_id INTEGER PRIMARY KEY,
            style TEXT NOT NULL,
            price TEXT,
            rating REAL,
            season TEXT
        );
        INSERT INTO items (style, price, rating, season) VALUES
            ('Sexy', 'Low', 4.6, 'Summer'),
            ('Casual', 'Low', 0.0, 'Summer'),
            ('vintage', 'High', 0.0, 'Automn'),
            ('Brief', 'Average', 4.6, 'Spring'),
            ('cute', 'Low', 4.5, 'Summer');
        "#,
    )
    .unwrap();
    (dir, path)
}

struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<Value, String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(replies: Vec<std::result::Result<Value, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    fn sql(sql: &str) -> std::result::Result<Value, String> {
        Ok(json!({ "thought": "", "sql": sql }))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(Completion::text(content.to_string())),
            Some(Err(raw)) => Err(InsightError::LlmApi(raw)),
            None => Err(InsightError::LlmApi("no more scripted replies".to_string())),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

struct CountingCatalog {
    db: Arc<Database>,
    reads: Arc<AtomicUsize>,
}

impl SchemaIntrospector for CountingCatalog {
    fn inspect(&self) -> Result<insightsql::types::Schema> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.db.inspect()
    }
}

fn connection(path: &Path) -> ConnectionConfig {
    ConnectionConfig::new(
        DatabaseConfig::for_url(format!("sqlite:///{}", path.display())),
        ProviderConfig::default(),
    )
}

fn session(path: &Path, model: Arc<ScriptedModel>) -> AgentSession {
    let config = connection(path);
    let db = Arc::new(Database::open(&config.database).unwrap());
    AgentSession::bind(
        config,
        &*db,
        QueryPlanner::new(model, 200),
        Arc::new(DatabaseExecutor::new(db.clone(), QueryLimits::default())),
        AgentConfig::default(),
    )
    .unwrap()
}

fn kinds(trace: &[TraceStep]) -> Vec<StepKind> {
    trace.iter().map(|s| s.kind).collect()
}

// =============================================================================
// Self-correction scenarios
// =============================================================================

#[tokio::test]
async fn count_items_succeeds_first_try() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![ScriptedModel::sql("SELECT COUNT(*) FROM items;")]);
    let session = session(&path, model.clone());

    let outcome = session
        .ask("Count the total items in the table", &NullSubscriber)
        .await;

    match &outcome {
        QuestionOutcome::Succeeded {
            result,
            candidate,
            trace,
            attempt,
            ..
        } => {
            assert_eq!(result.len(), 1);
            assert_eq!(result.scalar(), Some(&json!(5)));
            assert_eq!(candidate.sql, "SELECT COUNT(*) FROM items;");
            assert_eq!(*attempt, 0);
            assert!(trace.len() >= 3);
        }
        QuestionOutcome::Failed { error, .. } => panic!("unexpected failure: {}", error),
    }
    assert_eq!(outcome.answer(), Some("COUNT(*): 5"));
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn nonexistent_column_is_repaired() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![
        ScriptedModel::sql("SELECT AVG(price_usd) FROM items"),
        ScriptedModel::sql("SELECT AVG(rating) FROM items"),
    ]);
    let session = session(&path, model.clone());

    let outcome = session.ask("What is the average rating?", &NullSubscriber).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempt(), 1);
    assert_eq!(outcome.executions(), 2);
    assert_eq!(
        kinds(outcome.trace()),
        vec![
            StepKind::Thought,
            StepKind::Action,
            StepKind::Observation,
            StepKind::Thought,
            StepKind::Action,
            StepKind::Observation,
        ]
    );
    assert!(outcome.trace()[2].content.contains("SQL_SEMANTIC_ERROR"));

    let prompts = model.prompts.lock().unwrap().clone();
    assert!(prompts[1].contains("no such column: price_usd"));
}

#[tokio::test]
async fn persistent_syntax_errors_exhaust_budget() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![
        ScriptedModel::sql("SELEC * FROM items"),
        ScriptedModel::sql("SELECT * FORM items"),
        ScriptedModel::sql("SELECT * FROM items WHERE"),
        ScriptedModel::sql("SELECT 1"),
    ]);
    let session = session(&path, model.clone());

    let outcome = session.ask("show everything", &NullSubscriber).await;

    let error = outcome.error().expect("should fail");
    assert_eq!(error.kind, ErrorKind::SqlSyntaxError);
    assert_eq!(error.hint, "query is malformed, will retry");
    assert_eq!(outcome.attempt(), 3);
    assert_eq!(outcome.executions(), 3);
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn quota_error_stops_without_more_planner_calls() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![
        Err("Gemini API error (429 Too Many Requests): RESOURCE_EXHAUSTED".to_string()),
        ScriptedModel::sql("SELECT 1"),
    ]);
    let session = session(&path, model.clone());

    let outcome = session.ask("anything", &NullSubscriber).await;

    let error = outcome.error().expect("should fail");
    assert_eq!(error.kind, ErrorKind::QuotaExceeded);
    assert_eq!(error.hint, "request quota exhausted, wait and retry");
    assert_eq!(model.calls(), 1);
    assert_eq!(outcome.executions(), 0);
    assert!(!outcome.trace().is_empty());
}

#[tokio::test]
async fn write_attempts_are_rejected_then_retried() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![
        ScriptedModel::sql("DELETE FROM items"),
        ScriptedModel::sql("SELECT COUNT(*) FROM items"),
    ]);
    let session = session(&path, model);

    let outcome = session.ask("remove and count", &NullSubscriber).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.answer(), Some("COUNT(*): 5"));
}

#[tokio::test]
async fn empty_result_is_a_success() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![ScriptedModel::sql(
        "SELECT style FROM items WHERE season = 'Winter'",
    )]);
    let session = session(&path, model);

    let outcome = session.ask("winter dresses?", &NullSubscriber).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.answer(), Some("The query returned no rows."));
}

#[tokio::test]
async fn trace_streams_through_channel_in_order() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![
        ScriptedModel::sql("SELECT nope FROM items"),
        ScriptedModel::sql("SELECT style FROM items LIMIT 2"),
    ]);
    let session = session(&path, model);
    let (subscriber, mut rx) = ChannelSubscriber::channel();

    let outcome = session.ask("two styles", &subscriber).await;
    drop(subscriber);

    let mut streamed = Vec::new();
    while let Some(step) = rx.recv().await {
        streamed.push(step);
    }
    assert_eq!(streamed, outcome.trace().to_vec());
}

// =============================================================================
// Session registry scenarios
// =============================================================================

struct ScriptedFactory {
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    async fn create(&self, config: &ConnectionConfig) -> Result<AgentSession> {
        let db = Arc::new(Database::open(&config.database)?);
        let catalog = CountingCatalog {
            db: db.clone(),
            reads: self.reads.clone(),
        };
        AgentSession::bind(
            config.clone(),
            &catalog,
            QueryPlanner::new(
                ScriptedModel::new(vec![ScriptedModel::sql("SELECT COUNT(*) FROM items")]),
                200,
            ),
            Arc::new(DatabaseExecutor::new(db, QueryLimits::default())),
            AgentConfig::default(),
        )
    }
}

fn registry() -> (SessionRegistry<ScriptedFactory>, Arc<AtomicUsize>) {
    let reads = Arc::new(AtomicUsize::new(0));
    (
        SessionRegistry::new(ScriptedFactory {
            reads: reads.clone(),
        }),
        reads,
    )
}

#[tokio::test]
async fn get_or_create_twice_returns_same_session() {
    let (_dir, path) = dresses_db();
    let (registry, reads) = registry();
    let config = connection(&path);

    let first = registry.get_or_create("browser-tab", &config).await.unwrap();
    let second = registry.get_or_create("browser-tab", &config).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reset_keeps_schema_and_clears_history() {
    let (_dir, path) = dresses_db();
    let (registry, reads) = registry();
    let session = registry
        .get_or_create("browser-tab", &connection(&path))
        .await
        .unwrap();

    session.ask("how many?", &NullSubscriber).await;
    assert_eq!(session.history().await.len(), 1);
    let schema = session.schema().clone();

    let session = registry.reset(&session).await;

    assert!(Arc::ptr_eq(&schema, session.schema()));
    assert!(session.history().await.is_empty());
    assert!(session.last_trace().await.is_empty());
    assert_eq!(reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn changed_api_key_forces_new_session() {
    let (_dir, path) = dresses_db();
    let (registry, reads) = registry();
    let config = connection(&path);

    let original = registry.get_or_create("browser-tab", &config).await.unwrap();
    original.ask("how many?", &NullSubscriber).await;

    let mut rotated = config.clone();
    rotated.provider.api_key = Some("fresh-key".to_string());
    let replaced = registry.get_or_create("browser-tab", &rotated).await.unwrap();

    assert!(!Arc::ptr_eq(&original, &replaced));
    assert!(replaced.history().await.is_empty());
    assert_eq!(reads.load(Ordering::SeqCst), 2);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn unreachable_database_is_connection_failure() {
    let dir = TempDir::new().unwrap();
    let (registry, reads) = registry();

    let err = registry
        .get_or_create("browser-tab", &connection(&dir.path().join("gone.db")))
        .await
        .unwrap_err();

    let classified = err.classify();
    assert_eq!(classified.kind, ErrorKind::ConnectionFailure);
    assert_eq!(classified.hint, "check database path/URI");
    assert_eq!(reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn questions_on_one_session_are_serialized() {
    let (_dir, path) = dresses_db();
    let model = ScriptedModel::new(vec![
        ScriptedModel::sql("SELECT COUNT(*) FROM items"),
        ScriptedModel::sql("SELECT COUNT(*) FROM items WHERE price = 'Low'"),
    ]);
    let session = Arc::new(session(&path, model));

    struct Silent;
    impl TraceSubscriber for Silent {
        fn on_step(&self, _step: &TraceStep) {}
    }

    let (a, b) = tokio::join!(session.ask("all", &Silent), session.ask("cheap", &Silent));
    assert!(a.is_success() && b.is_success());

    let history = session.history().await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].question, "all");
    assert_eq!(history[1].question, "cheap");
}
