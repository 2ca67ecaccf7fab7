//! Reasoning Trace
//!
//! Ordered, append-only record of a question's thought/action/observation
//! steps. Subscribers are notified synchronously on every emit, before the
//! loop moves on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Kind of reasoning step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thought,
    Action,
    Observation,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thought => write!(f, "Thought"),
            Self::Action => write!(f, "Action"),
            Self::Observation => write!(f, "Observation"),
        }
    }
}

/// One trace entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Position within the question's trace, starting at 0
    pub seq: usize,
    pub kind: StepKind,
    pub content: String,
    /// Attempt index the step belongs to
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
}

/// Receives trace steps as they are emitted
pub trait TraceSubscriber: Send + Sync {
    fn on_step(&self, step: &TraceStep);
}

/// Discards every step
pub struct NullSubscriber;

impl TraceSubscriber for NullSubscriber {
    fn on_step(&self, _step: &TraceStep) {}
}

/// Forwards steps to a consumer on another task
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<TraceStep>,
}

impl ChannelSubscriber {
    pub fn new(tx: mpsc::UnboundedSender<TraceStep>) -> Self {
        Self { tx }
    }

    /// Create a subscriber and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TraceStep>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TraceSubscriber for ChannelSubscriber {
    fn on_step(&self, step: &TraceStep) {
        // Receiver gone: the consumer stopped listening
        let _ = self.tx.send(step.clone());
    }
}

/// Collects the trace of one question and fans steps out to subscribers
pub struct TraceEmitter<'a> {
    steps: Vec<TraceStep>,
    subscribers: Vec<&'a dyn TraceSubscriber>,
}

impl<'a> TraceEmitter<'a> {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn with_subscriber(mut self, subscriber: &'a dyn TraceSubscriber) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Append a step and notify every subscriber
    pub fn emit(&mut self, kind: StepKind, content: impl Into<String>, attempt: u32) {
        let step = TraceStep {
            seq: self.steps.len(),
            kind,
            content: content.into(),
            attempt,
            timestamp: Utc::now(),
        };
        debug!(seq = step.seq, attempt, "{}: {}", step.kind, step.content);
        for subscriber in &self.subscribers {
            subscriber.on_step(&step);
        }
        self.steps.push(step);
    }

    pub fn thought(&mut self, content: impl Into<String>, attempt: u32) {
        self.emit(StepKind::Thought, content, attempt);
    }

    pub fn action(&mut self, content: impl Into<String>, attempt: u32) {
        self.emit(StepKind::Action, content, attempt);
    }

    pub fn observation(&mut self, content: impl Into<String>, attempt: u32) {
        self.emit(StepKind::Observation, content, attempt);
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<TraceStep> {
        self.steps
    }
}

impl Default for TraceEmitter<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut `text` to at most `max` characters, marking the cut
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(usize, StepKind)>>,
    }

    impl TraceSubscriber for Recorder {
        fn on_step(&self, step: &TraceStep) {
            self.seen.lock().unwrap().push((step.seq, step.kind));
        }
    }

    #[test]
    fn test_emit_notifies_before_returning() {
        let recorder = Recorder::default();
        let mut emitter = TraceEmitter::new().with_subscriber(&recorder);

        emitter.thought("plan", 0);
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);

        emitter.action("SELECT 1", 0);
        emitter.observation("1 row", 0);

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (0, StepKind::Thought),
                (1, StepKind::Action),
                (2, StepKind::Observation)
            ]
        );
        assert_eq!(emitter.len(), 3);
    }

    #[test]
    fn test_multiple_subscribers_see_every_step() {
        let a = Recorder::default();
        let b = Recorder::default();
        let mut emitter = TraceEmitter::new().with_subscriber(&a).with_subscriber(&b);
        for i in 0..5 {
            emitter.thought(format!("step {}", i), 0);
        }
        assert_eq!(a.seen.lock().unwrap().len(), 5);
        assert_eq!(b.seen.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_channel_subscriber_preserves_order() {
        let (subscriber, mut rx) = ChannelSubscriber::channel();
        let mut emitter = TraceEmitter::new().with_subscriber(&subscriber);
        emitter.thought("a", 0);
        emitter.action("b", 0);
        emitter.observation("c", 1);
        drop(emitter);
        drop(subscriber);

        let mut received = Vec::new();
        while let Some(step) = rx.recv().await {
            received.push(step.content);
        }
        assert_eq!(received, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_channel_subscriber_survives_dropped_receiver() {
        let (subscriber, rx) = ChannelSubscriber::channel();
        drop(rx);
        let mut emitter = TraceEmitter::new().with_subscriber(&subscriber);
        emitter.thought("nobody listening", 0);
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefgh", 3), "abc...");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }
}
