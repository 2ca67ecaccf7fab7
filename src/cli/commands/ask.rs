//! Ask Command
//!
//! One-shot question against the configured database.
//!
//! Usage:
//!   insightsql ask "How many items are there?" [--db shop.db] [--format json] [--no-trace]

use crate::agent::{NullSubscriber, QuestionOutcome, TraceSubscriber};
use crate::cli::trace_view::ConsoleTraceView;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, ConnectionOverrides};
use crate::types::Result;

/// Run the question; returns whether it was answered
pub async fn run(
    question: &str,
    overrides: &ConnectionOverrides,
    format: &str,
    show_trace: bool,
) -> Result<bool> {
    let output = Output::new();
    let ctx = CommandContext::load(overrides)?;

    let session = match ctx.session().await {
        Ok(session) => session,
        Err(e) => {
            output.failure(&e.classify());
            return Ok(false);
        }
    };

    let as_json = format == "json";
    let view = ConsoleTraceView::new(show_trace && !as_json);
    let subscriber: &dyn TraceSubscriber = if as_json { &NullSubscriber } else { &view };

    let outcome = session.ask(question, subscriber).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(outcome.is_success());
    }

    print_outcome(&output, &outcome);
    Ok(outcome.is_success())
}

pub(crate) fn print_outcome(output: &Output, outcome: &QuestionOutcome) {
    match outcome {
        QuestionOutcome::Succeeded {
            answer,
            candidate,
            attempt,
            ..
        } => {
            output.answer(answer);
            if *attempt > 0 {
                output.info(&format!(
                    "Answered after {} corrected attempt(s): {}",
                    attempt, candidate.sql
                ));
            }
        }
        QuestionOutcome::Failed { error, .. } => output.failure(error),
    }
}
