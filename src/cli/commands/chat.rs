//! Chat Command
//!
//! Interactive question loop on one session.
//!
//! Usage:
//!   insightsql chat [--db PATH] [--no-trace]
//!
//! Commands inside the loop: /reset, /schema, /history, /quit

use std::io::Write;

use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::commands::ask::print_outcome;
use crate::cli::commands::schema::print_schema;
use crate::cli::trace_view::ConsoleTraceView;
use crate::cli::ui::Output;
use crate::cli::util::{CommandContext, ConnectionOverrides};
use crate::types::Result;

#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Question(&'a str),
    Reset,
    Schema,
    History,
    Quit,
    Empty,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let line = line.trim();
    match line {
        "" => ChatInput::Empty,
        "/reset" => ChatInput::Reset,
        "/schema" => ChatInput::Schema,
        "/history" => ChatInput::History,
        "/quit" | "/exit" => ChatInput::Quit,
        cmd if cmd.starts_with('/') => ChatInput::Unknown(cmd),
        question => ChatInput::Question(question),
    }
}

pub async fn run(overrides: &ConnectionOverrides, show_trace: bool) -> Result<bool> {
    let output = Output::new();
    let ctx = CommandContext::load(overrides)?;

    let mut session = match ctx.session().await {
        Ok(session) => session,
        Err(e) => {
            output.failure(&e.classify());
            return Ok(false);
        }
    };

    output.header("InsightSQL chat");
    output.info(&format!(
        "Connected to {} ({} tables). /reset, /schema, /history, /quit",
        ctx.config.database.url,
        session.schema().tables.len()
    ));

    let view = ConsoleTraceView::new(show_trace);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n{} ", style("?").green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Quit => break,
            ChatInput::Reset => {
                session = ctx.registry.reset(&session).await;
                output.success("Conversation history cleared");
            }
            ChatInput::Schema => print_schema(&output, session.schema()),
            ChatInput::History => {
                let history = session.history().await;
                if history.is_empty() {
                    output.info("No questions yet");
                }
                for (i, exchange) in history.iter().enumerate() {
                    let mark = if exchange.succeeded {
                        style("✓").green()
                    } else {
                        style("✗").red()
                    };
                    println!("{:>3}. {} {}", i + 1, mark, exchange.question);
                    if let Some(sql) = &exchange.sql {
                        println!("     {}", style(sql).dim());
                    }
                }
            }
            ChatInput::Unknown(cmd) => output.warning(&format!("Unknown command: {}", cmd)),
            ChatInput::Question(question) => {
                let outcome = session.ask(question, &view).await;
                print_outcome(&output, &outcome);
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("  "), ChatInput::Empty);
        assert_eq!(parse_input("/reset"), ChatInput::Reset);
        assert_eq!(parse_input("/exit"), ChatInput::Quit);
        assert_eq!(parse_input("/drop"), ChatInput::Unknown("/drop"));
        assert_eq!(
            parse_input(" How many dresses? "),
            ChatInput::Question("How many dresses?")
        );
    }
}
