//! Live trace rendering for the terminal

use console::style;

use crate::agent::{StepKind, TraceStep, TraceSubscriber};

/// Prints each trace step as it is emitted
pub struct ConsoleTraceView {
    enabled: bool,
}

impl ConsoleTraceView {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn format_step(step: &TraceStep) -> String {
        let label = match step.kind {
            StepKind::Thought => style(format!("{:<11}", "Thought")).cyan(),
            StepKind::Action => style(format!("{:<11}", "Action")).magenta(),
            StepKind::Observation => style(format!("{:<11}", "Observation")).yellow(),
        };
        let attempt = style(format!("#{}", step.attempt + 1)).dim();
        let mut lines = step.content.lines();
        let first = lines.next().unwrap_or_default();
        let mut out = format!("{} {} {}", attempt, label.bold(), first);
        for line in lines {
            out.push_str(&format!("\n{:>16}{}", "", line));
        }
        out
    }
}

impl TraceSubscriber for ConsoleTraceView {
    fn on_step(&self, step: &TraceStep) {
        if self.enabled {
            println!("{}", Self::format_step(step));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_step_continuation_lines() {
        console::set_colors_enabled(false);
        let step = TraceStep {
            seq: 0,
            kind: StepKind::Action,
            content: "SELECT *\nFROM items".to_string(),
            attempt: 1,
            timestamp: Utc::now(),
        };
        let text = ConsoleTraceView::format_step(&step);
        assert!(text.starts_with("#2 Action"));
        assert!(text.contains("SELECT *"));
        assert!(text.ends_with("FROM items"));
        assert_eq!(text.lines().count(), 2);
    }
}
