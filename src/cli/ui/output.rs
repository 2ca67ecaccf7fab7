use console::style;

use crate::types::ClassifiedError;

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Terminal failure: kind and raw message, then the hint
    pub fn failure(&self, error: &ClassifiedError) {
        eprintln!(
            "{} {} {}",
            style("✗").red(),
            style(format!("[{}]", error.kind)).red().bold(),
            error.raw
        );
        if error.hint != error.raw {
            eprintln!("  {} {}", style("hint:").dim(), error.hint);
        }
    }

    pub fn answer(&self, text: &str) {
        println!("\n{}", text);
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
