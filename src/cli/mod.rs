pub mod commands;
pub mod trace_view;
pub mod ui;
pub mod util;

pub use trace_view::ConsoleTraceView;
pub use util::{CLI_SESSION_KEY, CommandContext, ConnectionOverrides};
