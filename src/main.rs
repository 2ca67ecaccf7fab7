use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use insightsql::cli::ConnectionOverrides;

#[derive(Parser)]
#[command(name = "insightsql")]
#[command(
    version,
    about = "Ask questions of a SQLite database in plain language"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Args, Clone)]
struct ConnectionArgs {
    #[arg(long, env = "INSIGHTSQL_DB", help = "SQLite file path or sqlite:/// URI")]
    db: Option<String>,
    #[arg(long, help = "LLM provider (gemini, openai, ollama)")]
    provider: Option<String>,
    #[arg(long, help = "Model to use")]
    model: Option<String>,
}

impl From<ConnectionArgs> for ConnectionOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            database: args.db,
            provider: args.provider,
            model: args.model,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask {
        #[arg(help = "Question in plain language")]
        question: String,
        #[command(flatten)]
        connection: ConnectionArgs,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[arg(long, help = "Hide the reasoning trace")]
        no_trace: bool,
    },

    /// Interactive question session
    Chat {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[arg(long, help = "Hide the reasoning trace")]
        no_trace: bool,
    },

    /// Show the database schema
    Schema {
        #[command(flatten)]
        connection: ConnectionArgs,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mInsightSQL encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the command ran but the question was not answered
fn run_cli() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let answered = match cli.command {
        Commands::Ask {
            question,
            connection,
            format,
            no_trace,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(insightsql::cli::commands::ask::run(
                &question,
                &connection.into(),
                &format,
                !no_trace,
            ))?
        }
        Commands::Chat {
            connection,
            no_trace,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(insightsql::cli::commands::chat::run(
                &connection.into(),
                !no_trace,
            ))?
        }
        Commands::Schema { connection, format } => {
            insightsql::cli::commands::schema::run(&connection.into(), &format)?
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { format } => {
                    insightsql::cli::commands::config::show(&format)?;
                }
                ConfigAction::Path => {
                    insightsql::cli::commands::config::path()?;
                }
                ConfigAction::Init { global, force } => {
                    insightsql::cli::commands::config::init(global, force)?;
                }
            }
            true
        }
    };

    Ok(answered)
}
