pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use supportdesk_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "supportdesk",
    about = "ACME Corp customer support assistant",
    long_about = "Route customer requests to billing, refund, general info and technical support specialists.",
    after_help = "Examples:\n  supportdesk chat\n  supportdesk ask \"refund order 123, it arrived damaged\"\n  supportdesk config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a supportdesk.toml file (must exist when given)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive support conversation on stdin/stdout")]
    Chat,
    #[command(about = "Route a single request and return structured output")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "Customer request text")]
        text: Vec<String>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let result = match cli.command {
        Command::Chat => commands::chat::run(options),
        Command::Ask { text } => commands::ask::run(options, &text.join(" ")),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so they never interleave with the conversation on
/// stdout. `RUST_LOG` wins over `logging.level` when set.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        tracing::debug!(event_name = "logging.already_initialized", "subscriber already set");
    }
}
