use anyhow::Result;
use clap::{Parser, Subcommand};
use flipqs_app::commands;
use flipqs_app::config::{Config, DEFAULT_CONFIG_PATH};
use flipqs_app::Runtime;
use flipqs_core::Capability;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "flipqs", version, about = "Root-backed quick settings panel")]
struct Cli {
    /// Configuration file; defaults apply when it does not exist
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Watch for trigger events and serve the panel (default)
    Run,
    /// Check root access and permissions
    Check,
    /// Print the current state of every toggle as JSON
    Status,
    /// Flip one capability and exit
    Toggle {
        /// wifi, data, location or bluetooth
        capability: Capability,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    init_tracing(&config.log_level);
    tracing::debug!("Loaded configuration: {:?}", config);

    let runtime = Runtime::new(config);
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => commands::run::run(&runtime).await,
        Command::Check => commands::check::run(&runtime).await,
        Command::Status => commands::status::run(&runtime).await,
        Command::Toggle { capability } => commands::toggle::run(&runtime, capability).await,
    }
}
