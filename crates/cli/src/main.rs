//! Kotodama CLI — the main entry point.
//!
//! Commands:
//! - `serve`  — Start the LINE webhook server
//! - `chat`   — Talk to the persona from the terminal
//! - `check`  — Report which required settings are present (`--probe` pings the LLM and LINE)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "kotodama",
    about = "Kotodama — a persona chat bot for LINE",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file (defaults to ~/.kotodama/config.toml)
    #[arg(short, long, global = true, env = "KOTODAMA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the persona in the terminal
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Check configuration
    Check {
        /// Also contact the LLM endpoint to verify the key
        #[arg(long)]
        probe: bool,

        /// Print a config file with every default filled in, then exit
        #[arg(long)]
        default_config: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Chat { message } => commands::chat::run(config_path, message).await?,
        Commands::Check {
            probe,
            default_config,
        } => {
            if default_config {
                print!("{}", kotodama_config::AppConfig::default_toml());
            } else {
                commands::check::run(config_path, probe).await?
            }
        }
    }

    Ok(())
}
