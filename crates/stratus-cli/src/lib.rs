//! # Stratus CLI
//!
//! Command-line interface for Stratus.
//! This crate provides the CLI structure, argument parsing, logging setup and command routing.

pub mod commands;
pub mod config;
pub mod display;

// Re-export common types
pub use config::Config;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Application-level errors for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Core domain error: {0}")]
    Core(#[from] stratus_core::StratusError),

    #[error("Utils error: {0}")]
    Utils(#[from] stratus_utils::UtilsError),

    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Main CLI struct
#[derive(Parser)]
#[command(name = "stratus")]
#[command(about = "Pick machine templates, carve address ranges and wait for cloud resources")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// All available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the usable host range of CIDR blocks
    Range(commands::range::RangeArgs),
    /// Allocate host addresses from a CIDR block
    Pool(commands::pool::PoolArgs),
    /// Rank catalog templates against a resource requirement
    Select(commands::select::SelectArgs),
    /// Poll commands until they succeed or time out
    #[command(
        long_about = "Poll one or more commands until each exits successfully.\n\n\
        Examples:\n  \
        stratus wait --timeout 2m --interval 5s -- curl -sf http://10.0.0.4/health\n  \
        stratus wait --probe 'nc -z 10.0.0.4 22' --probe 'nc -z 10.0.0.5 22'"
    )]
    Wait(commands::wait::WaitArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key, e.g. poll.interval_secs
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Reset configuration to defaults
    Reset,
    /// Print the configuration file path
    Path,
}

/// Install the log backend. `RUST_LOG` wins over the verbosity flag.
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. in tests) is not an error worth surfacing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Main CLI runner
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    execute(cli.command).await
}

/// Route a parsed command; only commands that use the config file read it
pub async fn execute(command: Commands) -> Result<()> {
    match command {
        Commands::Range(args) => commands::range::handle(args).await,
        Commands::Pool(args) => commands::pool::handle(args).await,
        Commands::Select(args) => commands::select::handle(args, &Config::new()?).await,
        Commands::Wait(args) => commands::wait::handle(args, &Config::new()?).await,
        Commands::Config { action } => commands::config::handle(action).await,
    }
}
