//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

/// Messenger - priority message dispatch service
#[derive(Parser, Debug)]
#[command(
    name = "messenger",
    author,
    version,
    about = "Priority message dispatch service",
    long_about = "Runs a priority-queued message dispatcher.\n\n\
                  Loads sink configuration, accepts messages from a generator or stdin, \n\
                  delivers them through the primary sink with fallback on failure, \n\
                  and drains gracefully on shutdown."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "MESSENGER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "MESSENGER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the message service
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

impl Commands {
    /// Configuration file the command operates on
    pub fn config_path(&self) -> &Path {
        match self {
            Commands::Run(args) => &args.config,
            Commands::Validate(args) => &args.config,
            Commands::Info(args) => &args.config,
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "messaging.toml",
        env = "MESSENGER_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of generated demo messages (ignored with --stdin)
    #[arg(long, default_value = "100", env = "MESSENGER_COUNT")]
    pub count: u64,

    /// Delay between generated messages in milliseconds
    #[arg(long, default_value = "0", env = "MESSENGER_INTERVAL_MS")]
    pub interval_ms: u64,

    /// Read messages from stdin, one `priority|subject|body` per line
    #[arg(long)]
    pub stdin: bool,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "MESSENGER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Enable periodic stats dumps regardless of configuration
    #[arg(long)]
    pub instrumentation: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "MESSENGER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "messaging.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "messaging.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
