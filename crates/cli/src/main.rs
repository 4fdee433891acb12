//! # Messenger CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 消息服务的启动与生产者驱动
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, ObservabilityConfig};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_service, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Messenger CLI starting");

    let result = match &cli.command {
        Commands::Run(args) => run_service(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// Level precedence: `RUST_LOG`, then `-q`/`-v`, then the config file's
/// `log_level`, then `info`.
fn init_logging(cli: &Cli) -> Result<()> {
    let default_log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => configured_level(cli).unwrap_or_else(|| "info".to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let log_format = match cli.log_format {
        cli::LogFormat::Json => LogFormat::Json,
        cli::LogFormat::Pretty => LogFormat::Pretty,
        cli::LogFormat::Compact => LogFormat::Compact,
    };

    observability::init_with_config(
        ObservabilityConfig::for_service(default_log_level).with_format(log_format),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// `log_level` of the command's config file, if it loads
fn configured_level(cli: &Cli) -> Option<String> {
    config_loader::ConfigLoader::load_with_env(cli.command.config_path())
        .ok()
        .map(|config| config.log_level)
}
