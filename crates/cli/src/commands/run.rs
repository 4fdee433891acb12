//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use contracts::MessagingConfig;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{MessageSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_service(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut messaging = config_loader::ConfigLoader::load_with_env(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.instrumentation && !messaging.dispatch.instrumentation_enabled {
        info!("Enabling stats dumps from CLI");
        messaging.dispatch.instrumentation_enabled = true;
    }

    info!(
        service = %messaging.name,
        levels = messaging.dispatch.priority_levels,
        sink = ?messaging.sink.as_ref().map(|s| &s.name),
        fallback = ?messaging.fallback_sink.as_ref().map(|s| &s.name),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&messaging);
        return Ok(());
    }

    let source = if args.stdin {
        MessageSource::Stdin
    } else {
        MessageSource::Generated {
            count: args.count,
            interval: Duration::from_millis(args.interval_ms),
        }
    };

    let pipeline = Pipeline::new(PipelineConfig {
        messaging,
        source,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    info!("Starting service...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Service run failed")?;

    info!(
        submitted = stats.submitted,
        sent = stats.totals.sent,
        fallback_sent = stats.totals.fallback_sent,
        lost = stats.totals.lost(),
        duration_secs = stats.duration.as_secs_f64(),
        "Service stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &MessagingConfig) {
    let dispatch = &config.dispatch;

    println!("\n=== Configuration Summary ===\n");
    println!("Service: {}", config.name);
    println!("  Priority levels: {}", dispatch.priority_levels);
    println!("  Initial budget: {}", dispatch.initial_budget);
    println!("  Poll interval: {} ms", dispatch.poll_interval_ms);
    println!("  Abort timeout: {} ms", dispatch.abort_timeout_ms);
    if dispatch.instrumentation_enabled {
        println!(
            "  Stats dumps: every {} ms",
            dispatch.instrumentation_interval_ms
        );
    }

    println!("\nSinks:");
    match &config.sink {
        Some(sink) => println!("  primary: {} ({:?})", sink.name, sink.sink_type),
        None => println!("  primary: (none)"),
    }
    match &config.fallback_sink {
        Some(sink) => println!("  fallback: {} ({:?})", sink.name, sink.sink_type),
        None => println!("  fallback: nop"),
    }

    println!();
}
