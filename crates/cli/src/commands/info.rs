//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{DispatchConfig, MessagingConfig, MsgPriority, SinkConfig};

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    service: String,
    log_level: String,
    dispatch: DispatchInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    sink: Option<SinkInfo>,
    fallback_sink: SinkInfo,
}

#[derive(Serialize)]
struct DispatchInfo {
    priority_levels: usize,
    /// Queue served for each known priority after clamping
    queues: Vec<QueueInfo>,
    poll_interval_ms: u64,
    abort_timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    instrumentation_interval_ms: Option<u64>,
}

#[derive(Serialize)]
struct QueueInfo {
    priority: String,
    queue: usize,
    /// Per-cycle budget at this level
    budget: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

impl From<&SinkConfig> for SinkInfo {
    fn from(sink: &SinkConfig) -> Self {
        Self {
            name: sink.name.clone(),
            sink_type: format!("{:?}", sink.sink_type),
            params: sink.params.clone(),
        }
    }
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_with_env(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

/// Queue and budget each priority maps to
fn queue_layout(dispatch: &DispatchConfig) -> Vec<QueueInfo> {
    let last = dispatch.priority_levels.max(1) - 1;
    MsgPriority::ALL
        .iter()
        .map(|priority| {
            let queue = priority.ordinal().min(last);
            QueueInfo {
                priority: priority.to_string(),
                queue,
                budget: (dispatch.initial_budget >> queue.min(usize::BITS as usize - 1)).max(1),
            }
        })
        .collect()
}

fn build_config_info(config: &MessagingConfig) -> ConfigInfo {
    let dispatch = &config.dispatch;
    ConfigInfo {
        version: format!("{:?}", config.version),
        service: config.name.clone(),
        log_level: config.log_level.clone(),
        dispatch: DispatchInfo {
            priority_levels: dispatch.priority_levels,
            queues: queue_layout(dispatch),
            poll_interval_ms: dispatch.poll_interval_ms,
            abort_timeout_ms: dispatch.abort_timeout_ms,
            instrumentation_interval_ms: dispatch
                .instrumentation_enabled
                .then_some(dispatch.instrumentation_interval_ms),
        },
        sink: config.sink.as_ref().map(SinkInfo::from),
        fallback_sink: config
            .fallback_sink
            .as_ref()
            .map(SinkInfo::from)
            .unwrap_or_else(|| SinkInfo {
                name: "nop".to_string(),
                sink_type: "Nop".to_string(),
                params: HashMap::new(),
            }),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Messenger Configuration ===\n");

    println!("Service");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Name: {}", info.service);
    println!("   └─ Log level: {}", info.log_level);

    let dispatch = &info.dispatch;
    println!("\nDispatch");
    println!("   ├─ Priority levels: {}", dispatch.priority_levels);
    println!("   ├─ Poll interval: {} ms", dispatch.poll_interval_ms);
    println!("   ├─ Abort timeout: {} ms", dispatch.abort_timeout_ms);
    match dispatch.instrumentation_interval_ms {
        Some(ms) => println!("   ├─ Stats dumps: every {} ms", ms),
        None => println!("   ├─ Stats dumps: disabled"),
    }
    println!("   └─ Queues");
    for (i, queue) in dispatch.queues.iter().enumerate() {
        let prefix = if i == dispatch.queues.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!(
            "         {} {} -> queue {} (budget {})",
            prefix, queue.priority, queue.queue, queue.budget
        );
    }

    println!("\nSinks");
    match &info.sink {
        Some(sink) => print_sink("├─", "primary", sink),
        None => println!("   ├─ primary: (none)"),
    }
    print_sink("└─", "fallback", &info.fallback_sink);

    println!();
}

fn print_sink(prefix: &str, role: &str, sink: &SinkInfo) {
    println!("   {} {}: {} ({})", prefix, role, sink.name, sink.sink_type);
    let mut params: Vec<_> = sink.params.iter().collect();
    params.sort();
    for (key, value) in params {
        println!("         {} = {}", key, value);
    }
}
