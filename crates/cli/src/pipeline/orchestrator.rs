//! Pipeline orchestrator - drives one message service from start to drain.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Message, MessagingConfig, MsgPriority, StatsSnapshot};
use dispatcher::{MessageServiceBuilder, Messenger};
use observability::MessagingMetricsAggregator;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::input::{parse_line, CLI_SENDER};
use super::{PipelineStats, StopReason};
use crate::error::CliError;

/// How often the orchestrator samples delivery counters
const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Where submitted messages come from
#[derive(Debug, Clone)]
pub enum MessageSource {
    /// Synthetic messages cycling through every priority
    Generated { count: u64, interval: Duration },
    /// `priority|subject|body` lines read from stdin until EOF
    Stdin,
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Service and sink configuration
    pub messaging: MessagingConfig,

    /// Message producer
    pub source: MessageSource,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the producer finishes, `shutdown` resolves or the timeout
    /// expires, then stop the service gracefully
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let messaging = &self.config.messaging;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut service = MessageServiceBuilder::from_config(messaging)
            .await
            .context("Failed to create sinks")?
            .build()
            .context("Failed to build message service")?;

        service
            .start()
            .await
            .with_context(|| format!("Failed to start service '{}'", service.name()))?;

        let messenger = service.messenger();
        let submitted = Arc::new(AtomicU64::new(0));
        let mut producer = tokio::spawn(produce(
            self.config.source.clone(),
            messenger.clone(),
            Arc::clone(&submitted),
        ));

        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        let mut aggregator = MessagingMetricsAggregator::new();
        let mut last = StatsSnapshot::default();
        let mut sampler = tokio::time::interval(SAMPLE_INTERVAL);

        let (stop_reason, produced) = loop {
            tokio::select! {
                joined = &mut producer => {
                    let produced = joined
                        .map_err(|e| CliError::service(service.name(), e))
                        .and_then(|r| r);
                    break (StopReason::Completed, produced);
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping service...");
                    producer.abort();
                    break (StopReason::Signal, Ok(()));
                }
                _ = &mut deadline => {
                    info!("Timeout reached, stopping service");
                    producer.abort();
                    break (StopReason::Timeout, Ok(()));
                }
                _ = sampler.tick() => {
                    last = sample(&messenger, last, &mut aggregator);
                }
            }
        };

        info!(
            service = %service.name(),
            pending = messenger.pending(),
            reason = ?stop_reason,
            "Stopping service"
        );
        service
            .stop()
            .await
            .with_context(|| format!("Failed to stop service '{}'", service.name()))?;
        sample(&messenger, last, &mut aggregator);

        produced.context("Message producer failed")?;

        Ok(PipelineStats {
            service: service.name().to_string(),
            submitted: submitted.load(Ordering::Relaxed),
            totals: service.stats(),
            duration: start_time.elapsed(),
            stop_reason,
            metrics: aggregator,
        })
    }
}

/// Feed the counter growth since `last` into the aggregator
fn sample(
    messenger: &Messenger,
    last: StatsSnapshot,
    aggregator: &mut MessagingMetricsAggregator,
) -> StatsSnapshot {
    let now = messenger.stats();
    let delta = now.since(&last);
    if !delta.is_empty() {
        aggregator.update(&delta);
    }
    now
}

/// Submit messages from `source` until it is exhausted
async fn produce(
    source: MessageSource,
    messenger: Messenger,
    submitted: Arc<AtomicU64>,
) -> Result<(), CliError> {
    match source {
        MessageSource::Generated { count, interval } => {
            for i in 0..count {
                messenger.send_msg(generated_message(i));
                submitted.fetch_add(1, Ordering::Relaxed);

                if interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(interval).await;
                }
            }
            debug!(count, "Generator finished");
        }
        MessageSource::Stdin => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut line_no = 0;
            while let Some(line) = lines.next_line().await? {
                line_no += 1;
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                messenger.send_msg(parse_line(line_no, trimmed)?);
                submitted.fetch_add(1, Ordering::Relaxed);
            }
            debug!(lines = line_no, "Stdin closed");
        }
    }
    Ok(())
}

/// Synthetic message number `i`, cycling through every priority
fn generated_message(i: u64) -> Message {
    let priority = MsgPriority::ALL[(i % MsgPriority::COUNT as u64) as usize];
    Message::new(
        priority,
        format!("demo #{i}"),
        format!("generated {priority} message {i}"),
    )
    .with_from(CLI_SENDER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkConfig, SinkType};

    fn nop_config() -> MessagingConfig {
        MessagingConfig {
            name: "cli-test".into(),
            sink: Some(SinkConfig::new("primary", SinkType::Nop)),
            ..Default::default()
        }
    }

    #[test]
    fn test_generated_messages_cycle_priorities() {
        let priorities: Vec<_> = (0..4).map(|i| generated_message(i).priority).collect();
        assert_eq!(
            priorities,
            [
                MsgPriority::Urgent,
                MsgPriority::Normal,
                MsgPriority::BelowNormal,
                MsgPriority::Urgent
            ]
        );
    }

    #[tokio::test]
    async fn test_generated_run_delivers_everything() {
        let pipeline = Pipeline::new(PipelineConfig {
            messaging: nop_config(),
            source: MessageSource::Generated {
                count: 25,
                interval: Duration::ZERO,
            },
            timeout: None,
            metrics_port: None,
        });

        let stats = pipeline.run(std::future::pending()).await.unwrap();
        assert_eq!(stats.stop_reason, StopReason::Completed);
        assert_eq!(stats.submitted, 25);
        assert_eq!(stats.totals.sent, 25);
        assert_eq!(stats.metrics.summary().totals.sent, 25);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_service() {
        let pipeline = Pipeline::new(PipelineConfig {
            messaging: nop_config(),
            source: MessageSource::Generated {
                count: u64::MAX,
                interval: Duration::from_millis(5),
            },
            timeout: None,
            metrics_port: None,
        });

        let shutdown = tokio::time::sleep(Duration::from_millis(50));
        let stats = pipeline.run(shutdown).await.unwrap();
        assert_eq!(stats.stop_reason, StopReason::Signal);
        assert_eq!(stats.totals.sent, stats.submitted);
    }

    #[tokio::test]
    async fn test_missing_sink_fails_to_build() {
        let pipeline = Pipeline::new(PipelineConfig {
            messaging: MessagingConfig::default(),
            source: MessageSource::Generated {
                count: 1,
                interval: Duration::ZERO,
            },
            timeout: None,
            metrics_port: None,
        });
        assert!(pipeline.run(std::future::pending()).await.is_err());
    }
}
