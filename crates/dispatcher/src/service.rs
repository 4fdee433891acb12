//! MessageService - lifecycle controller of the priority dispatcher

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use contracts::{DispatchConfig, MessageSink, MessagingConfig, StatsSnapshot};

use crate::error::DispatcherError;
use crate::factory::{create_sink, ConfiguredSink};
use crate::messenger::{Messenger, ServiceState, Shared};
use crate::worker::{DispatchWorker, WorkerExit};

/// Builder for creating a MessageService
///
/// Sinks are moved in, so each sink belongs to exactly one service.
pub struct MessageServiceBuilder<P, F> {
    name: String,
    config: DispatchConfig,
    sink: Option<P>,
    fallback: Option<F>,
}

impl<P: MessageSink + 'static, F: MessageSink + Default + 'static> MessageServiceBuilder<P, F> {
    /// Create a new MessageServiceBuilder
    pub fn new(name: impl Into<String>, config: DispatchConfig) -> Self {
        Self {
            name: name.into(),
            config,
            sink: None,
            fallback: None,
        }
    }

    /// Set the primary sink
    pub fn sink(mut self, sink: P) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the fallback sink (defaults to `F::default()`)
    pub fn fallback(mut self, fallback: F) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Build an inactive service
    ///
    /// # Errors
    /// `MissingSink` when no primary sink was set, `Contract` when the
    /// dispatch parameters are out of range
    pub fn build(self) -> Result<MessageService<P, F>, DispatcherError> {
        self.config.check()?;
        let sink = self.sink.ok_or_else(|| DispatcherError::MissingSink {
            service: self.name.clone(),
        })?;
        let fallback = self.fallback.unwrap_or_default();
        let shared = Arc::new(Shared::new(self.name, self.config.priority_levels));

        Ok(MessageService {
            shared,
            config: self.config,
            sinks: Some((sink, fallback)),
            stop: CancellationToken::new(),
            worker: None,
        })
    }
}

impl MessageServiceBuilder<ConfiguredSink, ConfiguredSink> {
    /// Create a builder whose sinks come from configuration
    ///
    /// A missing fallback section yields a nop sink.
    #[instrument(name = "message_service_from_config", skip(config), fields(service = %config.name))]
    pub async fn from_config(config: &MessagingConfig) -> Result<Self, DispatcherError> {
        let mut builder = Self::new(&config.name, config.dispatch.clone());
        if let Some(sink) = &config.sink {
            builder = builder.sink(create_sink(sink).await?);
        }
        if let Some(fallback) = &config.fallback_sink {
            builder = builder.fallback(create_sink(fallback).await?);
        }
        Ok(builder)
    }
}

/// Priority dispatch service
///
/// Owned by the host application; producers get a [`Messenger`].
pub struct MessageService<P, F> {
    shared: Arc<Shared>,
    config: DispatchConfig,
    /// Present while inactive; owned by the worker while running
    sinks: Option<(P, F)>,
    stop: CancellationToken,
    worker: Option<JoinHandle<WorkerExit<P, F>>>,
}

impl<P: MessageSink + 'static, F: MessageSink + 'static> MessageService<P, F> {
    /// Service name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        self.shared.state()
    }

    /// True while the service accepts messages
    pub fn is_running(&self) -> bool {
        self.state() == ServiceState::Running
    }

    /// Producer handle
    pub fn messenger(&self) -> Messenger {
        Messenger::new(Arc::clone(&self.shared))
    }

    /// Dispatch parameters
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Lifetime delivery counters
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.totals()
    }

    /// Start sinks and spawn the dispatch worker
    ///
    /// # Errors
    /// Wrong state, lost sinks, or a sink failing to start; the service is
    /// left inactive.
    #[instrument(name = "message_service_start", skip(self), fields(service = %self.shared.name))]
    pub async fn start(&mut self) -> Result<(), DispatcherError> {
        info!(service = %self.shared.name, "Entering start");

        self.shared
            .transition(ServiceState::Inactive, ServiceState::Starting)
            .map_err(|state| DispatcherError::invalid_state(&self.shared.name, "start", state))?;

        match self.do_start().await {
            Ok(()) => {
                self.shared.set_state(ServiceState::Running);
                info!(
                    service = %self.shared.name,
                    levels = self.shared.queues.levels(),
                    "Exiting start"
                );
                Ok(())
            }
            Err(e) => {
                self.shared.set_state(ServiceState::Inactive);
                error!(
                    service = %self.shared.name,
                    severity = "catastrophic",
                    error = %e,
                    "Start failed"
                );
                Err(e)
            }
        }
    }

    async fn do_start(&mut self) -> Result<(), DispatcherError> {
        let Some((mut sink, mut fallback)) = self.sinks.take() else {
            return Err(DispatcherError::SinkUnavailable {
                service: self.shared.name.clone(),
            });
        };

        let stranded = self.shared.queues.clear_all();
        if stranded > 0 {
            warn!(service = %self.shared.name, dropped = stranded, "Discarded messages left from previous run");
        }

        if let Err(source) = sink.start().await {
            let name = sink.name().to_string();
            self.sinks = Some((sink, fallback));
            return Err(DispatcherError::SinkStart { name, source });
        }
        if let Err(source) = fallback.start().await {
            let name = fallback.name().to_string();
            sink.signal_stop().await;
            if let Err(e) = sink.wait_for_complete_stop().await {
                warn!(sink = %sink.name(), error = %e, "Stop after aborted start failed");
            }
            self.sinks = Some((sink, fallback));
            return Err(DispatcherError::SinkStart { name, source });
        }

        self.stop = CancellationToken::new();
        let worker = DispatchWorker::new(
            Arc::clone(&self.shared),
            self.config.clone(),
            sink,
            fallback,
            self.stop.clone(),
        );
        self.worker = Some(tokio::spawn(worker.run()));
        Ok(())
    }

    /// Request stop without waiting
    ///
    /// The worker leaves its wait immediately, forwards the stop to both
    /// sinks and performs a final drain.
    pub fn signal_stop(&self) {
        match self
            .shared
            .transition(ServiceState::Running, ServiceState::Stopping)
        {
            Ok(()) => {
                info!(service = %self.shared.name, "Stop signalled");
                self.stop.cancel();
                self.shared.wake.notify_one();
            }
            Err(state) => {
                info!(service = %self.shared.name, ?state, "Stop signal ignored");
            }
        }
    }

    /// Wait for the final drain and for both sinks to stop
    ///
    /// # Errors
    /// Worker panic or a sink failing to stop; the service is inactive
    /// either way.
    #[instrument(name = "message_service_wait_for_complete_stop", skip(self), fields(service = %self.shared.name))]
    pub async fn wait_for_complete_stop(&mut self) -> Result<(), DispatcherError> {
        info!(service = %self.shared.name, "Entering wait_for_complete_stop");

        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let result = match worker.await {
            Ok(WorkerExit {
                mut sink,
                mut fallback,
                sink_signalled,
                fallback_signalled,
            }) => {
                if !sink_signalled {
                    sink.signal_stop().await;
                }
                if !fallback_signalled {
                    fallback.signal_stop().await;
                }
                let primary = sink.wait_for_complete_stop().await;
                let secondary = fallback.wait_for_complete_stop().await;
                self.sinks = Some((sink, fallback));
                primary.and(secondary).map_err(DispatcherError::from)
            }
            Err(e) => Err(DispatcherError::WorkerPanicked {
                service: self.shared.name.clone(),
                message: e.to_string(),
            }),
        };

        self.shared.set_state(ServiceState::Inactive);

        match &result {
            Ok(()) => info!(service = %self.shared.name, "Exiting wait_for_complete_stop"),
            Err(e) => error!(
                service = %self.shared.name,
                severity = "catastrophic",
                error = %e,
                "wait_for_complete_stop failed"
            ),
        }
        result
    }

    /// Signal stop and wait for completion
    pub async fn stop(&mut self) -> Result<(), DispatcherError> {
        self.signal_stop();
        self.wait_for_complete_stop().await
    }
}

impl<P, F> Drop for MessageService<P, F> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop.cancel();
            self.shared.wake.notify_one();
        }
    }
}
