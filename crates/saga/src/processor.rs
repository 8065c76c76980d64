//! Event ingress: hands delivered events to the orchestrator.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};

use crate::config::ProcessorConfig;
use crate::error::{Result, SagaError};
use crate::event::Event;
use crate::orchestrator::{DispatchOutcome, DispatchReport, SagaOrchestrator};

/// Accepts events from a bus adapter.
///
/// Adapters call `process_event` exactly once per logical delivery.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process_event(&self, event: Box<dyn Event>) -> Result<DispatchReport>;
}

/// Sending half of an event channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Box<dyn Event>>,
}

impl EventSender {
    /// Queues an event, waiting while the channel is full.
    pub async fn send<E: Event>(&self, event: E) -> Result<()> {
        self.send_boxed(Box::new(event)).await
    }

    /// Queues an already boxed event.
    pub async fn send_boxed(&self, event: Box<dyn Event>) -> Result<()> {
        self.tx.send(event).await.map_err(|_| SagaError::ChannelClosed)
    }
}

/// Receiving half of an event channel, consumed by [`SagaEventProcessor::run`].
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Box<dyn Event>>,
}

/// Counters collected by [`SagaEventProcessor::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Events taken off the channel.
    pub delivered: u64,
    /// Events whose handler completed.
    pub handled: u64,
    /// Events with no registered handler.
    pub unhandled: u64,
    /// Events whose handler failed, or whose task died.
    pub failed: u64,
    /// Malformed events rejected by the orchestrator.
    pub rejected: u64,
}

impl ProcessorStats {
    fn record(&mut self, joined: std::result::Result<Result<DispatchReport>, JoinError>) {
        match joined {
            Ok(Ok(report)) => match report.outcome {
                DispatchOutcome::Completed => self.handled += 1,
                DispatchOutcome::Unhandled => self.unhandled += 1,
                DispatchOutcome::HandlerFailed => self.failed += 1,
            },
            Ok(Err(_)) => self.rejected += 1,
            Err(error) => {
                tracing::error!(%error, "event processing task did not finish");
                self.failed += 1;
            }
        }
    }
}

impl std::ops::AddAssign for ProcessorStats {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.handled += other.handled;
        self.unhandled += other.unhandled;
        self.failed += other.failed;
        self.rejected += other.rejected;
    }
}

/// Feeds delivered events to a [`SagaOrchestrator`].
#[derive(Debug, Clone)]
pub struct SagaEventProcessor {
    orchestrator: Arc<SagaOrchestrator>,
    config: ProcessorConfig,
}

impl SagaEventProcessor {
    /// Creates a processor with the given configuration.
    pub fn new(orchestrator: Arc<SagaOrchestrator>, config: ProcessorConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Returns the processor configuration.
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Creates a bounded event channel sized by the configuration.
    pub fn channel(&self) -> (EventSender, EventReceiver) {
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        (EventSender { tx }, EventReceiver { rx })
    }

    /// Processes events until every sender is dropped, then waits for the
    /// in-flight events to finish.
    ///
    /// Each event runs on its own task with its own scope. At most
    /// `max_in_flight` events are processed at once.
    #[tracing::instrument(skip_all, fields(max_in_flight = self.config.max_in_flight))]
    pub async fn run(&self, mut receiver: EventReceiver) -> ProcessorStats {
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut tasks = JoinSet::new();
        let mut stats = ProcessorStats::default();

        tracing::info!("event processor started");

        while let Some(event) = receiver.rx.recv().await {
            stats.delivered += 1;
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let orchestrator = Arc::clone(&self.orchestrator);
            tasks.spawn(async move {
                let _permit = permit;
                orchestrator.process_event(event).await
            });

            while let Some(joined) = tasks.try_join_next() {
                stats.record(joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            stats.record(joined);
        }

        tracing::info!(
            delivered = stats.delivered,
            handled = stats.handled,
            unhandled = stats.unhandled,
            failed = stats.failed,
            rejected = stats.rejected,
            "event processor drained"
        );
        stats
    }
}

#[async_trait]
impl EventProcessor for SagaEventProcessor {
    async fn process_event(&self, event: Box<dyn Event>) -> Result<DispatchReport> {
        self.orchestrator.process_event(event).await
    }
}
