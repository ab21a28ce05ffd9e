//! EventConsumer - the single reader of the fan-in channel
//!
//! Every probe worker owns a clone of the sender, this actor owns the only
//! receiver. Events are handed to the configured sinks one at a time, in the
//! order they arrive. Nothing is filtered or aggregated here.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use super::messages::{EventKind, HealthEvent};

/// Destination for published health events
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, event: &HealthEvent) -> anyhow::Result<()>;
}

/// Writes every event as one JSON line to stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

#[async_trait]
impl EventSink for StdoutSink {
    async fn deliver(&self, event: &HealthEvent) -> anyhow::Result<()> {
        println!("{}", event.to_json());
        Ok(())
    }
}

/// Records every event as a structured log line
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn deliver(&self, event: &HealthEvent) -> anyhow::Result<()> {
        let HealthEvent {
            server,
            status,
            responded_in,
            error,
            ..
        } = event;

        match event.kind {
            EventKind::Ok => info!(%server, status, %responded_in, "OK"),
            EventKind::Warning => warn!(%server, status, %responded_in, %error, "Warning"),
            EventKind::Fatal => error!(%server, %error, "Fatal"),
        }
        Ok(())
    }
}

pub struct EventConsumer {
    event_rx: mpsc::Receiver<HealthEvent>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventConsumer {
    pub fn new(event_rx: mpsc::Receiver<HealthEvent>) -> Self {
        Self {
            event_rx,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Drain the channel until every sender is gone
    ///
    /// Returns the number of events received.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> u64 {
        debug!("starting event consumer with {} sinks", self.sinks.len());

        let mut received = 0;
        while let Some(event) = self.event_rx.recv().await {
            received += 1;
            for sink in &self.sinks {
                if let Err(e) = sink.deliver(&event).await {
                    error!("failed to deliver event for {}: {e:#}", event.server);
                }
            }
        }

        warn!("all probes are gone, event consumer stopped after {received} events");
        received
    }
}
