//! ProbeWorker - Monitors a single HTTP/HTTPS target
//!
//! ## Key Features
//!
//! 1. **One task per target** - workers never share state besides the read-only context
//! 2. **Latency tracking** - measures the time until the response head arrives
//! 3. **Fan-in** - publishes every HealthEvent into the shared mpsc channel
//! 4. **Side channels** - anomalies are notified and diagnosed without stopping the loop
//!
//! ## Message Flow
//!
//! ```text
//! probe → evaluate → build event → [notify, trigger trace] → publish → sleep(interval) → probe ...
//!                                                                         ↑
//!                                                      Commands (ProbeNow)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::alerts::{Notification, Notifier};
use crate::config::{Config, MAX_INTERVAL};
use crate::diagnostics::DiagnosticTrigger;
use crate::monitors::event::EventBuilder;
use crate::monitors::threshold::Verdict;
use crate::source::SourceIdentity;
use crate::targets::Target;

use super::messages::{HealthEvent, ProbeCommand, ProbeOutcome};

/// Build the HTTP client shared by all probes
///
/// The timeout is a hard deadline for a single request and unrelated to the
/// latency threshold used for classification.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Read-only state every worker gets a copy of at spawn time
#[derive(Clone)]
pub struct ProbeContext {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
    pub source: SourceIdentity,
    pub notifier: Arc<dyn Notifier>,
    pub diagnostics: DiagnosticTrigger,
}

/// Actor that probes one target until the process ends
pub struct ProbeWorker {
    target: Target,

    context: ProbeContext,

    events: EventBuilder,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<ProbeCommand>,

    /// Fan-in sender, shared with every other worker
    event_tx: mpsc::Sender<HealthEvent>,
}

impl ProbeWorker {
    pub fn new(
        target: Target,
        context: ProbeContext,
        command_rx: mpsc::Receiver<ProbeCommand>,
        event_tx: mpsc::Sender<HealthEvent>,
    ) -> Self {
        let events = EventBuilder::from_config(context.source.clone(), &context.config);
        Self {
            target,
            context,
            events,
            command_rx,
            event_tx,
        }
    }

    /// Run the actor's main loop
    ///
    /// The first probe starts right away. Afterwards the worker sleeps for
    /// the configured interval between two probes. The loop only ends when
    /// the fan-in channel is closed, i.e. the consumer is gone.
    #[instrument(skip(self), fields(target = %self.target))]
    pub async fn run(mut self) {
        debug!("starting probe worker");

        let interval = self.context.config.interval();
        let mut commands_open = true;

        'probing: loop {
            if self.cycle().await.is_err() {
                break;
            }

            let wake_up = next_wake_up(Instant::now(), interval);
            loop {
                tokio::select! {
                    _ = sleep_until(wake_up) => break,

                    cmd = self.command_rx.recv(), if commands_open => match cmd {
                        Some(ProbeCommand::ProbeNow { respond_to }) => {
                            debug!("received ProbeNow command");
                            match self.cycle().await {
                                Ok(event) => {
                                    let _ = respond_to.send(event);
                                }
                                Err(_) => break 'probing,
                            }
                        }
                        // handles dropped, keep probing on schedule
                        None => commands_open = false,
                    },
                }
            }
        }

        warn!("event channel closed, probe worker stopped");
    }

    /// Probe once, handle anomalies and publish the resulting event
    async fn cycle(&self) -> Result<HealthEvent, SendError<HealthEvent>> {
        let outcome = self.probe().await;
        let verdict = Verdict::evaluate(&outcome, self.context.config.threshold());
        let event = self.events.build(&outcome, &verdict, &Local::now());

        if verdict.kind.is_anomaly() {
            warn!(
                kind = %event.kind,
                status = event.status,
                responded_in = %event.responded_in,
                "{}",
                event.error
            );
            self.notify(&event).await;
            self.context.diagnostics.trigger(self.target.trace_host());
        } else {
            trace!("target healthy, responded in {}", event.responded_in);
        }

        // waits for the consumer if the channel is full
        self.event_tx.send(event.clone()).await?;
        Ok(event)
    }

    /// Issue the HTTP request and measure its latency
    async fn probe(&self) -> ProbeOutcome {
        let host = self.target.host();
        trace!("probing {}", self.target);

        let start = Instant::now();
        match self
            .context
            .client
            .get(self.target.url().clone())
            .send()
            .await
        {
            Ok(mut response) => {
                let elapsed = start.elapsed();
                let status = response.status().as_u16();

                // read to the end so the connection goes back to the pool,
                // one chunk at a time
                loop {
                    match response.chunk().await {
                        Ok(Some(_)) => continue,
                        Ok(None) => break,
                        Err(e) => {
                            trace!("failed to drain response body: {e}");
                            break;
                        }
                    }
                }

                ProbeOutcome::received(host, status, elapsed)
            }
            Err(e) => {
                let error = anyhow::Error::from(e);
                ProbeOutcome::failed(host, format!("{error:#}"), start.elapsed())
            }
        }
    }

    async fn notify(&self, event: &HealthEvent) {
        let notification = Notification::for_event(&self.context.config, event);
        if let Err(e) = self.context.notifier.send(&notification).await {
            error!("failed to send notification: {e:#}");
        }
    }
}

/// Deadline of the next scheduled probe, saturating far in the future
fn next_wake_up(now: Instant, interval: Duration) -> Instant {
    now.checked_add(interval)
        .unwrap_or_else(|| now + Duration::from_secs(MAX_INTERVAL))
}

/// Handle for controlling a ProbeWorker
///
/// Dropping every handle does not stop the worker.
#[derive(Clone)]
pub struct ProbeHandle {
    sender: mpsc::Sender<ProbeCommand>,
    target: Target,
}

impl ProbeHandle {
    /// Spawn a new probe worker
    pub fn spawn(target: Target, context: ProbeContext, event_tx: mpsc::Sender<HealthEvent>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let actor = ProbeWorker::new(target.clone(), context, cmd_rx, event_tx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            target,
        }
    }

    /// Run one probe right away and return its event
    pub async fn probe_now(&self) -> Result<HealthEvent> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(ProbeCommand::ProbeNow { respond_to: tx })
            .await
            .context("probe worker is gone")?;

        rx.await.context("probe worker stopped before answering")
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

/// Spawn one worker per target, all publishing into `event_tx`
pub fn spawn_probes(
    targets: &[Target],
    context: &ProbeContext,
    event_tx: &mpsc::Sender<HealthEvent>,
) -> Vec<ProbeHandle> {
    targets
        .iter()
        .map(|target| {
            info!("monitoring {target}");
            ProbeHandle::spawn(target.clone(), context.clone(), event_tx.clone())
        })
        .collect()
}
