//! Network path diagnostics for failing targets
//!
//! When a probe reports `Warning` or `Fatal`, the worker hands the target's
//! host to the [`DiagnosticTrigger`]. The trigger runs in its own task with a
//! bounded lifetime, so a hanging trace never delays the next probe. At most
//! one trace per host runs at a time:
//!
//! ```text
//! ProbeWorker ──trigger(host)──► spawned task: resolve host ─► PathTracer::trace ─► render hops
//!      │                                          (silent on failure)      (bounded by deadline)
//!      └─► continues with publish / sleep immediately
//! ```

pub mod render;
pub mod traceroute;

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, trace, warn};

pub use traceroute::SystemTraceroute;

/// Bounds for a single path trace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceOptions {
    pub max_hops: u8,
    pub probes_per_hop: u8,
    pub first_hop: u8,
    pub packet_size: u16,
}

pub const DEFAULT_MAX_HOPS: u8 = 20;

pub const DEFAULT_FIRST_HOP: u8 = 1;

pub const DEFAULT_PROBES_PER_HOP: u8 = 1;

pub const DEFAULT_PACKET_SIZE: u16 = 52;

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            probes_per_hop: DEFAULT_PROBES_PER_HOP,
            first_hop: DEFAULT_FIRST_HOP,
            packet_size: DEFAULT_PACKET_SIZE,
        }
    }
}

/// One hop of a network path
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    pub ttl: u8,
    /// Reverse resolved name, if any
    pub host: Option<String>,
    pub address: Option<IpAddr>,
    pub elapsed: Option<Duration>,
    pub success: bool,
}

impl Hop {
    pub fn timeout(ttl: u8) -> Self {
        Self {
            ttl,
            host: None,
            address: None,
            elapsed: None,
            success: false,
        }
    }
}

/// Produces the hops towards an address, lazily and in TTL order
pub trait PathTracer: Send + Sync {
    fn trace(&self, address: IpAddr, options: &TraceOptions)
    -> BoxStream<'static, anyhow::Result<Hop>>;
}

/// Starts detached path traces for failing hosts
#[derive(Clone)]
pub struct DiagnosticTrigger {
    tracer: Arc<dyn PathTracer>,
    options: TraceOptions,
    deadline: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Marks a host as being traced until dropped
struct InFlight {
    hosts: Arc<Mutex<HashSet<String>>>,
    host: String,
}

impl InFlight {
    fn acquire(hosts: &Arc<Mutex<HashSet<String>>>, host: &str) -> Option<Self> {
        let mut guard = hosts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(host.to_string()).then(|| Self {
            hosts: hosts.clone(),
            host: host.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.hosts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.host);
    }
}

impl DiagnosticTrigger {
    pub fn new(tracer: Arc<dyn PathTracer>, options: TraceOptions, deadline: Duration) -> Self {
        Self {
            tracer,
            options,
            deadline,
            in_flight: Arc::default(),
        }
    }

    pub fn options(&self) -> &TraceOptions {
        &self.options
    }

    /// Trace the path to `host` in a separate task.
    ///
    /// Returns `None` without starting anything while a trace to the same
    /// host is still running. The returned handle may be dropped; the trace
    /// keeps running until it finishes or its deadline passes.
    pub fn trigger(&self, host: impl Into<String>) -> Option<JoinHandle<()>> {
        let host = host.into();
        let Some(in_flight) = InFlight::acquire(&self.in_flight, &host) else {
            debug!("trace to {host} already running");
            return None;
        };

        let this = self.clone();
        Some(tokio::spawn(async move {
            let _in_flight = in_flight;
            if tokio::time::timeout(this.deadline, this.run(&host)).await.is_err() {
                warn!("trace to {host} aborted after {:?}", this.deadline);
            }
        }))
    }

    #[instrument(skip(self))]
    async fn run(&self, host: &str) {
        let Some(address) = resolve(host).await else {
            trace!("could not resolve {host}, skipping trace");
            return;
        };

        info!("{}", render::header(host, address, &self.options));

        let mut hops = self.tracer.trace(address, &self.options);
        while let Some(hop) = hops.next().await {
            match hop {
                Ok(hop) => info!("{}", render::hop(&hop)),
                Err(e) => {
                    error!("trace to {host} failed: {e:#}");
                    return;
                }
            }
        }
    }
}

async fn resolve(host: &str) -> Option<IpAddr> {
    if let Ok(address) = host.parse::<IpAddr>() {
        return Some(address);
    }

    tokio::net::lookup_host((host, 0))
        .await
        .ok()?
        .map(|socket| socket.ip())
        .next()
}
