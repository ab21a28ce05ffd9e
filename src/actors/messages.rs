//! Message types for actor communication
//!
//! ## Design Principles
//!
//! 1. **Events**: every probe publishes one immutable `HealthEvent` into the fan-in channel
//! 2. **Commands**: request/response messages sent to a single probe via mpsc
//! 3. **Outcomes**: raw probe results stay local to the worker that produced them

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Health classification of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Response received with status 200 within the latency threshold
    #[serde(rename = "OK")]
    Ok,

    /// Response received but status or latency is off
    Warning,

    /// No response at all (DNS, connect, TLS, timeout, ...)
    Fatal,
}

impl EventKind {
    pub fn is_anomaly(self) -> bool {
        self != EventKind::Ok
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Ok => "OK",
            EventKind::Warning => "Warning",
            EventKind::Fatal => "Fatal",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one HTTP attempt against a target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Host the request was aimed at
    pub host: String,

    /// Wall-clock time from issuing the request until the response head arrived
    pub elapsed: Duration,

    pub response: ProbeResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResponse {
    Received { status: u16 },
    TransportFailure { error: String },
}

impl ProbeOutcome {
    pub fn received(host: impl Into<String>, status: u16, elapsed: Duration) -> Self {
        Self {
            host: host.into(),
            elapsed,
            response: ProbeResponse::Received { status },
        }
    }

    pub fn failed(host: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            host: host.into(),
            elapsed,
            response: ProbeResponse::TransportFailure {
                error: error.into(),
            },
        }
    }

    /// Status code, or `None` if no response was obtained
    pub fn status(&self) -> Option<u16> {
        match self.response {
            ProbeResponse::Received { status } => Some(status),
            ProbeResponse::TransportFailure { .. } => None,
        }
    }
}

/// Structured record of one probe attempt
///
/// The serialized field names are the wire format consumed by notifiers and
/// downstream log shippers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthEvent {
    #[serde(rename = "source_ip")]
    pub source: String,

    #[serde(rename = "server_url")]
    pub server: String,

    #[serde(rename = "message_type")]
    pub kind: EventKind,

    pub date: String,

    #[serde(rename = "lag_threshold_in_second")]
    pub lag: u64,

    #[serde(rename = "check_interval_in_second")]
    pub interval: u64,

    /// `-1` if the request itself failed
    #[serde(rename = "http_status_code")]
    pub status: i32,

    /// Human readable latency, `NaN` if the request itself failed
    #[serde(rename = "server_responsed_in")]
    pub responded_in: String,

    pub error: String,
}

impl HealthEvent {
    pub fn to_json(&self) -> String {
        // plain strings and integers only, serializing cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Commands that can be sent to a ProbeWorker
#[derive(Debug)]
pub enum ProbeCommand {
    /// Run one probe cycle right away, outside of the regular schedule
    ///
    /// The event is published to the fan-in channel as usual and also sent back.
    ProbeNow {
        respond_to: oneshot::Sender<HealthEvent>,
    },
}
