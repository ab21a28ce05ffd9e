use std::fmt;
use std::time::Duration;

use crate::actors::messages::{EventKind, ProbeOutcome, ProbeResponse};

/// Only this status counts as healthy
pub const EXPECTED_STATUS: u16 = 200;

/// Why a probe was not classified as `OK`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    Transport(String),
    UnexpectedStatus,
    LatencyExceeded,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::Transport(error) => f.write_str(error),
            Anomaly::UnexpectedStatus => f.write_str("Unexpected http status code!"),
            Anomaly::LatencyExceeded => f.write_str("Responsed times over lag threshold!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub kind: EventKind,
    pub reason: Option<Anomaly>,
}

impl Verdict {
    /// Classify a probe outcome against the latency threshold.
    ///
    /// ```text
    /// no response                          → Fatal   (Transport)
    /// status != 200                        → Warning (UnexpectedStatus)
    /// status == 200, elapsed > threshold   → Warning (LatencyExceeded)
    /// otherwise                            → OK
    /// ```
    ///
    /// A response that is both slow and has the wrong status yields a single
    /// warning carrying the status anomaly.
    pub fn evaluate(outcome: &ProbeOutcome, threshold: Duration) -> Verdict {
        match &outcome.response {
            ProbeResponse::TransportFailure { error } => Verdict {
                kind: EventKind::Fatal,
                reason: Some(Anomaly::Transport(error.clone())),
            },
            ProbeResponse::Received { status } if *status != EXPECTED_STATUS => Verdict {
                kind: EventKind::Warning,
                reason: Some(Anomaly::UnexpectedStatus),
            },
            ProbeResponse::Received { .. } if outcome.elapsed > threshold => Verdict {
                kind: EventKind::Warning,
                reason: Some(Anomaly::LatencyExceeded),
            },
            ProbeResponse::Received { .. } => Verdict {
                kind: EventKind::Ok,
                reason: None,
            },
        }
    }

    pub fn message(&self) -> String {
        self.reason
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}
