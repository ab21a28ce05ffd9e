use chrono::{DateTime, TimeZone};

use crate::actors::messages::{HealthEvent, ProbeOutcome};
use crate::config::Config;
use crate::monitors::threshold::Verdict;
use crate::source::SourceIdentity;
use crate::util::{format_date, format_latency};

/// Status code placeholder when no response was obtained
pub const NO_STATUS: i32 = -1;

/// Latency placeholder when no response was obtained
pub const NO_LATENCY: &str = "NaN";

/// Assembles health events from probe outcomes
///
/// Holds the values every event of a worker shares, so a single builder is
/// created per worker at spawn time.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    source: SourceIdentity,
    lag: u64,
    interval: u64,
}

impl EventBuilder {
    pub fn new(source: SourceIdentity, lag: u64, interval: u64) -> Self {
        Self {
            source,
            lag,
            interval,
        }
    }

    pub fn from_config(source: SourceIdentity, config: &Config) -> Self {
        Self::new(source, config.lag, config.interval)
    }

    pub fn build<Tz>(&self, outcome: &ProbeOutcome, verdict: &Verdict, at: &DateTime<Tz>) -> HealthEvent
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let (status, responded_in) = match outcome.status() {
            Some(status) => (i32::from(status), format_latency(outcome.elapsed)),
            None => (NO_STATUS, NO_LATENCY.to_string()),
        };

        HealthEvent {
            source: self.source.to_string(),
            server: outcome.host.clone(),
            kind: verdict.kind,
            date: format_date(at),
            lag: self.lag,
            interval: self.interval,
            status,
            responded_in,
            error: verdict.message(),
        }
    }
}
