use std::time::Duration;

use chrono::{DateTime, TimeZone};

const PINGER_LOG: &str = "PINGER_LOG";

pub fn get_log_level() -> Option<String> {
    std::env::var(PINGER_LOG).ok()
}

/// Timestamp layout used in health events, e.g. `2024-05-01 13:37 +0200`
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M %z";

pub fn format_date<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(DATE_FORMAT).to_string()
}

/// Render a duration the way Go prints `time.Duration`.
///
/// Sub-second values keep the largest fitting unit (`850ns`, `12.5µs`,
/// `52.3ms`), everything else is split into hours, minutes and fractional
/// seconds (`2.001s`, `1m2s`, `1h0m5s`).
pub fn format_latency(duration: Duration) -> String {
    let nanos = duration.as_nanos();

    if nanos == 0 {
        return String::from("0s");
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", fraction(nanos, 1_000));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", fraction(nanos, 1_000_000));
    }

    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = fraction(
        u128::from(total_secs % 60) * 1_000_000_000 + u128::from(duration.subsec_nanos()),
        1_000_000_000,
    );

    match (hours, minutes) {
        (0, 0) => format!("{seconds}s"),
        (0, minutes) => format!("{minutes}m{seconds}s"),
        (hours, minutes) => format!("{hours}h{minutes}m{seconds}s"),
    }
}

fn fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rest = value % unit;
    if rest == 0 {
        return whole.to_string();
    }

    let digits = unit.ilog10() as usize;
    let rest = format!("{rest:0digits$}");
    format!("{whole}.{}", rest.trim_end_matches('0'))
}
