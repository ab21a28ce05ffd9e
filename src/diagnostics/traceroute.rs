//! [`PathTracer`] backed by the system `traceroute` binary
//!
//! Raw ICMP sockets need elevated privileges, the system binary already has
//! them. Its output is read line by line while the process runs, so hops are
//! yielded as soon as they are printed.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::anyhow;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use super::{Hop, PathTracer, TraceOptions};

static HOP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\s+(.*)$").expect("valid hop regex"));

static REPLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\S+)(?:\s+\(([^)]+)\))?\s+([\d.]+)\s*ms").expect("valid reply regex")
});

#[derive(Debug, Clone)]
pub struct SystemTraceroute {
    program: String,
}

impl Default for SystemTraceroute {
    fn default() -> Self {
        Self::new("traceroute")
    }
}

impl SystemTraceroute {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn arguments(address: IpAddr, options: &TraceOptions) -> Vec<String> {
        let mut args = vec![];
        if address.is_ipv6() {
            args.push("-6".to_string());
        }
        args.extend([
            "-f".to_string(),
            options.first_hop.to_string(),
            "-m".to_string(),
            options.max_hops.to_string(),
            "-q".to_string(),
            options.probes_per_hop.to_string(),
            address.to_string(),
            options.packet_size.to_string(),
        ]);
        args
    }
}

struct Running {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

impl PathTracer for SystemTraceroute {
    fn trace(
        &self,
        address: IpAddr,
        options: &TraceOptions,
    ) -> BoxStream<'static, anyhow::Result<Hop>> {
        let args = Self::arguments(address, options);
        debug!("running {} {}", self.program, args.join(" "));

        let mut child = match Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                let error = anyhow::Error::from(e).context(format!("failed to run {}", self.program));
                return stream::once(async move { Err(error) }).boxed();
            }
        };

        let Some(stdout) = child.stdout.take() else {
            return stream::once(async { Err(anyhow!("traceroute output is not captured")) }).boxed();
        };

        let running = Running {
            child,
            lines: BufReader::new(stdout).lines(),
        };

        stream::unfold(Some(running), |state| async move {
            let mut running = state?;
            loop {
                match running.lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(hop) = parse_hop_line(&line) {
                            return Some((Ok(hop), Some(running)));
                        }
                    }
                    Ok(None) => {
                        return match running.child.wait().await {
                            Ok(status) if status.success() => None,
                            Ok(status) => Some((Err(anyhow!("traceroute exited with {status}")), None)),
                            Err(e) => Some((Err(anyhow::Error::from(e)), None)),
                        };
                    }
                    Err(e) => {
                        let error = anyhow::Error::from(e).context("failed to read traceroute output");
                        return Some((Err(error), None));
                    }
                }
            }
        })
        .boxed()
    }
}

/// Parse one line of `traceroute` output.
///
/// Lines that do not start with a TTL (the header, warnings) yield `None`.
/// Only the first answering probe of a hop is kept.
pub fn parse_hop_line(line: &str) -> Option<Hop> {
    let captures = HOP_LINE.captures(line)?;
    let ttl = captures[1].parse().ok()?;
    let rest = captures[2].trim_start_matches(['*', ' ', '\t']);

    let Some(reply) = REPLY.captures(rest) else {
        return Some(Hop::timeout(ttl));
    };

    let name = &reply[1];
    let address = reply.get(2).map_or(name, |address| address.as_str());
    let elapsed = reply[3]
        .parse::<f64>()
        .ok()
        .map(|millis| Duration::from_nanos((millis * 1_000_000.0).round() as u64));

    Some(Hop {
        ttl,
        host: (name != address).then(|| name.to_string()),
        address: address.parse().ok(),
        elapsed,
        success: true,
    })
}
