use std::fmt;
use std::path::Path;

use anyhow::Context;
use reqwest::Url;
use tracing::{debug, warn};

/// One monitored HTTP(S) endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    url: Url,
}

impl Target {
    /// Parse a single candidate line.
    ///
    /// Returns `None` for blank lines, non HTTP(S) schemes and lines that look
    /// like URLs but fail to parse.
    pub fn parse(line: &str) -> Option<Target> {
        let raw = line.trim();
        if !(raw.starts_with("http://") || raw.starts_with("https://")) {
            return None;
        }

        match Url::parse(raw) {
            Ok(url) if url.host_str().is_some() => Some(Target {
                raw: raw.to_string(),
                url,
            }),
            Ok(_) => {
                warn!("skipping target without host: {raw}");
                None
            }
            Err(e) => {
                warn!("skipping malformed target {raw}: {e}");
                None
            }
        }
    }

    /// The URL exactly as it was listed
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host including an explicit port, used as `server_url` in events
    pub fn host(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Host without port, used for resolving the network path
    pub fn trace_host(&self) -> String {
        self.url
            .host_str()
            .unwrap_or_default()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

pub fn parse_targets(content: &str) -> Vec<Target> {
    content.split('\n').filter_map(Target::parse).collect()
}

pub fn load_targets(path: impl AsRef<Path>) -> anyhow::Result<Vec<Target>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Read target list {} failed", path.display()))?;

    let targets = parse_targets(&content);
    debug!("loaded {} targets from {}", targets.len(), path.display());
    Ok(targets)
}
