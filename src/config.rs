use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::trace;

const CONFIG: &str = "CONFIG";

const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Longest accepted check interval, one week
pub const MAX_INTERVAL: u64 = 7 * 24 * 60 * 60;

/// Resolve the location of the configuration file.
///
/// The `CONFIG` variable wins when it is set to a non-empty value, otherwise
/// `config.json` in the working directory is used.
pub fn config_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    lookup(CONFIG)
        .filter(|path| !path.trim().is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    /// Latency threshold in seconds
    pub lag: u64,

    /// Seconds to sleep between two probes of the same target
    pub interval: u64,

    /// Newline separated list of target URLs
    pub urls_file: PathBuf,

    /// Only parsed so existing config files keep loading, no mail is sent
    #[serde(flatten)]
    pub smtp: Smtp,

    #[serde(default)]
    pub email_subject: String,

    #[serde(default)]
    pub from_email: String,

    #[serde(default)]
    pub to_emails: Vec<String>,

    /// Request deadline for a single probe in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Upper bound for a single diagnostic trace in seconds
    #[serde(default = "default_trace_timeout")]
    pub trace_timeout: u64,

    /// Capacity of the channel all probes publish into
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    #[serde(default = "default_source_lookup_url")]
    pub source_lookup_url: String,

    /// Where anomalies are delivered to (only logged if absent)
    pub notifier: Option<Notifier>,
}

impl Config {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.lag)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn trace_timeout(&self) -> Duration {
        Duration::from_secs(self.trace_timeout)
    }

    fn validate(self) -> anyhow::Result<Self> {
        if self.interval == 0 {
            anyhow::bail!("check interval must be at least one second");
        }
        if self.interval > MAX_INTERVAL {
            anyhow::bail!("check interval must not exceed {MAX_INTERVAL} seconds");
        }
        if self.timeout == 0 {
            anyhow::bail!("request timeout must be at least one second");
        }
        if self.trace_timeout == 0 {
            anyhow::bail!("trace timeout must be at least one second");
        }
        if self.event_buffer == 0 {
            anyhow::bail!("event buffer must hold at least one event");
        }
        Ok(self)
    }
}

/// SMTP credentials of the mail setup
///
/// Accepted for compatibility with existing config files. Anomalies are
/// delivered through [`Notifier`] transports or the log.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Smtp {
    #[serde(default, rename = "smtp_username", alias = "username")]
    pub username: String,

    #[serde(default, rename = "smtp_password", alias = "password")]
    pub password: String,

    #[serde(default, rename = "smtp_host", alias = "host")]
    pub host: String,

    #[serde(
        default,
        rename = "smtp_port",
        alias = "port",
        deserialize_with = "deserialize_port"
    )]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notifier {
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match <Option<Port> as serde::Deserialize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_trace_timeout() -> u64 {
    60
}

fn default_event_buffer() -> usize {
    1
}

fn default_source_lookup_url() -> String {
    String::from("https://api.ipify.org/")
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("Read {} failed", path.display()))?;
    serde_json::from_str::<Config>(&file_content)
        .with_context(|| format!("Parse {} failed", path.display()))?
        .validate()
        .inspect(|config| trace!("loaded config: {config:?}"))
}
