//! Public address of the monitor itself, attached to every health event.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentity(Arc<str>);

impl SourceIdentity {
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(Arc::from(address.as_ref().trim()))
    }

    /// Ask an external lookup service for our public IP.
    ///
    /// Must succeed before any probe is spawned.
    #[instrument(skip(client))]
    pub async fn resolve(client: &reqwest::Client, lookup_url: &str) -> anyhow::Result<Self> {
        let body = client
            .get(lookup_url)
            .send()
            .await
            .context("public IP lookup failed")?
            .error_for_status()
            .context("public IP lookup was rejected")?
            .text()
            .await
            .context("failed to read public IP lookup response")?;

        let identity = SourceIdentity::new(body);
        if identity.as_str().is_empty() {
            anyhow::bail!("public IP lookup returned an empty response");
        }

        info!("resolved source identity: {identity}");
        Ok(identity)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
