use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::actors::messages::HealthEvent;
use crate::config::{self, Config, Webhook};
use crate::discord::DiscordNotifier;

/// A message ready to be handed to a delivery transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
    /// The event the body was rendered from
    pub event: HealthEvent,
}

impl Notification {
    pub fn for_event(config: &Config, event: &HealthEvent) -> Self {
        Self {
            subject: config.email_subject.clone(),
            body: event.to_json(),
            from: config.from_email.clone(),
            to: config.to_emails.clone(),
            event: event.clone(),
        }
    }
}

/// Delivery transport for anomaly notifications
///
/// Implementations own the whole delivery; callers only log a returned error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Create the notifier configured for this process
pub fn build_notifier(config: &Config, client: Client) -> Arc<dyn Notifier> {
    match &config.notifier {
        Some(config::Notifier::Discord(discord)) => {
            Arc::new(DiscordNotifier::new(client, discord.clone()))
        }
        Some(config::Notifier::Webhook(webhook)) => {
            Arc::new(WebhookNotifier::new(client, webhook.clone()))
        }
        None => Arc::new(LogNotifier),
    }
}

/// Only records the notification in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        warn!(
            subject = %notification.subject,
            to = ?notification.to,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Posts the notification as JSON to a generic webhook
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: Client,
    webhook: Webhook,
}

impl WebhookNotifier {
    pub fn new(client: Client, webhook: Webhook) -> Self {
        Self { client, webhook }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip_all, fields(server = %notification.event.server))]
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let payload = json!({
            "subject": notification.subject,
            "from": notification.from,
            "to": notification.to,
            "message": notification.body,
            "event": notification.event,
            "timestamp": Utc::now().to_rfc3339()
        });

        let response = self.client.post(&self.webhook.url).json(&payload).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("webhook alert failed with status: {}", response.status());
        }

        info!("Successfully sent webhook alert");
        Ok(())
    }
}
