use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::actors::messages::{EventKind, HealthEvent};
use crate::alerts::{Notification, Notifier};
use crate::config::Discord;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

/// Delivers notifications as Discord webhook embeds
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    discord: Discord,
}

impl DiscordNotifier {
    pub fn new(client: Client, discord: Discord) -> Self {
        Self { client, discord }
    }

    pub fn build_event_embed(&self, subject: &str, event: &HealthEvent) -> Embed {
        let (title, color) = match event.kind {
            EventKind::Fatal => ("🔴 Target Unreachable", 15158332), // Red
            EventKind::Warning => ("⚠️ Target Degraded", 15105570),  // Orange
            EventKind::Ok => ("✅ Target Healthy", 3066993),         // Green
        };

        let title = if subject.is_empty() {
            title.to_string()
        } else {
            format!("{title} | {subject}")
        };

        let mut fields = vec![
            EmbedField {
                name: "🌐 Server".to_string(),
                value: event.server.clone(),
                inline: true,
            },
            EmbedField {
                name: "📟 Status".to_string(),
                value: event.status.to_string(),
                inline: true,
            },
            EmbedField {
                name: "⏱️ Responded in".to_string(),
                value: format!("{} (limit: {}s)", event.responded_in, event.lag),
                inline: true,
            },
        ];

        if !event.error.is_empty() {
            fields.push(EmbedField {
                name: "❗ Error".to_string(),
                value: event.error.clone(),
                inline: false,
            });
        }

        Embed {
            title: Some(title),
            description: Some(format!(
                "Probe of **{}** reported `{}` at {}",
                event.server, event.kind, event.date
            )),
            color: Some(color),
            fields,
            footer: Some(EmbedFooter {
                text: format!(
                    "Source: {} | every {}s",
                    event.source, event.interval
                ),
            }),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    pub fn build_message(&self, notification: &Notification) -> Message {
        let embed = self.build_event_embed(&notification.subject, &notification.event);
        let mut message_builder = MessageBuilder::new().add_embed(embed);
        if let Some(user_id) = &self.discord.user_id {
            message_builder = message_builder.content(format!(
                "{} `{}` <@{user_id}>",
                notification.event.kind, notification.event.server
            ));
        }
        message_builder.build()
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    #[instrument(skip_all, fields(server = %notification.event.server))]
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        let message = self.build_message(notification);
        let response = self
            .client
            .post(&self.discord.url)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if let Ok(error_text) = response.text().await {
                error!("Discord API error response: {}", error_text);
            }
            anyhow::bail!("Discord message failed with status: {status}");
        }

        info!("Successfully sent Discord message");
        Ok(())
    }
}
