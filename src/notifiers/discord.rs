use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use super::{NotificationResult, Notifier};
use crate::config::DiscordConfig;
use crate::utils::error::Result;

/// Webhook messages are capped at this many characters.
const DISCORD_CONTENT_LIMIT: usize = 2000;

pub struct DiscordNotifier {
    client: Client,
    webhook_url: Option<String>,
    username: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>, username: impl Into<String>) -> Self {
        DiscordNotifier {
            client: Client::new(),
            webhook_url,
            username: username.into(),
        }
    }

    pub fn from_config(config: &DiscordConfig) -> Self {
        Self::new(config.webhook_url.clone(), config.username.clone())
    }

    fn create_webhook_payload(&self, subject: &str, body: &str) -> serde_json::Value {
        let content: String = format!("**{}**\n{}", subject, body)
            .chars()
            .take(DISCORD_CONTENT_LIMIT)
            .collect();

        json!({
            "username": self.username,
            "content": content,
        })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn notify(&self, subject: &str, body: &str) -> Result<NotificationResult> {
        let Some(webhook_url) = &self.webhook_url else {
            return Ok(NotificationResult::failed("discord is not configured"));
        };

        let payload = self.create_webhook_payload(subject, body);
        let response = self.client.post(webhook_url).json(&payload).send().await?;

        let status = response.status();
        debug!("Discord webhook answered {}", status);
        if status.is_success() {
            Ok(NotificationResult::delivered(format!(
                "discord-{}",
                chrono::Utc::now().timestamp()
            )))
        } else {
            Ok(NotificationResult::failed(format!("webhook returned {}", status)))
        }
    }
}
