pub mod discord;
pub mod email;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::NotificationsConfig;
use crate::utils::error::Result;

pub use discord::DiscordNotifier;
pub use email::{EmailConfig, EmailNotifier};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Outbound alert channel. Unconfigured channels are skipped, not errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_configured(&self) -> bool;
    async fn notify(&self, subject: &str, body: &str) -> Result<NotificationResult>;
}

/// Fans one message out to every configured channel. Best effort.
#[derive(Default)]
pub struct NotifierSet {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        if !config.smtp.is_complete() {
            debug!("SMTP settings incomplete, email alerts disabled");
        }
        Self::new()
            .with(Box::new(EmailNotifier::from_config(&config.smtp)))
            .with(Box::new(DiscordNotifier::from_config(&config.discord)))
    }

    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn configured(&self) -> Vec<&'static str> {
        self.notifiers
            .iter()
            .filter(|n| n.is_configured())
            .map(|n| n.name())
            .collect()
    }

    /// Returns how many channels accepted the message.
    pub async fn dispatch(&self, subject: &str, body: &str) -> usize {
        let mut delivered = 0;

        for notifier in &self.notifiers {
            if !notifier.is_configured() {
                debug!("{} not configured, skipping", notifier.name());
                continue;
            }

            match notifier.notify(subject, body).await {
                Ok(result) if result.success => {
                    info!("Alert sent via {}", notifier.name());
                    delivered += 1;
                }
                Ok(result) => warn!(
                    "{} delivery failed: {}",
                    notifier.name(),
                    result.error.unwrap_or_default()
                ),
                Err(e) => warn!("{} delivery failed: {}", notifier.name(), e),
            }
        }

        delivered
    }
}
