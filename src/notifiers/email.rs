use async_trait::async_trait;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{NotificationResult, Notifier};
use crate::config::SmtpConfig;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub to_email: String,
    pub use_tls: bool,
}

impl EmailConfig {
    /// `None` unless host, credentials and recipient are all set.
    /// The sender defaults to the login name.
    pub fn from_smtp(smtp: &SmtpConfig) -> Option<Self> {
        let (Some(host), Some(username), Some(password), Some(to)) = (
            smtp.host.as_ref(),
            smtp.username.as_ref(),
            smtp.password.as_ref(),
            smtp.to_address.as_ref(),
        ) else {
            return None;
        };

        Some(EmailConfig {
            smtp_server: host.clone(),
            smtp_port: smtp.port,
            username: username.clone(),
            password: password.clone(),
            from_email: smtp.from_address.clone().unwrap_or_else(|| username.clone()),
            from_name: smtp.from_name.clone(),
            to_email: to.clone(),
            use_tls: smtp.use_tls,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailNotifier {
    config: Option<EmailConfig>,
}

impl EmailNotifier {
    pub fn new(config: Option<EmailConfig>) -> Self {
        EmailNotifier { config }
    }

    pub fn from_config(smtp: &SmtpConfig) -> Self {
        Self::new(EmailConfig::from_smtp(smtp))
    }

    fn build_message(config: &EmailConfig, subject: &str, body: &str) -> Result<Message> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| AppError::Notification(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = config
            .to_email
            .parse()
            .map_err(|e| AppError::Notification(format!("invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Notification(e.to_string()))
    }

    fn transport(config: &EmailConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());

        // relay() speaks implicit TLS, which is what port 465 expects
        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
                .map_err(|e| AppError::Notification(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_server)
        };

        Ok(builder.port(config.smtp_port).credentials(credentials).build())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &'static str {
        "email"
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn notify(&self, subject: &str, body: &str) -> Result<NotificationResult> {
        let Some(config) = &self.config else {
            return Ok(NotificationResult::failed("email is not configured"));
        };

        let email = Self::build_message(config, subject, body)?;
        let mailer = Self::transport(config)?;

        debug!("Sending alert email to {} via {}", config.to_email, config.smtp_server);
        match mailer.send(email).await {
            Ok(response) => Ok(NotificationResult::delivered(format!(
                "email-{}",
                response.code()
            ))),
            Err(e) => Ok(NotificationResult::failed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_smtp() -> SmtpConfig {
        SmtpConfig {
            host: Some("smtp.example.com".to_string()),
            username: Some("watcher@example.com".to_string()),
            password: Some("secret".to_string()),
            to_address: Some("me@example.com".to_string()),
            ..SmtpConfig::default()
        }
    }

    #[test]
    fn test_incomplete_smtp_is_not_configured() {
        let mut smtp = complete_smtp();
        smtp.password = None;

        assert!(EmailConfig::from_smtp(&smtp).is_none());
        assert!(!EmailNotifier::from_config(&smtp).is_configured());
    }

    #[test]
    fn test_sender_defaults_to_login() {
        let config = EmailConfig::from_smtp(&complete_smtp()).unwrap();

        assert_eq!(config.from_email, "watcher@example.com");
        assert_eq!(config.smtp_port, 465);
        assert!(config.use_tls);
    }

    #[test]
    fn test_build_plain_text_message() {
        let config = EmailConfig::from_smtp(&complete_smtp()).unwrap();
        let message =
            EmailNotifier::build_message(&config, "Price alert: target hit", "Kettle\nNow: £9.99").unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Price alert: target hit"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("text/plain"));
    }

    #[test]
    fn test_bad_recipient_is_a_notification_error() {
        let mut config = EmailConfig::from_smtp(&complete_smtp()).unwrap();
        config.to_email = "not an address".to_string();

        let err = EmailNotifier::build_message(&config, "s", "b").unwrap_err();
        assert_eq!(err.kind(), "Notification");
    }

    #[tokio::test]
    async fn test_unconfigured_notify_sends_nothing() {
        let notifier = EmailNotifier::default();

        let result = notifier.notify("subject", "body").await.unwrap();
        assert!(!result.success);
    }
}
