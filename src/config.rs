use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub scraper: ScraperConfig,
    pub screenshots: ScreenshotConfig,
    pub notifications: NotificationsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://prices.sqlite".to_string(),
            max_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub headless: bool,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub user_agent: Option<String>,
    pub chrome_path: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 60,
            selector_timeout_secs: 15,
            user_agent: None,
            chrome_path: None,
        }
    }
}

impl ScraperConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub max_name_length: usize,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("screenshots"),
            max_name_length: 80,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    pub smtp: SmtpConfig,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
    pub to_address: Option<String>,
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 465,
            username: None,
            password: None,
            from_address: None,
            from_name: "Price Watch".to_string(),
            to_address: None,
            use_tls: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub username: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: "Price Watch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,pricewatch=debug".to_string(),
            directory: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Optional file, any format the config crate understands
            .add_source(File::with_name(path).required(false))
            // Add environment variables with prefix "PRICEWATCH_"
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }
        config.notifications.smtp.apply_legacy_env()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Message("Database url must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Message("Database max_connections must be greater than 0".into()));
        }

        if self.scraper.navigation_timeout_secs == 0 || self.scraper.selector_timeout_secs == 0 {
            return Err(ConfigError::Message("Scraper timeouts must be greater than 0".into()));
        }

        if self.screenshots.enabled {
            if self.screenshots.directory.as_os_str().is_empty() {
                return Err(ConfigError::Message("Screenshot directory must not be empty".into()));
            }
            if self.screenshots.max_name_length == 0 {
                return Err(ConfigError::Message("Screenshot max_name_length must be greater than 0".into()));
            }
        }

        if self.notifications.smtp.port == 0 {
            return Err(ConfigError::Message("SMTP port must be greater than 0".into()));
        }

        if let Some(webhook) = &self.notifications.discord.webhook_url {
            if Url::parse(webhook).is_err() {
                return Err(ConfigError::Message("Invalid Discord webhook URL format".into()));
            }
        }

        Ok(())
    }
}

impl SmtpConfig {
    /// Fill unset fields from the plain `SMTP_*` / `ALERT_EMAIL_TO` variables.
    fn apply_legacy_env(&mut self) -> Result<(), ConfigError> {
        if self.host.is_none() {
            self.host = env::var("SMTP_HOST").ok();
        }
        if self.username.is_none() {
            self.username = env::var("SMTP_USER").ok();
        }
        if self.password.is_none() {
            self.password = env::var("SMTP_PASS").ok();
        }
        if self.to_address.is_none() {
            self.to_address = env::var("ALERT_EMAIL_TO").ok();
        }
        if let Ok(port) = env::var("SMTP_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::Message(format!("Invalid SMTP_PORT: {}", port)))?;
        }
        Ok(())
    }

    /// Mail delivery is only attempted when every credential is present.
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.username.is_some() && self.password.is_some() && self.to_address.is_some()
    }
}
