// Shared fixtures for the end-to-end tests.
// Pages are served from memory and every run writes to a throwaway database.

pub mod notification_tests;
pub mod watch_run_tests;
pub mod watchlist_tests;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use pricewatch::{
    AppConfig, WatchRunner,
    config::{DatabaseConfig, ScreenshotConfig},
    extraction::Extractor,
    models::WatchItem,
    notifiers::{NotificationResult, Notifier, NotifierSet},
    store::SqliteStore,
};

/// Test configuration rooted in `dir`
pub fn get_test_config(dir: &Path) -> AppConfig {
    AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}", dir.join("prices.sqlite").display()),
            max_connections: 1,
        },
        screenshots: ScreenshotConfig {
            enabled: true,
            directory: dir.join("screenshots"),
            max_name_length: 80,
        },
        ..AppConfig::default()
    }
}

pub fn dec(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

pub fn watch_item(name: &str, url: &str, target: &str, selector: Option<&str>) -> WatchItem {
    WatchItem {
        name: name.to_string(),
        url: url.to_string(),
        target_price: dec(target),
        price_selector: selector.map(str::to_string),
        currency: "GBP".to_string(),
    }
}

/// Keeps every message instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn notify(&self, subject: &str, body: &str) -> pricewatch::Result<NotificationResult> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(NotificationResult::delivered("recorded"))
    }
}

/// Runner wired to `notifier` only, plus an open store.
pub async fn create_test_runner(
    config: &AppConfig,
    notifier: &RecordingNotifier,
) -> anyhow::Result<(WatchRunner, SqliteStore)> {
    let store = SqliteStore::connect(&config.database).await?;
    let runner = WatchRunner::new(
        Extractor::new(&config.scraper, &config.screenshots),
        NotifierSet::new().with(Box::new(notifier.clone())),
    );
    Ok((runner, store))
}

/// Product page with a visible price and no structured data
pub fn price_page(price: &str) -> String {
    format!(
        r#"<html><body><h1>Kettle</h1><span class="price">£{}</span></body></html>"#,
        price
    )
}
