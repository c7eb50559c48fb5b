pub mod price;
pub mod structured_data;

use regex::Regex;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{ScraperConfig, ScreenshotConfig};
use crate::models::{ExtractionResult, StrategyFailure, WatchItem};
use crate::scraper::Document;

pub use price::{format_currency, parse_amount, parse_price, parse_price_in};
pub use structured_data::find_offer_price;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9._-]+").expect("file name pattern is a valid regex"));

/// One way of reading a price off a page. Tried in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// A configured CSS selector: element text, then its `content` attribute.
    Selector(String),
    /// JSON-LD offer data.
    StructuredData,
    /// Currency pattern over the whole markup. Most prone to false positives.
    RawText,
}

impl Strategy {
    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::Selector(_) => "selector",
            Strategy::StructuredData => "jsonld",
            Strategy::RawText => "regex",
        }
    }

    pub fn failure_tag(&self) -> String {
        format!("{}_failed", self.tag())
    }

    /// Text matches only count when marked with `currency`'s symbol.
    async fn attempt(
        &self,
        page: &dyn Document,
        currency: &str,
        selector_timeout: Duration,
    ) -> std::result::Result<Decimal, String> {
        match self {
            Strategy::Selector(selector) => {
                let text = page
                    .visible_text(selector, selector_timeout)
                    .await
                    .map_err(|e| e.to_string())?;
                if let Some(price) = parse_price_in(&text, currency) {
                    return Ok(price);
                }

                // Some shops keep the number in e.g. <meta content="299.00">
                match page.attribute(selector, "content").await {
                    Ok(Some(content)) => parse_amount(&content)
                        .ok_or_else(|| format!("unparseable content attribute '{}'", content.trim())),
                    Ok(None) => Err(format!("no price in element text '{}'", text.trim())),
                    Err(e) => Err(e.to_string()),
                }
            }
            Strategy::StructuredData => {
                let blocks = page.structured_data_blocks().await.map_err(|e| e.to_string())?;
                find_offer_price(&blocks)
                    .ok_or_else(|| format!("no offer price in {} structured-data block(s)", blocks.len()))
            }
            Strategy::RawText => {
                let content = page.content().await.map_err(|e| e.to_string())?;
                parse_price_in(&content, currency)
                    .ok_or_else(|| format!("no {} amount in page", currency))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct SnapshotSettings {
    directory: PathBuf,
    max_name_length: usize,
}

/// Runs the strategy cascade against a page, one item at a time.
#[derive(Debug, Clone)]
pub struct Extractor {
    selector_timeout: Duration,
    snapshots: Option<SnapshotSettings>,
}

impl Extractor {
    pub fn new(scraper: &ScraperConfig, screenshots: &ScreenshotConfig) -> Self {
        let snapshots = screenshots.enabled.then(|| SnapshotSettings {
            directory: screenshots.directory.clone(),
            max_name_length: screenshots.max_name_length,
        });

        Self {
            selector_timeout: scraper.selector_timeout(),
            snapshots,
        }
    }

    pub fn strategies(item: &WatchItem) -> Vec<Strategy> {
        let mut strategies = Vec::with_capacity(3);
        if let Some(selector) = &item.price_selector {
            strategies.push(Strategy::Selector(selector.clone()));
        }
        strategies.push(Strategy::StructuredData);
        strategies.push(Strategy::RawText);
        strategies
    }

    /// Navigates to the item and extracts. Never fails: a page that cannot be
    /// loaded comes back as `exception:<kind>`.
    pub async fn check(&self, page: &dyn Document, item: &WatchItem) -> ExtractionResult {
        if let Err(e) = page.navigate(&item.url).await {
            warn!("{}: {}", item.name, e);
            return ExtractionResult::exception(e.kind());
        }
        self.extract(page, item).await
    }

    /// Runs the cascade against the currently loaded page.
    ///
    /// On success the note is the winning strategy's tag alone. When every
    /// strategy fails it is the chain of failure tags, plus the snapshot path
    /// if one could be written.
    pub async fn extract(&self, page: &dyn Document, item: &WatchItem) -> ExtractionResult {
        let mut failures = Vec::new();

        for strategy in Self::strategies(item) {
            match strategy.attempt(page, &item.currency, self.selector_timeout).await {
                Ok(price) => {
                    debug!("{}: {} via {}", item.name, price, strategy.tag());
                    return ExtractionResult {
                        failures,
                        ..ExtractionResult::found(price, strategy.tag())
                    };
                }
                Err(reason) => {
                    failures.push(StrategyFailure {
                        tag: strategy.failure_tag(),
                        reason,
                    });
                }
            }
        }

        let mut tags: Vec<String> = failures.iter().map(|f| f.tag.clone()).collect();
        if let Some(path) = self.snapshot(page, item).await {
            tags.push(format!("screenshot={}", path.display()));
        }

        let note = if tags.is_empty() {
            "no_note".to_string()
        } else {
            tags.join("|")
        };

        ExtractionResult {
            price: None,
            note,
            failures,
        }
    }

    async fn snapshot(&self, page: &dyn Document, item: &WatchItem) -> Option<PathBuf> {
        let settings = self.snapshots.as_ref()?;
        let stem = sanitize_file_stem(&item.name, settings.max_name_length);

        match page.save_snapshot(&settings.directory, &stem).await {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("{}: snapshot failed: {}", item.name, e);
                None
            }
        }
    }
}

/// Collapses runs of characters outside `[A-Za-z0-9._-]` to `_` and
/// truncates to `max_len` characters.
pub fn sanitize_file_stem(name: &str, max_len: usize) -> String {
    UNSAFE_FILE_CHARS
        .replace_all(name, "_")
        .chars()
        .take(max_len)
        .collect()
}
