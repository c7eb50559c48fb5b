use async_trait::async_trait;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use headless_chrome::protocol::cdp::{DOM, Page};
use headless_chrome::util::{Timeout, Wait};
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::utils::error::{AppError, Result};

const LD_JSON_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// A rendered page the extraction cascade can inspect.
///
/// One instance is reused for every item in a run: `navigate` replaces the
/// current document.
#[async_trait]
pub trait Document: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Text of the first element matching `selector`, once it is visible.
    async fn visible_text(&self, selector: &str, timeout: Duration) -> Result<String>;

    /// Attribute of the first element matching `selector`.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Full rendered markup.
    async fn content(&self) -> Result<String>;

    /// Raw text of every embedded JSON-LD block, in document order.
    async fn structured_data_blocks(&self) -> Result<Vec<String>> {
        let html = self.content().await?;
        Ok(ld_json_blocks(&html))
    }

    /// Writes a diagnostic snapshot named `file_stem` into `directory`.
    async fn save_snapshot(&self, directory: &Path, file_stem: &str) -> Result<PathBuf>;
}

pub fn ld_json_blocks(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(LD_JSON_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .collect()
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::Parse {
        message: format!("Invalid CSS selector '{}': {:?}", selector, e),
    })
}

/// Headless Chrome with a single tab, held for the whole run.
pub struct ChromeSession {
    // Dropping the browser kills the Chrome process
    _browser: Browser,
    tab: Arc<Tab>,
    navigation_timeout: Duration,
}

impl ChromeSession {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .idle_browser_timeout(config.navigation_timeout() * 2)
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| AppError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| AppError::Browser(format!("Failed to launch browser: {}", e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| AppError::Browser(format!("Failed to create tab: {}", e)))?;

        if let Some(user_agent) = &config.user_agent {
            tab.set_user_agent(user_agent, None, None)
                .map_err(|e| AppError::Browser(format!("Failed to set user agent: {}", e)))?;
        }

        info!("Browser session started (headless: {})", config.headless);
        Ok(Self {
            _browser: browser,
            tab,
            navigation_timeout: config.navigation_timeout(),
        })
    }

    pub fn close(self) {
        if let Err(e) = self.tab.close(true) {
            debug!("Tab close failed: {}", e);
        }
        info!("Browser session closed");
    }

    /// headless_chrome blocks, so every tab call runs off the async workers.
    async fn with_tab<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || f(&tab))
            .await
            .map_err(|e| AppError::Browser(format!("Browser task failed: {}", e)))?
    }
}

#[async_trait]
impl Document for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        let timeout = self.navigation_timeout;

        self.with_tab(move |tab| {
            tab.set_default_timeout(timeout);
            let result = tab.navigate_to(&url).and_then(|tab| tab.wait_until_navigated());
            match result {
                Ok(_) => Ok(()),
                Err(e) if e.downcast_ref::<Timeout>().is_some() => Err(AppError::Timeout {
                    operation: format!("navigating to {}", url),
                }),
                Err(e) => Err(AppError::Navigation {
                    url: url.clone(),
                    message: e.to_string(),
                }),
            }
        })
        .await
    }

    async fn visible_text(&self, selector: &str, timeout: Duration) -> Result<String> {
        let selector = selector.to_string();

        self.with_tab(move |tab| {
            Wait::with_timeout(timeout)
                .until(|| {
                    let element = tab.find_element(&selector).ok()?;
                    let model = element.get_box_model().ok()?;
                    if model.width > 0.0 && model.height > 0.0 {
                        element.get_inner_text().ok()
                    } else {
                        None
                    }
                })
                .map_err(|_| AppError::Timeout {
                    operation: format!("waiting for '{}' to become visible", selector),
                })
        })
        .await
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let selector = selector.to_string();
        let name = name.to_string();

        self.with_tab(move |tab| {
            let element = tab.find_element(&selector).map_err(|_| AppError::ElementNotFound {
                selector: selector.clone(),
            })?;
            let attributes = element
                .get_attributes()
                .map_err(|e| AppError::Browser(format!("Failed to read attributes: {}", e)))?
                .unwrap_or_default();

            // CDP returns a flat [name, value, name, value, ...] list
            Ok(attributes
                .chunks(2)
                .find(|pair| pair[0] == name)
                .and_then(|pair| pair.get(1).cloned()))
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        self.with_tab(|tab| {
            tab.get_content()
                .map_err(|e| AppError::Browser(format!("Failed to get page content: {}", e)))
        })
        .await
    }

    async fn save_snapshot(&self, directory: &Path, file_stem: &str) -> Result<PathBuf> {
        let screenshot_data = self
            .with_tab(|tab| {
                let metrics = tab
                    .call_method(Page::GetLayoutMetrics(None))
                    .map_err(|e| AppError::Browser(format!("Failed to read page size: {}", e)))?;

                let shot = tab
                    .call_method(Page::CaptureScreenshot {
                        format: Some(Page::CaptureScreenshotFormatOption::Png),
                        quality: None,
                        clip: Some(full_page_clip(&metrics.css_content_size)),
                        from_surface: Some(true),
                        capture_beyond_viewport: Some(true),
                        optimize_for_speed: None,
                    })
                    .map_err(|e| AppError::Browser(format!("Screenshot capture failed: {}", e)))?;

                BASE64_STANDARD
                    .decode(shot.data)
                    .map_err(|e| AppError::Browser(format!("Screenshot data is not base64: {}", e)))
            })
            .await?;

        tokio::fs::create_dir_all(directory).await?;
        let path = directory.join(format!("{}.png", file_stem));
        tokio::fs::write(&path, screenshot_data).await?;
        Ok(path)
    }
}

/// The whole scrollable document, not just the viewport.
fn full_page_clip(content: &DOM::Rect) -> Page::Viewport {
    Page::Viewport {
        x: 0.0,
        y: 0.0,
        width: content.width.ceil().max(1.0),
        height: content.height.ceil().max(1.0),
        scale: 1.0,
    }
}

/// Pre-fetched HTML keyed by URL. Every element counts as visible and
/// snapshots are the page markup itself.
#[derive(Debug, Default)]
pub struct StaticPage {
    pages: HashMap<String, String>,
    current: Mutex<Option<String>>,
}

impl StaticPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    async fn current_html(&self) -> Result<String> {
        let current = self.current.lock().await;
        current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .ok_or_else(|| AppError::Browser("No page loaded".to_string()))
    }
}

fn first_element<T>(
    html: &str,
    selector: &str,
    read: impl FnOnce(scraper::ElementRef<'_>) -> T,
) -> Result<T> {
    let css_selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    document
        .select(&css_selector)
        .next()
        .map(read)
        .ok_or_else(|| AppError::ElementNotFound {
            selector: selector.to_string(),
        })
}

#[async_trait]
impl Document for StaticPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        if !self.pages.contains_key(url) {
            return Err(AppError::Navigation {
                url: url.to_string(),
                message: "no such page".to_string(),
            });
        }
        *self.current.lock().await = Some(url.to_string());
        Ok(())
    }

    async fn visible_text(&self, selector: &str, _timeout: Duration) -> Result<String> {
        let html = self.current_html().await?;
        first_element(&html, selector, |element| {
            element.text().collect::<Vec<_>>().join(" ").trim().to_string()
        })
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let html = self.current_html().await?;
        first_element(&html, selector, |element| {
            element.value().attr(name).map(str::to_string)
        })
    }

    async fn content(&self) -> Result<String> {
        self.current_html().await
    }

    async fn save_snapshot(&self, directory: &Path, file_stem: &str) -> Result<PathBuf> {
        let html = self.current_html().await?;
        tokio::fs::create_dir_all(directory).await?;
        let path = directory.join(format!("{}.html", file_stem));
        tokio::fs::write(&path, html).await?;
        Ok(path)
    }
}
