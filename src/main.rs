use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use pricewatch::extraction::Extractor;
use pricewatch::models::load_watchlist;
use pricewatch::notifiers::NotifierSet;
use pricewatch::scraper::ChromeSession;
use pricewatch::store::SqliteStore;
use pricewatch::utils::logging;
use pricewatch::{AppConfig, RunReport, WatchRunner};

/// Check every watched product page once and alert on new target hits.
#[derive(Debug, Parser)]
#[command(name = "pricewatch", version, about)]
struct Cli {
    /// Watchlist file, JSON array or TOML `[[items]]`
    #[arg(long, default_value = "watchlist.json")]
    watchlist: PathBuf,

    /// SQLite database file (overrides database.url)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Where failure snapshots go
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    #[arg(long)]
    no_screenshots: bool,

    /// Config file base name; any extension the config loader knows
    #[arg(long, default_value = "config/pricewatch")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pricewatch: {:#}", e);
            return ExitCode::from(1);
        }
    };
    let _log_guard = logging::init(&config.logging);

    match run(&cli, &config).await {
        Ok(report) => {
            if let Some(body) = report.alert_body() {
                println!("ALERTS:\n{}", body);
            }
            ExitCode::from(report.outcome().exit_code())
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(&cli.config).context("loading configuration")?;

    if let Some(db) = &cli.db {
        config.database.url = format!("sqlite://{}", db.display());
    }
    if cli.headed {
        config.scraper.headless = false;
    }
    if let Some(dir) = &cli.screenshot_dir {
        config.screenshots.directory = dir.clone();
    }
    if cli.no_screenshots {
        config.screenshots.enabled = false;
    }

    config.validate().context("validating configuration")?;
    Ok(config)
}

async fn run(cli: &Cli, config: &AppConfig) -> Result<RunReport> {
    let items = load_watchlist(&cli.watchlist)
        .with_context(|| format!("reading watchlist {}", cli.watchlist.display()))?;
    info!("Loaded {} item(s) from {}", items.len(), cli.watchlist.display());

    let store = SqliteStore::connect(&config.database)
        .await
        .context("opening observation store")?;

    let session = match ChromeSession::launch(&config.scraper) {
        Ok(session) => session,
        Err(e) => {
            store.close().await;
            return Err(e).context("starting browser");
        }
    };

    let notifiers = NotifierSet::from_config(&config.notifications);
    if notifiers.configured().is_empty() {
        warn!("No alert channels configured; alerts will only be printed");
    }
    let runner = WatchRunner::new(Extractor::new(&config.scraper, &config.screenshots), notifiers);
    let result = runner.run(&items, &session, &store).await;

    // Both are released whatever the run returned
    session.close();
    store.close().await;

    Ok(result?)
}
