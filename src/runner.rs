//! One pass over the watchlist: check, record, detect crossings, alert.

use rust_decimal::Decimal;
use std::fmt;
use tracing::{info, warn};

use crate::extraction::{format_currency, Extractor};
use crate::models::{Observation, WatchItem};
use crate::notifiers::NotifierSet;
use crate::scraper::Document;
use crate::store::ObservationStore;
use crate::utils::error::Result;

pub const ALERT_SUBJECT: &str = "Price alert: target hit";
const ALERT_SEPARATOR: &str = "\n---\n";

/// True only on the transition into "at or below target".
pub fn crossed_below(previous: Option<Decimal>, target: Decimal, new: Option<Decimal>) -> bool {
    match new {
        Some(new) => new <= target && previous.is_none_or(|prev| prev > target),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub name: String,
    pub url: String,
    pub price: Decimal,
    pub target: Decimal,
    pub previous: Option<Decimal>,
    pub currency: String,
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let previous = match self.previous {
            Some(prev) => format_currency(prev, &self.currency),
            None => "n/a".to_string(),
        };

        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", self.url)?;
        writeln!(
            f,
            "Now: {} (target {})",
            format_currency(self.price, &self.currency),
            format_currency(self.target, &self.currency)
        )?;
        writeln!(f, "Prev: {}", previous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NoAlerts,
    AlertsFired,
}

impl RunOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::NoAlerts => 0,
            RunOutcome::AlertsFired => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub checked: usize,
    pub succeeded: usize,
    pub alerts: Vec<Alert>,
}

impl RunReport {
    pub fn outcome(&self) -> RunOutcome {
        if self.alerts.is_empty() {
            RunOutcome::NoAlerts
        } else {
            RunOutcome::AlertsFired
        }
    }

    /// All alerts as one message, or `None` when nothing crossed.
    pub fn alert_body(&self) -> Option<String> {
        if self.alerts.is_empty() {
            return None;
        }
        let texts: Vec<String> = self.alerts.iter().map(Alert::to_string).collect();
        Some(texts.join(ALERT_SEPARATOR))
    }
}

pub struct WatchRunner {
    extractor: Extractor,
    notifiers: NotifierSet,
}

impl WatchRunner {
    pub fn new(extractor: Extractor, notifiers: NotifierSet) -> Self {
        Self { extractor, notifiers }
    }

    /// Items are processed strictly in order through the one `page`. Every
    /// item yields exactly one recorded observation; only store failures
    /// abort the run. Alerts already earned are still sent when that happens,
    /// since their crossing is recorded and will not fire again.
    pub async fn run(
        &self,
        items: &[WatchItem],
        page: &dyn Document,
        store: &dyn ObservationStore,
    ) -> Result<RunReport> {
        let mut report = RunReport::default();
        let checked = self.check_items(items, page, store, &mut report).await;

        if let Some(body) = report.alert_body() {
            let delivered = self.notifiers.dispatch(ALERT_SUBJECT, &body).await;
            info!("{} alert(s), delivered via {} channel(s)", report.alerts.len(), delivered);
        }
        checked?;

        info!(
            "Run complete: {}/{} priced, {} alert(s)",
            report.succeeded,
            report.checked,
            report.alerts.len()
        );
        Ok(report)
    }

    async fn check_items(
        &self,
        items: &[WatchItem],
        page: &dyn Document,
        store: &dyn ObservationStore,
        report: &mut RunReport,
    ) -> Result<()> {
        for item in items {
            // Read before recording, so the new observation is not its own "previous"
            let previous = store.last_price(&item.name).await?;
            let result = self.extractor.check(page, item).await;

            for failure in &result.failures {
                warn!("{}: {} ({})", item.name, failure.tag, failure.reason);
            }

            store.record(&Observation::new(item, &result)).await?;
            report.checked += 1;

            let Some(price) = result.price else {
                warn!("{}: no price found [{}]", item.name, result.note);
                continue;
            };
            report.succeeded += 1;
            info!(
                "{}: {} via {}",
                item.name,
                format_currency(price, &item.currency),
                result.note
            );

            if crossed_below(previous, item.target_price, result.price) {
                info!("{}: crossed below target {}", item.name, item.target_price);
                report.alerts.push(Alert {
                    name: item.name.clone(),
                    url: item.url.clone(),
                    price,
                    target: item.target_price,
                    previous,
                    currency: item.currency.clone(),
                });
            }
        }

        Ok(())
    }
}
