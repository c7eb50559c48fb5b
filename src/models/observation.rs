use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::WatchItem;

/// A single timestamped price check for one item. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub url: String,
    pub price: Option<Decimal>,
    pub currency: String,
    pub success: bool,
    pub note: String,
}

impl Observation {
    pub fn new(item: &WatchItem, result: &ExtractionResult) -> Self {
        Self {
            timestamp: Utc::now(),
            name: item.name.clone(),
            url: item.url.clone(),
            price: result.price,
            currency: item.currency.clone(),
            // success is derived, never set independently of the price
            success: result.price.is_some(),
            note: result.note.clone(),
        }
    }
}

/// Why one extraction strategy produced nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyFailure {
    pub tag: String,
    pub reason: String,
}

/// Outcome of checking one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub price: Option<Decimal>,
    pub note: String,
    pub failures: Vec<StrategyFailure>,
}

impl ExtractionResult {
    pub fn found(price: Decimal, tag: &str) -> Self {
        Self {
            price: Some(price),
            note: tag.to_string(),
            failures: Vec::new(),
        }
    }

    pub fn exception(kind: &str) -> Self {
        Self {
            price: None,
            note: format!("exception:{}", kind),
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.price.is_some()
    }
}
