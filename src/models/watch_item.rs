use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use validator::{Validate, ValidationError};

use crate::utils::error::{AppError, Result};

/// One product page to watch, as listed in the watchlist file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct WatchItem {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,

    #[validate(url(message = "url must be an absolute URL"))]
    pub url: String,

    #[validate(custom(function = "validate_target_price"))]
    pub target_price: Decimal,

    #[serde(default)]
    #[validate(length(min = 1, message = "price_selector must not be empty when set"))]
    pub price_selector: Option<String>,

    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "GBP".to_string()
}

fn validate_target_price(value: &Decimal) -> std::result::Result<(), ValidationError> {
    if value.is_sign_positive() && !value.is_zero() {
        Ok(())
    } else {
        Err(ValidationError::new("target_price must be greater than 0"))
    }
}

#[derive(Debug, Deserialize)]
struct TomlWatchlist {
    #[serde(default)]
    items: Vec<WatchItem>,
}

/// Reads and validates a watchlist. `.toml` files hold `[[items]]` tables,
/// anything else is read as a JSON array.
pub fn load_watchlist(path: &Path) -> Result<Vec<WatchItem>> {
    let raw = std::fs::read_to_string(path)?;

    let items: Vec<WatchItem> = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str::<TomlWatchlist>(&raw)?.items,
        _ => serde_json::from_str(&raw)?,
    };

    validate_watchlist(&items)?;
    Ok(items)
}

pub fn validate_watchlist(items: &[WatchItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        item.validate()
            .map_err(|e| AppError::Validation(format!("watch item '{}': {}", item.name, e)))?;
        if !seen.insert(item.name.as_str()) {
            return Err(AppError::Validation(format!("duplicate watch item name: {}", item.name)));
        }
    }
    Ok(())
}
