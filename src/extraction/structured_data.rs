//! Offer prices from embedded JSON-LD (`<script type="application/ld+json">`).
//!
//! Shops rarely agree on shape: a block may be a single `Product`, an array of
//! entities, an `@graph`, or something that is not valid JSON at all. The
//! locator walks whatever parses and returns the first offer price it meets.

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use super::price::parse_amount;

const OFFER_PRICE_KEYS: [&str; 3] = ["price", "lowPrice", "highPrice"];

/// First offer price across `blocks`, in block order.
pub fn find_offer_price<S: AsRef<str>>(blocks: &[S]) -> Option<Decimal> {
    blocks
        .iter()
        .map(|block| block.as_ref().trim())
        .filter(|block| !block.is_empty())
        .find_map(|block| json_candidates(block).iter().find_map(find_in_value))
}

/// Parses a block whole, falling back to every brace-delimited object that
/// parses on its own.
fn json_candidates(raw: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => vec![value],
        Err(_) => recover_objects(raw),
    }
}

fn recover_objects(raw: &str) -> Vec<Value> {
    let mut found = Vec::new();
    let mut start = 0;

    while let Some(offset) = raw[start..].find('{') {
        let open = start + offset;
        let parsed = matching_brace(&raw[open..])
            .and_then(|len| serde_json::from_str::<Value>(&raw[open..open + len]).ok().map(|v| (v, len)));

        match parsed {
            Some((value, len)) => {
                found.push(value);
                start = open + len;
            }
            // A broken object may still contain a good one
            None => start = open + 1,
        }
    }

    found
}

/// Byte length of the object opening at `s[0]`, up to its matching brace.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// Depth-first search for the first `offers` entry carrying a usable price.
fn find_in_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Object(map) => map
            .get("offers")
            .and_then(offers_price)
            .or_else(|| map.values().find_map(find_in_value)),
        Value::Array(items) => items.iter().find_map(find_in_value),
        _ => None,
    }
}

fn offers_price(offers: &Value) -> Option<Decimal> {
    match offers {
        Value::Object(offer) => offer_price(offer),
        Value::Array(entries) => entries
            .iter()
            .filter_map(Value::as_object)
            .find_map(offer_price),
        _ => None,
    }
}

/// `price`, else `lowPrice`, else `highPrice`; the first one present decides.
fn offer_price(offer: &Map<String, Value>) -> Option<Decimal> {
    let raw = OFFER_PRICE_KEYS
        .iter()
        .filter_map(|key| offer.get(*key))
        .find(|value| !is_blank(value))?;

    match raw {
        Value::String(text) => parse_amount(text),
        Value::Number(number) => parse_amount(&number.to_string()),
        _ => None,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}
