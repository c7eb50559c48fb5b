use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

/// Either a thousands-grouped amount or a plain digit run, each with an
/// optional two-digit fraction. The grouped form needs at least one `,ddd`
/// group so `£12345.67` is read whole.
const AMOUNT_PATTERN: &str = r"\s*([0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]{2})?|[0-9]+(?:\.[0-9]{2})?)";

static PRICE_REGEX: LazyLock<Regex> = LazyLock::new(|| price_regex("[£$€¥₹]"));

/// One pattern per known symbol, for pages whose currency is known.
static SYMBOL_REGEXES: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    CURRENCY_SYMBOLS
        .iter()
        .map(|(_, symbol)| (*symbol, price_regex(&regex::escape(symbol))))
        .collect()
});

fn price_regex(symbols: &str) -> Regex {
    Regex::new(&format!("{}{}", symbols, AMOUNT_PATTERN)).expect("price pattern is a valid regex")
}

const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("GBP", "£"),
    ("USD", "$"),
    ("AUD", "$"),
    ("CAD", "$"),
    ("NZD", "$"),
    ("EUR", "€"),
    ("JPY", "¥"),
    ("INR", "₹"),
];

/// Finds the leftmost currency-prefixed amount in `text`.
///
/// Never fails loudly: no match, or a match that does not parse, is `None`.
pub fn parse_price(text: &str) -> Option<Decimal> {
    capture_amount(&PRICE_REGEX, text)
}

/// Like [`parse_price`], but only amounts marked with `currency`'s own symbol
/// count, so a stray `$1` in a script does not read as a sterling price.
/// Codes without a known symbol accept any symbol.
pub fn parse_price_in(text: &str, currency: &str) -> Option<Decimal> {
    match currency_symbol(currency).and_then(|symbol| SYMBOL_REGEXES.get(symbol)) {
        Some(pattern) => capture_amount(pattern, text),
        None => parse_price(text),
    }
}

fn capture_amount(pattern: &Regex, text: &str) -> Option<Decimal> {
    let captures = pattern.captures(text)?;
    let raw = captures.get(1)?.as_str().replace(',', "");
    Decimal::from_str(&raw).ok()
}

/// Coerces a bare number such as `"1,299.00 "` (no currency symbol).
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

pub fn currency_symbol(currency: &str) -> Option<&'static str> {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(currency))
        .map(|(_, symbol)| *symbol)
}

/// Renders `amount` the way shops display it, e.g. `£1,234.56`.
/// Codes without a known symbol are appended instead: `1,234.56 CHF`.
pub fn format_currency(amount: Decimal, currency: &str) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount.is_sign_negative() && !amount.is_zero() { "-" } else { "" };
    match currency_symbol(currency) {
        Some(symbol) => format!("{}{}{}.{}", sign, symbol, grouped, fraction),
        None => format!("{}{}.{} {}", sign, grouped, fraction, currency),
    }
}
