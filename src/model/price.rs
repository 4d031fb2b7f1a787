//! Price normalization
//!
//! Listing pages show prices as free text ("US $1,299.00", "EUR 12,50",
//! "£8.00", "$10.00 to $20.00"). This module turns that text into a numeric
//! amount plus an ISO 4217 currency code, or nothing at all when the text
//! cannot be read unambiguously.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A normalized price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Numeric amount in major units (e.g. dollars, not cents)
    pub amount: f64,

    /// ISO 4217 currency code
    pub currency: String,
}

impl Price {
    /// Creates a price from an already-numeric amount
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount, self.currency)
    }
}

/// Site-specific dollar prefixes, checked before bare symbols
const DOLLAR_PREFIXES: &[(&str, &str)] = &[
    ("US $", "USD"),
    ("US$", "USD"),
    ("AU $", "AUD"),
    ("AU$", "AUD"),
    ("NZ $", "NZD"),
    ("HK $", "HKD"),
    ("C $", "CAD"),
    ("C$", "CAD"),
];

const ISO_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "CAD", "AUD", "NZD", "HKD", "JPY", "CHF", "CNY", "INR", "SEK", "PLN",
    "MXN",
];

const SYMBOLS: &[(char, &str)] = &[
    ('£', "GBP"),
    ('€', "EUR"),
    ('¥', "JPY"),
    ('₹', "INR"),
    ('$', "USD"),
];

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d.,\s\u{a0}]*\d|\d").expect("valid amount pattern"))
}

fn iso_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-Z]{3})\b").expect("valid currency pattern"))
}

/// Detects the currency a price text is written in
pub fn detect_currency(text: &str) -> Option<&'static str> {
    let upper = text.to_uppercase();

    for (prefix, code) in DOLLAR_PREFIXES {
        if upper.contains(*prefix) {
            return Some(*code);
        }
    }

    for caps in iso_regex().captures_iter(&upper) {
        if let Some(code) = ISO_CODES.iter().find(|c| **c == &caps[1]) {
            return Some(*code);
        }
    }

    SYMBOLS
        .iter()
        .find(|(symbol, _)| text.contains(*symbol))
        .map(|(_, code)| *code)
}

/// Extracts the first numeric amount from a price text
///
/// A trailing `.` or `,` followed by one or two digits is the decimal
/// separator; every other separator groups thousands.
pub fn parse_amount(text: &str) -> Option<f64> {
    let raw = amount_regex().find(text)?.as_str();
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();

    let normalized = match compact.rfind(|c: char| c == '.' || c == ',') {
        Some(pos) => {
            let fraction = &compact[pos + 1..];
            let integer: String = compact[..pos]
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            if (1..=2).contains(&fraction.len()) {
                format!("{}.{}", integer, fraction)
            } else {
                format!("{}{}", integer, fraction)
            }
        }
        None => compact,
    };

    normalized.parse::<f64>().ok().filter(|a| a.is_finite())
}

/// Parses a displayed price into amount and currency
///
/// Returns `None` when either part cannot be determined; a price without a
/// recognizable currency is treated as unreadable rather than guessed.
///
/// # Examples
///
/// ```
/// use listing_harvest::model::parse_price;
///
/// let price = parse_price("US $1,299.00").unwrap();
/// assert_eq!(price.amount, 1299.0);
/// assert_eq!(price.currency, "USD");
///
/// assert!(parse_price("See description").is_none());
/// ```
pub fn parse_price(text: &str) -> Option<Price> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let amount = parse_amount(text)?;
    let currency = detect_currency(text)?;
    Some(Price::new(amount, currency))
}
