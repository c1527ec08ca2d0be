//! Product listings returned by every search capability.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Price label used when a listing carries no recognizable price.
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

/// Longest description kept on a listing, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// A currency marker followed by an amount. Only the alphabetic markers need a
/// word boundary, so `MRP₹50` still matches while `Drs 12` does not.
static PRICE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(₹)|\b(?:Rs\.?|INR)|(\$))\s*(\d[\d,]*(?:\.\d+)?)").expect("price regex")
});

static AMOUNT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("amount regex"));

/// A single product result.
///
/// Assembled fresh for each query and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductListing {
    /// Product title.
    pub title: String,
    /// Short description or snippet.
    pub description: String,
    /// Display-formatted price (not numeric).
    pub price: String,
    /// Link to the product page.
    pub url: String,
    /// Store or site the listing came from.
    pub source: String,
    /// Provider-specific relevance; higher is better.
    pub relevance_score: f32,
}

impl ProductListing {
    /// Build a listing from a web result, deriving price and source from its text and URL.
    pub fn from_web_result(title: &str, snippet: &str, url: &str, relevance_score: f32) -> Self {
        let title = title.trim();
        let title = if title.is_empty() {
            first_sentence(snippet)
        } else {
            title.to_string()
        };
        let price = extract_price(&format!("{} {}", title, snippet))
            .unwrap_or_else(|| PRICE_NOT_AVAILABLE.to_string());

        Self {
            title,
            description: truncate_chars(snippet.trim(), MAX_DESCRIPTION_CHARS),
            price,
            url: url.to_string(),
            source: source_from_url(url),
            relevance_score,
        }
    }

    /// Numeric price parsed from the display string, if any.
    pub fn price_value(&self) -> Option<f64> {
        parse_price_value(&self.price)
    }
}

/// Find the first currency-prefixed amount in `text`.
///
/// Returns it normalized as `<symbol><amount>`, e.g. `"Rs. 1,299"` → `"₹1,299"`.
pub fn extract_price(text: &str) -> Option<String> {
    let caps = PRICE_PATTERN.captures(text)?;
    let symbol = if caps.get(2).is_some() { "$" } else { "₹" };
    let amount = caps.get(3)?.as_str().trim_end_matches(',');
    Some(format!("{}{}", symbol, amount))
}

/// Parse the numeric value out of a display price such as `"₹1,299.50"`.
pub fn parse_price_value(price: &str) -> Option<f64> {
    let amount = match PRICE_PATTERN.captures(price) {
        Some(caps) => caps.get(3)?.as_str(),
        None => AMOUNT_PATTERN.find(price)?.as_str(),
    };
    amount.replace(',', "").parse().ok()
}

/// Host of `url` without a leading `www.`, or `"Unknown"`.
pub fn source_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Truncate to `max` characters, appending `...` when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

fn first_sentence(text: &str) -> String {
    let sentence = text
        .split(['.', '\n'])
        .next()
        .unwrap_or_default()
        .trim();
    truncate_chars(sentence, 80)
}
