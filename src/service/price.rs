//! Price comparison over listings from several capabilities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::listing::ProductListing;

/// Numeric spread of parsed prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

/// Result of [`ServiceManager::price_comparison`](super::ServiceManager::price_comparison).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceComparison {
    pub query: String,
    pub listings_considered: usize,
    /// `None` when no listing had a parseable price
    pub price_range: Option<PriceRange>,
    pub cheapest: Option<ProductListing>,
    pub recommendations: Vec<String>,
    /// Distinct stores seen, sorted
    pub sources: Vec<String>,
}

impl PriceComparison {
    /// Summarize `listings` for `query`.
    pub fn from_listings(query: &str, listings: Vec<ProductListing>) -> Self {
        let sources: Vec<String> = listings
            .iter()
            .map(|l| l.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let priced: Vec<(f64, &ProductListing)> = listings
            .iter()
            .filter_map(|l| l.price_value().filter(|p| *p > 0.0).map(|p| (p, l)))
            .collect();

        let cheapest = priced
            .iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, l)| (*l).clone());

        let price_range = if priced.is_empty() {
            None
        } else {
            let min = priced.iter().map(|(p, _)| *p).fold(f64::INFINITY, f64::min);
            let max = priced.iter().map(|(p, _)| *p).fold(f64::NEG_INFINITY, f64::max);
            let average = priced.iter().map(|(p, _)| *p).sum::<f64>() / priced.len() as f64;
            Some(PriceRange { min, max, average })
        };

        let mut recommendations = Vec::new();
        match (&cheapest, &price_range) {
            (Some(item), Some(range)) => {
                recommendations.push(format!(
                    "Cheapest option: {} at {} ({})",
                    item.title, item.price, item.source
                ));
                let priced_stores: BTreeSet<&str> =
                    priced.iter().map(|(_, l)| l.source.as_str()).collect();
                if priced.len() > 1 && range.max > range.min {
                    let spread = (range.max - range.min) / range.min * 100.0;
                    recommendations.push(format!(
                        "Prices vary by {:.0}% across {} {}",
                        spread,
                        priced_stores.len(),
                        if priced_stores.len() == 1 { "store" } else { "stores" }
                    ));
                }
                if sources.len() > 1 {
                    recommendations.push(format!(
                        "Compare {} stores before buying",
                        sources.len()
                    ));
                }
            }
            _ => recommendations.push(format!(
                "No prices found for '{}'; check store pages for current rates",
                query
            )),
        }

        Self {
            query: query.to_string(),
            listings_considered: listings.len(),
            price_range,
            cheapest,
            recommendations,
            sources,
        }
    }
}
