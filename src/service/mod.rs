//! Service manager: one provider per search capability, chosen at startup.
//!
//! Each capability ends up in one of three states:
//!
//! - `Active`: the real provider was constructed successfully
//! - `Fallback`: the real provider failed, a fallback serves instead
//! - `Unavailable`: neither exists; searches return nothing
//!
//! The choice is made once by [`ServiceManagerBuilder`] and never revisited.
//! A failing provider call is logged and yields an empty result; it does not
//! switch to the fallback.

mod builder;
mod context;
mod price;

pub use builder::ServiceManagerBuilder;
pub use context::{build_service_manager, AppContext};
pub use price::{PriceComparison, PriceRange};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::listing::ProductListing;
use crate::providers::SearchProvider;

/// A logical search capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Embedding search over the local catalog
    Semantic,
    /// Tavily web search
    Tavily,
    /// DuckDuckGo search
    DuckDuckGo,
}

impl Capability {
    /// Every capability, in reporting order.
    pub const ALL: [Capability; 3] = [
        Capability::Semantic,
        Capability::Tavily,
        Capability::DuckDuckGo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Semantic => "semantic",
            Capability::Tavily => "tavily",
            Capability::DuckDuckGo => "duckduckgo",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidQuery(format!("unknown capability '{}'", s)))
    }
}

/// Provider state of a capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityState {
    /// No provider
    #[default]
    Unavailable,
    /// Fallback provider serving
    Fallback,
    /// Real provider serving
    Active,
}

impl CapabilityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityState::Unavailable => "unavailable",
            CapabilityState::Fallback => "fallback",
            CapabilityState::Active => "active",
        }
    }

    /// Whether searches can return results.
    pub fn is_serving(&self) -> bool {
        !matches!(self, CapabilityState::Unavailable)
    }
}

/// The provider selected for a capability.
#[derive(Clone, Default)]
pub enum ProviderSlot {
    Real(Arc<dyn SearchProvider>),
    Fallback(Arc<dyn SearchProvider>),
    #[default]
    Unavailable,
}

impl ProviderSlot {
    pub fn state(&self) -> CapabilityState {
        match self {
            ProviderSlot::Real(_) => CapabilityState::Active,
            ProviderSlot::Fallback(_) => CapabilityState::Fallback,
            ProviderSlot::Unavailable => CapabilityState::Unavailable,
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn SearchProvider>> {
        match self {
            ProviderSlot::Real(p) | ProviderSlot::Fallback(p) => Some(p),
            ProviderSlot::Unavailable => None,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct CapabilityEntry {
    pub(crate) slot: ProviderSlot,
    pub(crate) fallback_available: bool,
}

/// Health of one capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityHealth {
    pub state: CapabilityState,
    /// Name of the serving provider
    pub provider: Option<String>,
    pub fallback_available: bool,
}

/// Overall health derived from capability states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    /// Every capability is active
    Healthy,
    /// Some capability serves, not all are active
    Degraded,
    /// Nothing serves
    Unhealthy,
}

/// Diagnostic report from [`ServiceManager::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_health: OverallHealth,
    pub active_count: usize,
    pub total_count: usize,
    /// Whether any capability has a fallback
    pub fallback_available: bool,
    pub services: BTreeMap<Capability, CapabilityHealth>,
}

type CacheKey = (Capability, String, usize);

/// Dispatches searches to the provider selected for each capability.
pub struct ServiceManager {
    entries: BTreeMap<Capability, CapabilityEntry>,
    default_limit: usize,
    max_limit: usize,
    cache: Cache<CacheKey, Vec<ProductListing>>,
}

static_assertions::assert_impl_all!(ServiceManager: Send, Sync);

impl ServiceManager {
    /// Start building a manager.
    pub fn builder() -> ServiceManagerBuilder {
        ServiceManagerBuilder::new()
    }

    pub(crate) fn from_parts(
        entries: BTreeMap<Capability, CapabilityEntry>,
        default_limit: usize,
        max_limit: usize,
        cache: Cache<CacheKey, Vec<ProductListing>>,
    ) -> Self {
        Self {
            entries,
            default_limit,
            max_limit,
            cache,
        }
    }

    /// Limit used when a caller does not pick one.
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Largest accepted limit.
    pub fn max_limit(&self) -> usize {
        self.max_limit
    }

    /// Current state of `capability`.
    pub fn state(&self, capability: Capability) -> CapabilityState {
        self.entries
            .get(&capability)
            .map(|e| e.slot.state())
            .unwrap_or_default()
    }

    fn validate(&self, query: &str, limit: usize) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".to_string()));
        }
        if limit == 0 {
            return Err(Error::InvalidQuery("limit must be positive".to_string()));
        }
        if limit > self.max_limit {
            return Err(Error::InvalidQuery(format!(
                "limit {} exceeds maximum {}",
                limit, self.max_limit
            )));
        }
        Ok(())
    }

    /// Search one capability.
    ///
    /// Only invalid input is an error. Provider failures and unavailable
    /// capabilities produce an empty result and a warning.
    pub async fn search(
        &self,
        capability: Capability,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ProductListing>> {
        self.validate(query, limit)?;

        let slot = self
            .entries
            .get(&capability)
            .map(|e| e.slot.clone())
            .unwrap_or_default();
        let state = slot.state();
        metrics::counter!(
            "shopping_search_requests_total",
            "capability" => capability.as_str(),
            "state" => state.as_str()
        )
        .increment(1);

        let Some(provider) = slot.provider() else {
            warn!("Search on unavailable capability '{}'", capability);
            return Ok(Vec::new());
        };

        let cacheable = state == CapabilityState::Active && provider.metadata().remote;
        let key = (capability, query.trim().to_lowercase(), limit);
        if cacheable {
            if let Some(cached) = self.cache.get(&key).await {
                debug!("Cache hit for {} {:?}", capability, query);
                return Ok(cached);
            }
        }

        let start = Instant::now();
        let result = provider.search(query.trim(), limit).await;
        metrics::histogram!(
            "shopping_search_duration_seconds",
            "capability" => capability.as_str()
        )
        .record(start.elapsed().as_secs_f64());

        match result {
            Ok(mut listings) => {
                listings.truncate(limit);
                if cacheable && !listings.is_empty() {
                    self.cache.insert(key, listings.clone()).await;
                }
                Ok(listings)
            }
            Err(e) => {
                warn!("{} search for {:?} failed: {}", capability, query, e);
                metrics::counter!(
                    "shopping_provider_failures_total",
                    "capability" => capability.as_str()
                )
                .increment(1);
                Ok(Vec::new())
            }
        }
    }

    /// Search every serving capability concurrently.
    pub async fn search_all(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<BTreeMap<Capability, Vec<ProductListing>>> {
        self.validate(query, limit)?;
        let serving: Vec<Capability> = Capability::ALL
            .into_iter()
            .filter(|c| self.state(*c).is_serving())
            .collect();
        let results = join_all(serving.iter().map(|c| self.search(*c, query, limit))).await;

        serving
            .into_iter()
            .zip(results)
            .map(|(c, r)| r.map(|listings| (c, listings)))
            .collect()
    }

    /// Compare prices for `query` across every serving capability.
    pub async fn price_comparison(&self, query: &str) -> Result<PriceComparison> {
        let grouped = self.search_all(query, self.default_limit).await?;
        let listings = grouped.into_values().flatten().collect();
        Ok(PriceComparison::from_listings(query.trim(), listings))
    }

    /// Report the state of every capability.
    pub fn health_check(&self) -> HealthReport {
        let services: BTreeMap<Capability, CapabilityHealth> = Capability::ALL
            .into_iter()
            .map(|c| {
                let entry = self.entries.get(&c).cloned().unwrap_or_default();
                let health = CapabilityHealth {
                    state: entry.slot.state(),
                    provider: entry.slot.provider().map(|p| p.metadata().name),
                    fallback_available: entry.fallback_available,
                };
                (c, health)
            })
            .collect();

        let total_count = services.len();
        let active_count = services
            .values()
            .filter(|h| h.state == CapabilityState::Active)
            .count();
        let serving = services.values().filter(|h| h.state.is_serving()).count();
        let overall_health = if active_count == total_count {
            OverallHealth::Healthy
        } else if serving > 0 {
            OverallHealth::Degraded
        } else {
            OverallHealth::Unhealthy
        };

        HealthReport {
            overall_health,
            active_count,
            total_count,
            fallback_available: services.values().any(|h| h.fallback_available),
            services,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::providers::ProviderMetadata;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning fixed listings and counting calls.
    pub(crate) struct StubProvider {
        name: &'static str,
        remote: bool,
        listings: Vec<ProductListing>,
        fail: bool,
        pub(crate) calls: AtomicUsize,
    }

    impl StubProvider {
        pub(crate) fn new(name: &'static str, titles: &[&str]) -> Self {
            let listings = titles
                .iter()
                .enumerate()
                .map(|(i, t)| ProductListing {
                    title: t.to_string(),
                    description: String::new(),
                    price: format!("₹{}", (i + 1) * 100),
                    url: format!("https://{}.example/{}", name, i),
                    source: format!("{}.example", name),
                    relevance_score: 1.0 / (i as f32 + 1.0),
                })
                .collect();
            Self {
                name,
                remote: true,
                listings,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(name: &'static str) -> Self {
            Self {
                fail: true,
                ..Self::new(name, &[])
            }
        }

        pub(crate) fn local(mut self) -> Self {
            self.remote = false;
            self
        }
    }

    #[async_trait]
    impl SearchProvider for StubProvider {
        fn metadata(&self) -> ProviderMetadata {
            let meta = ProviderMetadata::remote(self.name, "stub");
            ProviderMetadata {
                remote: self.remote,
                ..meta
            }
        }

        async fn search(&self, _query: &str, limit: usize) -> Result<Vec<ProductListing>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::provider(self.name, "boom"));
            }
            Ok(self.listings.iter().take(limit).cloned().collect())
        }
    }

    fn unavailable(cap: Capability) -> Result<Arc<dyn SearchProvider>> {
        Err(Error::unavailable(cap.as_str(), "disabled for test"))
    }

    // ================================================================
    // Provider selection
    // ================================================================

    #[test]
    fn test_state_selection() {
        let manager = ServiceManager::builder()
            .capability(
                Capability::Semantic,
                unavailable(Capability::Semantic),
                Some(Arc::new(StubProvider::new("hash", &["a"]).local())),
            )
            .capability(
                Capability::Tavily,
                Ok(Arc::new(StubProvider::new("tavily", &["a"]))),
                None,
            )
            .build();

        assert_eq!(manager.state(Capability::Semantic), CapabilityState::Fallback);
        assert_eq!(manager.state(Capability::Tavily), CapabilityState::Active);
        // never registered
        assert_eq!(manager.state(Capability::DuckDuckGo), CapabilityState::Unavailable);
    }

    #[test]
    fn test_health_check_reports_states() {
        let manager = ServiceManager::builder()
            .capability(
                Capability::Semantic,
                unavailable(Capability::Semantic),
                Some(Arc::new(StubProvider::new("catalog-hash", &[]).local())),
            )
            .capability(
                Capability::Tavily,
                Ok(Arc::new(StubProvider::new("tavily", &[]))),
                None,
            )
            .capability(
                Capability::DuckDuckGo,
                unavailable(Capability::DuckDuckGo),
                None,
            )
            .build();

        let report = manager.health_check();
        assert_eq!(report.total_count, 3);
        assert_eq!(report.active_count, 1);
        assert_eq!(report.overall_health, OverallHealth::Degraded);
        assert!(report.fallback_available);

        let semantic = &report.services[&Capability::Semantic];
        assert_eq!(semantic.state, CapabilityState::Fallback);
        assert_eq!(semantic.provider.as_deref(), Some("catalog-hash"));
        assert!(semantic.fallback_available);

        let tavily = &report.services[&Capability::Tavily];
        assert_eq!(tavily.state, CapabilityState::Active);
        assert!(!tavily.fallback_available);

        let ddg = &report.services[&Capability::DuckDuckGo];
        assert_eq!(ddg.state, CapabilityState::Unavailable);
        assert!(ddg.provider.is_none());
    }

    #[test]
    fn test_health_check_all_active_is_healthy() {
        let mut builder = ServiceManager::builder();
        for cap in Capability::ALL {
            builder = builder.capability(cap, Ok(Arc::new(StubProvider::new("real", &[]))), None);
        }
        let report = builder.build().health_check();
        assert_eq!(report.overall_health, OverallHealth::Healthy);
        assert_eq!(report.active_count, 3);
    }

    #[test]
    fn test_health_check_nothing_serving_is_unhealthy() {
        let report = ServiceManager::builder().build().health_check();
        assert_eq!(report.overall_health, OverallHealth::Unhealthy);
        assert!(!report.fallback_available);
    }

    #[test]
    fn test_health_report_serializes_capability_keys() {
        let report = ServiceManager::builder().build().health_check();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["services"]["duckduckgo"]["state"], "unavailable");
        assert_eq!(json["overall_health"], "unhealthy");
    }

    // ================================================================
    // Search dispatch
    // ================================================================

    #[tokio::test]
    async fn test_search_dispatches_and_truncates() {
        let manager = ServiceManager::builder()
            .capability(
                Capability::Tavily,
                Ok(Arc::new(StubProvider::new("tavily", &["a", "b", "c"]))),
                None,
            )
            .build();
        let results = manager.search(Capability::Tavily, "milk", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "a");
    }

    #[tokio::test]
    async fn test_provider_failure_yields_empty_without_fallback() {
        let fallback = Arc::new(StubProvider::new("keyword", &["should not be used"]).local());
        let manager = ServiceManager::builder()
            .capability(
                Capability::DuckDuckGo,
                Ok(Arc::new(StubProvider::failing("duckduckgo"))),
                Some(fallback.clone()),
            )
            .build();

        let results = manager
            .search(Capability::DuckDuckGo, "rice", 2)
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unavailable_capability_yields_empty() {
        let manager = ServiceManager::builder().build();
        let results = manager.search(Capability::Tavily, "rice", 2).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_queries_fail_fast() {
        let manager = ServiceManager::builder().max_limit(10).build();
        for (query, limit) in [("", 2), ("   ", 2), ("rice", 0), ("rice", 11)] {
            let err = manager
                .search(Capability::Semantic, query, limit)
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::InvalidQuery(_)),
                "expected InvalidQuery for {:?}/{}",
                query,
                limit
            );
        }
    }

    #[tokio::test]
    async fn test_remote_results_are_cached() {
        let provider = Arc::new(StubProvider::new("tavily", &["a"]));
        let manager = ServiceManager::builder()
            .capability(Capability::Tavily, Ok(provider.clone()), None)
            .build();

        manager.search(Capability::Tavily, "Milk", 1).await.unwrap();
        manager.search(Capability::Tavily, "milk ", 1).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // different limit is a different key
        manager.search(Capability::Tavily, "milk", 2).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_results_are_not_cached() {
        let fallback = Arc::new(StubProvider::new("keyword", &["a"]));
        let manager = ServiceManager::builder()
            .capability(
                Capability::DuckDuckGo,
                unavailable(Capability::DuckDuckGo),
                Some(fallback.clone()),
            )
            .build();
        manager.search(Capability::DuckDuckGo, "rice", 1).await.unwrap();
        manager.search(Capability::DuckDuckGo, "rice", 1).await.unwrap();
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_search_all_groups_by_capability() {
        let manager = ServiceManager::builder()
            .capability(
                Capability::Semantic,
                unavailable(Capability::Semantic),
                Some(Arc::new(StubProvider::new("hash", &["x", "y"]).local())),
            )
            .capability(
                Capability::Tavily,
                Ok(Arc::new(StubProvider::new("tavily", &["a"]))),
                None,
            )
            .build();

        let grouped = manager.search_all("rice", 5).await.unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&Capability::Semantic].len(), 2);
        assert_eq!(grouped[&Capability::Tavily].len(), 1);
        assert!(!grouped.contains_key(&Capability::DuckDuckGo));
    }

    #[tokio::test]
    async fn test_price_comparison_across_capabilities() {
        let manager = ServiceManager::builder()
            .capability(
                Capability::Tavily,
                Ok(Arc::new(StubProvider::new("tavily", &["a", "b"]))),
                None,
            )
            .capability(
                Capability::DuckDuckGo,
                Ok(Arc::new(StubProvider::new("duckduckgo", &["c"]))),
                None,
            )
            .build();

        let comparison = manager.price_comparison("paneer").await.unwrap();
        assert_eq!(comparison.listings_considered, 3);
        let range = comparison.price_range.unwrap();
        assert_eq!(range.min, 100.0);
        assert_eq!(range.max, 200.0);
    }

    // ================================================================
    // Capability parsing
    // ================================================================

    #[test]
    fn test_capability_from_str() {
        assert_eq!("semantic".parse::<Capability>().unwrap(), Capability::Semantic);
        assert_eq!("DuckDuckGo".parse::<Capability>().unwrap(), Capability::DuckDuckGo);
        assert!("bing".parse::<Capability>().is_err());
    }

    #[test]
    fn test_capability_serde_names() {
        let json = serde_json::to_string(&Capability::DuckDuckGo).unwrap();
        assert_eq!(json, "\"duckduckgo\"");
        let cap: Capability = serde_json::from_str("\"tavily\"").unwrap();
        assert_eq!(cap, Capability::Tavily);
    }
}
