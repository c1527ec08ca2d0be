//! Builder for the service manager

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{info, warn};

use super::{Capability, CapabilityEntry, ProviderSlot, ServiceManager};
use crate::config::{SearchConfig, MAX_CACHE_TTL_SECS};
use crate::error::Result;
use crate::providers::SearchProvider;

/// Builder for creating a [`ServiceManager`]
///
/// Each capability is registered with the outcome of constructing its real
/// provider and an optional fallback. The slot is decided here, once.
pub struct ServiceManagerBuilder {
    entries: BTreeMap<Capability, CapabilityEntry>,
    default_limit: usize,
    max_limit: usize,
    cache_ttl: Duration,
    cache_capacity: u64,
}

impl Default for ServiceManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceManagerBuilder {
    /// Create a new builder with default limits
    pub fn new() -> Self {
        let defaults = SearchConfig::default();
        Self {
            entries: BTreeMap::new(),
            default_limit: defaults.default_limit,
            max_limit: defaults.max_limit,
            cache_ttl: defaults.cache_ttl(),
            cache_capacity: defaults.cache_capacity,
        }
    }

    /// Take limits and cache settings from configuration
    pub fn with_search_config(mut self, config: &SearchConfig) -> Self {
        self.default_limit = config.default_limit;
        self.max_limit = config.max_limit;
        self.cache_ttl = config.cache_ttl();
        self.cache_capacity = config.cache_capacity;
        self
    }

    /// Set the default result limit
    pub fn default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Set the maximum result limit
    pub fn max_limit(mut self, limit: usize) -> Self {
        self.max_limit = limit;
        self
    }

    /// Set how long remote results stay cached
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Register a capability
    ///
    /// `real` is the result of constructing the real provider. On error the
    /// fallback is selected if present, otherwise the capability is unavailable.
    pub fn capability(
        mut self,
        capability: Capability,
        real: Result<Arc<dyn SearchProvider>>,
        fallback: Option<Arc<dyn SearchProvider>>,
    ) -> Self {
        let fallback_available = fallback.is_some();
        let slot = match (real, fallback) {
            (Ok(provider), _) => {
                info!(
                    "Capability '{}' active with provider '{}'",
                    capability,
                    provider.metadata().name
                );
                ProviderSlot::Real(provider)
            }
            (Err(e), Some(fallback)) => {
                warn!(
                    "Capability '{}' using fallback '{}': {}",
                    capability,
                    fallback.metadata().name,
                    e
                );
                ProviderSlot::Fallback(fallback)
            }
            (Err(e), None) => {
                warn!("Capability '{}' unavailable: {}", capability, e);
                ProviderSlot::Unavailable
            }
        };
        self.entries.insert(
            capability,
            CapabilityEntry {
                slot,
                fallback_available,
            },
        );
        self
    }

    /// Build the manager
    ///
    /// The default limit is clamped into `1..=max_limit` and the cache TTL to
    /// at most one day.
    pub fn build(self) -> ServiceManager {
        let mut entries = self.entries;
        for capability in Capability::ALL {
            entries.entry(capability).or_default();
        }
        let max_limit = self.max_limit.max(1);
        let default_limit = self.default_limit.clamp(1, max_limit);
        if default_limit != self.default_limit {
            warn!(
                "Default limit {} clamped to {} (max {})",
                self.default_limit, default_limit, max_limit
            );
        }
        let cache = Cache::builder()
            .max_capacity(self.cache_capacity)
            .time_to_live(self.cache_ttl.min(Duration::from_secs(MAX_CACHE_TTL_SECS)))
            .build();
        ServiceManager::from_parts(entries, default_limit, max_limit, cache)
    }
}
