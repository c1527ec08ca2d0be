//! Search provider trait and types.
//!
//! A provider answers a free-text query with product listings. Remote
//! providers wrap third-party HTTP APIs; local providers search the in-memory
//! catalog (see [`crate::search::catalog`]).

mod duckduckgo;
mod tavily;

pub use duckduckgo::{DuckDuckGoProvider, DUCKDUCKGO_ENDPOINT};
pub use tavily::{TavilyProvider, TAVILY_ENDPOINT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::listing::ProductListing;

/// User agent sent by the HTTP providers.
pub const USER_AGENT: &str = concat!("regional-shopping/", env!("CARGO_PKG_VERSION"));

/// Provider metadata for discovery and health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Unique provider name (e.g., "tavily", "catalog-keyword")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Whether calls leave the process (results are cacheable)
    pub remote: bool,
    /// Tags for categorization
    pub tags: Vec<String>,
}

impl ProviderMetadata {
    /// Metadata for a provider that calls out over the network.
    pub fn remote(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            remote: true,
            tags: Vec::new(),
        }
    }

    /// Metadata for an in-process provider.
    pub fn local(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            remote: false,
            ..Self::remote(name, description)
        }
    }

    /// Add a tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// The SearchProvider trait
///
/// # Example
///
/// ```rust,ignore
/// struct StaticProvider(Vec<ProductListing>);
///
/// #[async_trait]
/// impl SearchProvider for StaticProvider {
///     fn metadata(&self) -> ProviderMetadata {
///         ProviderMetadata::local("static", "Fixed listings")
///     }
///
///     async fn search(&self, _query: &str, limit: usize) -> Result<Vec<ProductListing>> {
///         Ok(self.0.iter().take(limit).cloned().collect())
///     }
/// }
/// ```
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Get provider metadata
    fn metadata(&self) -> ProviderMetadata;

    /// Search for products
    ///
    /// Implementations return at most `limit` listings, best first. Failures
    /// are reported as `Error::ProviderCallFailed`.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ProductListing>>;
}

/// Rank-based relevance for providers that do not score results.
pub(crate) fn rank_score(rank: usize) -> f32 {
    1.0 / (rank as f32 + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_constructors() {
        let remote = ProviderMetadata::remote("tavily", "Tavily API").with_tag("web");
        assert!(remote.remote);
        assert_eq!(remote.tags, vec!["web".to_string()]);

        let local = ProviderMetadata::local("catalog", "Local catalog");
        assert!(!local.remote);
        assert_eq!(local.name, "catalog");
    }

    #[test]
    fn test_rank_score_decays() {
        assert_eq!(rank_score(0), 1.0);
        assert_eq!(rank_score(1), 0.5);
        assert!(rank_score(5) < rank_score(4));
    }
}
