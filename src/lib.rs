//! Regional shopping assistant.
//!
//! Product search over a local catalog and web search providers, with a
//! service manager that picks a real or fallback provider per capability at
//! startup, per-session shopping lists, and an HTTP API.

pub mod api;
pub mod config;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod providers;
pub mod search;
pub mod service;
pub mod shopping_list;

pub use api::{ApiError, ApiServer, AppState};
pub use config::{ApiConfig, AppConfig, CatalogConfig, MetricsConfig, SearchConfig};
pub use error::{Error, Result};
pub use listing::ProductListing;
pub use crate::metrics::MetricsService;
pub use providers::{DuckDuckGoProvider, ProviderMetadata, SearchProvider, TavilyProvider};
pub use search::{Embedder, FlatIndex, HashEmbedder};
pub use service::{
    build_service_manager, AppContext, Capability, CapabilityState, HealthReport,
    OverallHealth, PriceComparison, ServiceManager,
};
pub use shopping_list::{NewItem, ShoppingList, ShoppingListItem, ShoppingLists};
