//! Application context: configuration plus the lazily built service manager.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{Capability, ServiceManager};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::providers::{DuckDuckGoProvider, SearchProvider, TavilyProvider};
use crate::search::{
    builtin_catalog, load_catalog_file, CatalogProduct, FastEmbedder, HashEmbedder,
    KeywordCatalogSearch, SemanticCatalogSearch,
};

/// Explicitly passed application context.
///
/// The service manager is built on first use. Concurrent first calls share a
/// single initialization; later calls return the same instance.
pub struct AppContext {
    config: AppConfig,
    manager: OnceCell<Arc<ServiceManager>>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            manager: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The service manager, building it if needed.
    pub async fn service_manager(&self) -> Result<Arc<ServiceManager>> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                build_service_manager(&self.config).await.map(Arc::new)
            })
            .await?;
        Ok(manager.clone())
    }

    /// Release resources. Nothing is held beyond memory, so this only logs.
    pub async fn shutdown(&self) {
        if self.manager.initialized() {
            info!("Service manager shut down");
        }
    }
}

fn catalog_products(config: &AppConfig) -> Result<Vec<CatalogProduct>> {
    let mut products = if config.catalog.include_builtin {
        builtin_catalog()
    } else {
        Vec::new()
    };
    if let Some(path) = &config.catalog.path {
        let extra = load_catalog_file(path).map_err(|e| {
            Error::Config(format!("failed to load catalog {}: {}", path.display(), e))
        })?;
        info!("Loaded {} catalog products from {}", extra.len(), path.display());
        products.extend(extra);
    }
    if products.is_empty() {
        warn!("Catalog is empty; catalog searches will return nothing");
    }
    Ok(products)
}

async fn real_semantic(
    config: &AppConfig,
    products: Vec<CatalogProduct>,
) -> Result<Arc<dyn SearchProvider>> {
    if !config.search.enable_semantic {
        return Err(Error::unavailable(
            Capability::Semantic.as_str(),
            "disabled in configuration",
        ));
    }
    let embedder = tokio::task::spawn_blocking(FastEmbedder::new)
        .await
        .map_err(|e| Error::unavailable(Capability::Semantic.as_str(), e))??;
    let search = SemanticCatalogSearch::new(Arc::new(embedder));
    search
        .load(products)
        .await
        .map_err(|e| Error::unavailable(Capability::Semantic.as_str(), e))?;
    Ok(Arc::new(search))
}

fn real_tavily(config: &AppConfig) -> Result<Arc<dyn SearchProvider>> {
    let search = &config.search;
    if !search.enable_tavily {
        return Err(Error::unavailable(
            Capability::Tavily.as_str(),
            "disabled in configuration",
        ));
    }
    let key = search.tavily_api_key.clone().unwrap_or_default();
    Ok(Arc::new(TavilyProvider::new(key, search.request_timeout())?))
}

fn real_duckduckgo(config: &AppConfig) -> Result<Arc<dyn SearchProvider>> {
    if !config.search.enable_duckduckgo {
        return Err(Error::unavailable(
            Capability::DuckDuckGo.as_str(),
            "disabled in configuration",
        ));
    }
    Ok(Arc::new(DuckDuckGoProvider::new(
        config.search.request_timeout(),
    )?))
}

/// Construct every provider and select one per capability.
///
/// Order: catalog, semantic (real then hash fallback), Tavily, DuckDuckGo
/// (keyword fallback over the catalog).
pub async fn build_service_manager(config: &AppConfig) -> Result<ServiceManager> {
    config.validate()?;
    let products = catalog_products(config)?;

    let hash_search = SemanticCatalogSearch::new(Arc::new(HashEmbedder::default()));
    hash_search.load(products.clone()).await?;
    let semantic_fallback: Arc<dyn SearchProvider> = Arc::new(hash_search);
    let keyword_fallback: Arc<dyn SearchProvider> =
        Arc::new(KeywordCatalogSearch::new(products.clone()));

    let manager = ServiceManager::builder()
        .with_search_config(&config.search)
        .capability(
            Capability::Semantic,
            real_semantic(config, products).await,
            Some(semantic_fallback),
        )
        .capability(Capability::Tavily, real_tavily(config), None)
        .capability(
            Capability::DuckDuckGo,
            real_duckduckgo(config),
            Some(keyword_fallback),
        )
        .build();

    let report = manager.health_check();
    info!(
        "Service manager ready: {}/{} capabilities active ({:?})",
        report.active_count, report.total_count, report.overall_health
    );
    Ok(manager)
}
