//! Local product catalog and the providers that search it.
//!
//! [`SemanticCatalogSearch`] embeds every product once at load time and answers
//! queries through a [`FlatIndex`]. Which embedder it gets decides whether the
//! semantic capability is active (FastEmbed) or on the hash fallback.
//! [`KeywordCatalogSearch`] is plain token matching, used when DuckDuckGo is
//! not available.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::embedding::{normalize, normalize_l2, Embedder, EmbedderInfo, Embedding};
use super::index::{EmptyIndexPolicy, FlatIndex};
use crate::error::{Error, Result};
use crate::listing::ProductListing;
use crate::providers::{ProviderMetadata, SearchProvider};

/// Source label for catalog listings.
pub const CATALOG_SOURCE: &str = "Local Catalog";

const QUERY_CACHE_SIZE: usize = 256;

/// A product in the local catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_source() -> String {
    CATALOG_SOURCE.to_string()
}

impl CatalogProduct {
    fn new(title: &str, description: &str, price: &str, category: &str) -> Self {
        let slug: String = title
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self {
            title: title.to_string(),
            description: description.to_string(),
            price: price.to_string(),
            category: category.to_string(),
            url: format!("https://catalog.local/products/{}", slug),
            source: default_source(),
        }
    }

    /// Text fed to the embedder.
    fn embedding_text(&self) -> String {
        format!("{}. {}. {}", self.title, self.description, self.category)
    }

    fn to_listing(&self, relevance_score: f32) -> ProductListing {
        ProductListing {
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price.clone(),
            url: self.url.clone(),
            source: self.source.clone(),
            relevance_score,
        }
    }
}

/// Regional grocery and household staples.
pub fn builtin_catalog() -> Vec<CatalogProduct> {
    vec![
        CatalogProduct::new("Basmati Rice 5kg", "Aged long-grain basmati rice", "₹649", "grains"),
        CatalogProduct::new("Sona Masoori Rice 10kg", "Lightweight medium-grain rice from Andhra Pradesh", "₹720", "grains"),
        CatalogProduct::new("Brown Rice 1kg", "Unpolished whole grain rice", "₹145", "grains"),
        CatalogProduct::new("Toor Dal 1kg", "Split pigeon peas, unpolished", "₹165", "pulses"),
        CatalogProduct::new("Moong Dal 1kg", "Yellow split mung beans", "₹140", "pulses"),
        CatalogProduct::new("Whole Wheat Atta 5kg", "Stone-ground chakki atta for rotis", "₹275", "grains"),
        CatalogProduct::new("Toned Milk 1L", "Pasteurised toned milk, 3% fat", "₹56", "dairy"),
        CatalogProduct::new("Full Cream Milk 1L", "Pasteurised full cream milk, 6% fat", "₹68", "dairy"),
        CatalogProduct::new("Fresh Paneer 200g", "Soft malai paneer made from cow milk", "₹90", "dairy"),
        CatalogProduct::new("Curd 400g", "Set dahi, thick and creamy", "₹35", "dairy"),
        CatalogProduct::new("Desi Ghee 500ml", "Cow ghee with granular texture", "₹330", "dairy"),
        CatalogProduct::new("Fresh Spinach 250g", "Palak bunch, farm fresh leafy greens", "₹30", "vegetables"),
        CatalogProduct::new("Onion 1kg", "Red onions from Nashik", "₹40", "vegetables"),
        CatalogProduct::new("Tomato 1kg", "Ripe hybrid tomatoes", "₹36", "vegetables"),
        CatalogProduct::new("Potato 1kg", "Fresh potatoes for curries and fries", "₹32", "vegetables"),
        CatalogProduct::new("Alphonso Mango 1 dozen", "Ratnagiri hapus mangoes", "₹899", "fruits"),
        CatalogProduct::new("Banana 1 dozen", "Robusta bananas", "₹55", "fruits"),
        CatalogProduct::new("Cold Pressed Groundnut Oil 1L", "Wood-pressed peanut oil", "₹310", "oils"),
        CatalogProduct::new("Masala Chai Tea 250g", "Assam CTC tea blended with spices", "₹150", "beverages"),
        CatalogProduct::new("Turmeric Powder 200g", "Haldi from Erode, high curcumin", "₹60", "spices"),
    ]
}

/// Load extra catalog products from a JSON array file.
pub fn load_catalog_file(path: impl AsRef<Path>) -> Result<Vec<CatalogProduct>> {
    let content = std::fs::read_to_string(path)?;
    let products: Vec<CatalogProduct> = serde_json::from_str(&content)?;
    Ok(products)
}

/// Embed owned texts on the blocking pool.
async fn embed_owned(embedder: Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Embedding>> {
    tokio::task::spawn_blocking(move || {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        embedder.embed_batch(&refs)
    })
    .await
    .map_err(|e| Error::provider("embedder", format!("embedding task failed: {}", e)))?
}

/// Index and product rows, always appended together.
struct CatalogStore {
    index: FlatIndex,
    products: Vec<CatalogProduct>,
}

/// Embedding similarity search over the catalog.
pub struct SemanticCatalogSearch {
    embedder: Arc<dyn Embedder>,
    store: RwLock<CatalogStore>,
    query_cache: Mutex<LruCache<String, Embedding>>,
}

impl SemanticCatalogSearch {
    /// Create an empty catalog search using `embedder`.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        let index = FlatIndex::new(embedder.dimension()).with_empty_policy(EmptyIndexPolicy::Empty);
        let capacity = NonZeroUsize::new(QUERY_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            embedder,
            store: RwLock::new(CatalogStore {
                index,
                products: Vec::new(),
            }),
            query_cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Embedder backing this search.
    pub fn embedder_info(&self) -> EmbedderInfo {
        EmbedderInfo::from_embedder(self.embedder.as_ref())
    }

    /// Embed and append products. Returns the new catalog size.
    ///
    /// Vectors and rows are appended under one write lock, so concurrent
    /// searches see either none or all of the batch.
    pub async fn load(&self, products: Vec<CatalogProduct>) -> Result<usize> {
        if products.is_empty() {
            return Ok(self.len().await);
        }
        let texts = products.iter().map(CatalogProduct::embedding_text).collect();
        let mut vectors = embed_owned(self.embedder.clone(), texts).await?;
        normalize_l2(&mut vectors);

        let mut store = self.store.write().await;
        store.index.add(vectors)?;
        store.products.extend(products);
        info!(
            "Catalog indexed with {} ({} products)",
            self.embedder.id(),
            store.products.len()
        );
        Ok(store.products.len())
    }

    /// Number of indexed products.
    pub async fn len(&self) -> usize {
        self.store.read().await.products.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn query_embedding(&self, query: &str) -> Result<Embedding> {
        let key = query.trim().to_lowercase();
        if let Some(hit) = self.query_cache.lock().await.get(&key) {
            return Ok(hit.clone());
        }
        let mut vector = embed_owned(self.embedder.clone(), vec![key.clone()])
            .await?
            .pop()
            .ok_or_else(|| Error::provider(self.embedder.id(), "no query embedding"))?;
        normalize(&mut vector);
        self.query_cache.lock().await.put(key, vector.clone());
        Ok(vector)
    }
}

#[async_trait]
impl SearchProvider for SemanticCatalogSearch {
    fn metadata(&self) -> ProviderMetadata {
        let info = self.embedder_info();
        let name = if info.is_semantic {
            "catalog-semantic"
        } else {
            "catalog-hash"
        };
        ProviderMetadata::local(name, format!("Catalog similarity search with {}", info))
            .with_tag("catalog")
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ProductListing>> {
        if self.is_empty().await {
            debug!("Semantic catalog search on empty catalog");
            return Ok(Vec::new());
        }
        let vector = self.query_embedding(query).await?;
        let store = self.store.read().await;
        let hits = store.index.search(&vector, limit)?;
        Ok(hits
            .iter()
            .filter_map(|(i, score)| store.products.get(i).map(|p| p.to_listing(score)))
            .collect())
    }
}

/// Token-overlap search over the catalog.
pub struct KeywordCatalogSearch {
    products: Vec<CatalogProduct>,
}

impl KeywordCatalogSearch {
    pub fn new(products: Vec<CatalogProduct>) -> Self {
        Self { products }
    }

    /// Title hits count double; the score is normalized to [0, 1].
    fn score(product: &CatalogProduct, tokens: &[String]) -> f32 {
        if tokens.is_empty() {
            return 0.0;
        }
        let title = product.title.to_lowercase();
        let body = format!("{} {}", product.description, product.category).to_lowercase();
        let total: usize = tokens
            .iter()
            .map(|t| {
                if title.contains(t.as_str()) {
                    2
                } else if body.contains(t.as_str()) {
                    1
                } else {
                    0
                }
            })
            .sum();
        total as f32 / (2 * tokens.len()) as f32
    }
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl SearchProvider for KeywordCatalogSearch {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata::local("catalog-keyword", "Keyword match over the local catalog")
            .with_tag("catalog")
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ProductListing>> {
        let tokens = tokenize(query);
        let mut scored: Vec<(f32, &CatalogProduct)> = self
            .products
            .iter()
            .map(|p| (Self::score(p, &tokens), p))
            .filter(|(s, _)| *s > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(s, p)| p.to_listing(s))
            .collect())
    }
}
