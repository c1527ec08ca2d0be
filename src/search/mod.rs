//! Catalog search: embeddings, the flat vector index and the catalog providers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────────────┐
//! │ Catalog Product │────▶│ Embedder                │
//! │   (text data)   │     │ FastEmbed | MD5 fallback│
//! └─────────────────┘     └────────────┬────────────┘
//!                                      │
//!                                      ▼
//!                              ┌──────────────┐
//!                              │  Embedding   │
//!                              │  [f32; 384]  │
//!                              └──────┬───────┘
//!                                     │ normalize
//!                                     ▼
//!                              ┌──────────────┐
//!                              │  FlatIndex   │
//!                              │ (dot product)│
//!                              └──────┬───────┘
//!                                     │ top-k
//!                                     ▼
//!                              ┌──────────────┐
//!                              │ProductListing│
//!                              └──────────────┘
//! ```

pub mod catalog;
mod embedding;
mod index;

pub use catalog::{
    builtin_catalog, load_catalog_file, CatalogProduct, KeywordCatalogSearch,
    SemanticCatalogSearch,
};
pub use embedding::{
    dot, normalize, normalize_l2, Embedder, EmbedderInfo, Embedding, FastEmbedder, HashEmbedder,
};
pub use index::{EmptyIndexPolicy, FlatIndex, SearchHits};

/// Default embedding model (all-MiniLM-L6-v2 - 384 dimensions, good balance of speed/quality)
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

/// Embedding dimension for the default model
pub const EMBEDDING_DIM: usize = 384;
