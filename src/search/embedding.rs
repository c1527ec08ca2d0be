//! Text embedders.
//!
//! - [`FastEmbedder`]: FastEmbed `all-MiniLM-L6-v2`, the real semantic model.
//! - [`HashEmbedder`]: MD5-derived pseudo-embedding used when the model cannot
//!   be loaded. It is **not** semantic: similar texts do not get similar
//!   vectors. It only keeps catalog search answering when the model is missing.

use std::fmt;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use md5::{Digest, Md5};
use tracing::{debug, info};

use super::{DEFAULT_MODEL, EMBEDDING_DIM};
use crate::error::{Error, Result};

/// A dense embedding vector.
pub type Embedding = Vec<f32>;

/// Something that turns text into fixed-length vectors.
pub trait Embedder: Send + Sync {
    /// Stable identifier, e.g. `"md5-384"`.
    fn id(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Whether vector similarity reflects text similarity.
    fn is_semantic(&self) -> bool;

    /// Embed a batch of texts, one vector per input in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| Error::provider(self.id(), "embedder returned no vector"))
    }
}

/// Metadata about an embedder for display and logging.
#[derive(Debug, Clone)]
pub struct EmbedderInfo {
    pub id: String,
    pub dimension: usize,
    pub is_semantic: bool,
}

impl EmbedderInfo {
    /// Create info from an embedder instance.
    pub fn from_embedder(embedder: &dyn Embedder) -> Self {
        Self {
            id: embedder.id().to_string(),
            dimension: embedder.dimension(),
            is_semantic: embedder.is_semantic(),
        }
    }
}

impl fmt::Display for EmbedderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_semantic {
            "semantic"
        } else {
            "placeholder"
        };
        write!(f, "{} ({}, {} dims)", self.id, kind, self.dimension)
    }
}

/// Deterministic hash-based pseudo-embedding.
///
/// The lower-cased text is hashed with MD5. Each of the 16 digest bytes
/// becomes `byte / 255`, and that sequence is repeated until `dimension`
/// values exist. Identical text (ignoring case) always gives identical vectors.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    id: String,
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(EMBEDDING_DIM)
    }
}

impl HashEmbedder {
    /// Create a hash embedder producing `dimension`-length vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            id: format!("md5-{}", dimension),
            dimension,
        }
    }

    /// Embed one text. Never fails.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let digest = Md5::digest(text.to_lowercase().as_bytes());
        digest
            .iter()
            .map(|byte| f32::from(*byte) / 255.0)
            .cycle()
            .take(self.dimension)
            .collect()
    }

    /// Embed many texts into a matrix, one row per input.
    pub fn encode<S: AsRef<str>>(&self, texts: &[S]) -> Vec<Embedding> {
        texts.iter().map(|t| self.embed_text(t.as_ref())).collect()
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_semantic(&self) -> bool {
        false
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        Ok(self.encode(texts))
    }
}

/// FastEmbed-backed sentence embedder.
pub struct FastEmbedder {
    model: TextEmbedding,
}

impl FastEmbedder {
    /// Identifier of the bundled model.
    pub const ID: &'static str = DEFAULT_MODEL;

    /// Load the default model, downloading it on first use.
    pub fn new() -> Result<Self> {
        info!("Loading embedding model {}", Self::ID);
        let options =
            InitOptions::new(EmbeddingModel::AllMiniLML6V2).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| Error::unavailable("semantic", format!("model load failed: {}", e)))?;
        Ok(Self { model })
    }
}

impl Embedder for FastEmbedder {
    fn id(&self) -> &str {
        Self::ID
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn is_semantic(&self) -> bool {
        true
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), Self::ID);
        self.model
            .embed(texts.to_vec(), None)
            .map_err(|e| Error::provider(Self::ID, e))
    }
}

/// Dot product of two equal-length vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale `vector` to unit Euclidean length in place.
///
/// A zero vector is left as zero.
pub fn normalize(vector: &mut [f32]) {
    let norm = dot(vector, vector).sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    vector.iter_mut().for_each(|v| *v /= norm);
}

/// Normalize every row of a matrix to unit length.
pub fn normalize_l2(vectors: &mut [Embedding]) {
    vectors.iter_mut().for_each(|v| normalize(v));
}

#[cfg(test)]
mod tests {
    use super::*;

    // ================================================================
    // Hash embedder
    // ================================================================

    #[test]
    fn test_hash_embedding_has_fixed_dimension_and_range() {
        let embedder = HashEmbedder::default();
        let long = "basmati ".repeat(500);
        for text in ["", "milk", "Fresh organic paneer 200g", long.as_str(), "दूध"] {
            let v = embedder.embed_text(text);
            assert_eq!(v.len(), EMBEDDING_DIM, "wrong length for {:?}", text);
            assert!(
                v.iter().all(|x| (0.0..=1.0).contains(x)),
                "component out of range for {:?}",
                text
            );
        }
    }

    #[test]
    fn test_hash_embedding_is_deterministic() {
        let a = HashEmbedder::default().embed_text("toor dal");
        let b = HashEmbedder::default().embed_text("toor dal");
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_embedding_ignores_case() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.embed_text("Milk"), embedder.embed_text("milk"));
    }

    #[test]
    fn test_hash_embedding_matches_md5_digest() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        let v = HashEmbedder::new(18).embed_text("");
        assert_eq!(v[0], 0xd4 as f32 / 255.0);
        assert_eq!(v[1], 0x1d as f32 / 255.0);
        assert_eq!(v[15], 0x7e as f32 / 255.0);
        // padding repeats the digest from the start
        assert_eq!(v[16], v[0]);
        assert_eq!(v[17], v[1]);
    }

    #[test]
    fn test_hash_embedding_differs_between_texts() {
        let embedder = HashEmbedder::default();
        assert_ne!(embedder.embed_text("rice"), embedder.embed_text("milk"));
    }

    #[test]
    fn test_encode_batch_preserves_order() {
        let embedder = HashEmbedder::default();
        let rows = embedder.encode(&["rice", "milk"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], embedder.embed_text("rice"));
        assert_eq!(rows[1], embedder.embed_text("milk"));
    }

    #[test]
    fn test_embedder_trait_on_hash() {
        let embedder = HashEmbedder::default();
        let v = Embedder::embed(&embedder, "hello").unwrap();
        assert_eq!(v.len(), 384);
        assert_eq!(embedder.id(), "md5-384");
        assert!(!embedder.is_semantic());

        let info = EmbedderInfo::from_embedder(&embedder);
        assert_eq!(format!("{}", info), "md5-384 (placeholder, 384 dims)");
    }

    // ================================================================
    // Normalization
    // ================================================================

    #[test]
    fn test_normalize_zero_vector_stays_zero() {
        let mut v = vec![0.0_f32; 8];
        normalize(&mut v);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_normalize_l2_gives_unit_rows() {
        let mut rows = vec![vec![3.0, 4.0], vec![0.0, 0.0], vec![1.0, 0.0]];
        normalize_l2(&mut rows);
        assert_eq!(rows[0], vec![0.6, 0.8]);
        assert_eq!(rows[1], vec![0.0, 0.0]);
        assert_eq!(rows[2], vec![1.0, 0.0]);
    }

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    }
}
