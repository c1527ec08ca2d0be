//! Brute-force inner-product vector index.
//!
//! Vectors are appended to a flat list and every search scans all of them,
//! O(n·d). Scores are raw dot products; callers that want cosine similarity
//! normalize vectors before adding and querying.

use std::cmp::Ordering;

use serde::Serialize;

use super::embedding::{dot, Embedding};
use crate::error::{Error, Result};

/// What `search` returns when nothing has been added yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyIndexPolicy {
    /// `k` zero scores and `k` zero indices. Kept for compatibility with
    /// callers that expect fixed-size output; the indices do not refer to
    /// stored vectors.
    #[default]
    ZeroPadded,
    /// An empty result.
    Empty,
}

/// Top-k search output: scores in descending order and their store indices.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchHits {
    pub scores: Vec<f32>,
    pub indices: Vec<usize>,
}

impl SearchHits {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate `(index, score)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices.iter().copied().zip(self.scores.iter().copied())
    }
}

/// Append-only flat index.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<Embedding>,
    empty_policy: EmptyIndexPolicy,
}

impl FlatIndex {
    /// Create an index for `dimension`-length vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            empty_policy: EmptyIndexPolicy::default(),
        }
    }

    /// Set the empty-index behavior.
    pub fn with_empty_policy(mut self, policy: EmptyIndexPolicy) -> Self {
        self.empty_policy = policy;
        self
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append vectors, preserving order. All-or-nothing on a dimension mismatch.
    pub fn add(&mut self, vectors: Vec<Embedding>) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(Error::InvalidQuery(format!(
                "vector has {} dimensions, index expects {}",
                bad.len(),
                self.dimension
            )));
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Return the `k` stored vectors with the highest dot product against `query`.
    ///
    /// Ties keep insertion order. Returns `min(k, len)` hits on a non-empty index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<SearchHits> {
        if k == 0 {
            return Err(Error::InvalidQuery("k must be positive".to_string()));
        }
        if query.len() != self.dimension {
            return Err(Error::InvalidQuery(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        if self.vectors.is_empty() {
            return Ok(match self.empty_policy {
                EmptyIndexPolicy::ZeroPadded => SearchHits {
                    scores: vec![0.0; k],
                    indices: vec![0; k],
                },
                EmptyIndexPolicy::Empty => SearchHits::default(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(query, v)))
            .collect();
        // stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(SearchHits {
            scores: scored.iter().map(|(_, s)| *s).collect(),
            indices: scored.iter().map(|(i, _)| *i).collect(),
        })
    }
}
