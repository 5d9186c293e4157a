//! Vector index abstraction
//!
//! The index stores chunk embeddings and answers similarity queries.
//! Backends embed the query themselves so callers never handle raw
//! vectors.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::models::ChunkRecord;

/// A similarity search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkHit {
    /// Paper the chunk belongs to
    pub arxiv_id: String,
    /// Chunk text
    pub text: String,
    /// Cosine similarity to the query, higher is closer
    pub score: f32,
}

/// Storage and search over embedded chunks
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a batch of chunks with their embeddings.
    ///
    /// `chunks` and `embeddings` are parallel slices; implementations
    /// return a Store error if the lengths differ.
    async fn index(&self, chunks: &[ChunkRecord], embeddings: &[Vec<f32>]) -> Result<()>;

    /// Return the `k` chunks most similar to `query`, best first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ChunkHit>>;
}
