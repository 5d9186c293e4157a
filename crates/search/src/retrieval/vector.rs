//! Plain vector similarity retrieval

use std::sync::Arc;

use async_trait::async_trait;
use citegraph_common::errors::Result;
use citegraph_common::graph::GraphStore;
use citegraph_common::vector::VectorIndex;
use tracing::debug;

use super::{attach_papers, retrieval_err, RetrievedChunk, Retriever};

/// Top-k similarity search with papers attached
pub struct VectorRetriever {
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn GraphStore>,
}

impl VectorRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, store: Arc<dyn GraphStore>) -> Self {
        Self { index, store }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let hits = self
            .index
            .similarity_search(query, k)
            .await
            .map_err(|e| retrieval_err("similarity search failed", e))?;

        debug!(query_len = query.len(), hits = hits.len(), "vector retrieval");

        attach_papers(&self.store, &hits)
            .await
            .map_err(|e| retrieval_err("paper lookup failed", e))
    }
}
