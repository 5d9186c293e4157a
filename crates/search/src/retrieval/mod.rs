//! Retrieval strategies
//!
//! Three retrievers share one interface: plain vector similarity,
//! cross-encoder reranking over an oversampled candidate pool, and a
//! hybrid that blends rerank relevance with citation authority.

pub mod hybrid;
pub mod rerank;
pub mod vector;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use citegraph_common::errors::{AppError, Result};
use citegraph_common::graph::GraphStore;
use citegraph_common::models::Paper;
use citegraph_common::vector::ChunkHit;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use hybrid::HybridRetriever;
pub use rerank::RerankRetriever;
pub use vector::VectorRetriever;

/// A retrieved chunk with its owning paper attached.
///
/// The optional fields are filled by the strategy that produced the
/// result: rerank score and rank by the reranking retrievers, hybrid
/// score by the hybrid retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub paper: Paper,
    pub rerank_score: Option<f32>,
    pub rerank_rank: Option<usize>,
    pub hybrid_score: Option<f32>,
}

/// A retrieval strategy
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `k` chunks for the query, best first
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Attach stored papers to similarity hits with one batched lookup.
///
/// Hits whose paper is missing from the store are dropped with a
/// warning; they can only appear between a chunk insert and the orphan
/// purge.
pub(crate) async fn attach_papers(
    store: &Arc<dyn GraphStore>,
    hits: &[ChunkHit],
) -> Result<Vec<RetrievedChunk>> {
    let mut ids: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for hit in hits {
        if seen.insert(hit.arxiv_id.clone()) {
            ids.push(hit.arxiv_id.clone());
        }
    }

    let papers = store.get_papers(&ids).await?;
    let by_id: std::collections::HashMap<&str, &Paper> =
        papers.iter().map(|p| (p.arxiv_id.as_str(), p)).collect();

    let mut results = Vec::with_capacity(hits.len());
    for hit in hits {
        match by_id.get(hit.arxiv_id.as_str()) {
            Some(paper) => results.push(RetrievedChunk {
                text: hit.text.clone(),
                paper: (*paper).clone(),
                rerank_score: None,
                rerank_rank: None,
                hybrid_score: None,
            }),
            None => {
                warn!(arxiv_id = %hit.arxiv_id, "dropping chunk with no stored paper");
            }
        }
    }
    Ok(results)
}

/// Fold store and index failures into the retrieval error class
pub(crate) fn retrieval_err(context: &str, err: AppError) -> AppError {
    match err {
        err @ AppError::Retrieval { .. } => err,
        other => AppError::Retrieval {
            message: format!("{context}: {other}"),
        },
    }
}
