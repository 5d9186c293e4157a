//! Rerank retrieval
//!
//! Oversamples candidates from the vector index, rescores them with a
//! cross-encoder, and keeps the best k. Each result carries the rerank
//! score and its 1-based rank.

use std::sync::Arc;

use async_trait::async_trait;
use citegraph_common::errors::Result;
use citegraph_common::graph::GraphStore;
use citegraph_common::rerank::Reranker;
use citegraph_common::vector::VectorIndex;
use tracing::debug;

use super::{attach_papers, retrieval_err, RetrievedChunk, Retriever};

/// Two-stage retrieval: vector recall, cross-encoder precision
pub struct RerankRetriever {
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn GraphStore>,
    reranker: Arc<dyn Reranker>,
    /// Candidate multiplier: the first stage fetches `oversample * k`
    oversample: usize,
}

impl RerankRetriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn GraphStore>,
        reranker: Arc<dyn Reranker>,
        oversample: usize,
    ) -> Self {
        Self {
            index,
            store,
            reranker,
            oversample: oversample.max(1),
        }
    }
}

#[async_trait]
impl Retriever for RerankRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let candidates = self
            .index
            .similarity_search(query, self.oversample * k)
            .await
            .map_err(|e| retrieval_err("similarity search failed", e))?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let ranked = self.reranker.rerank(query, &texts, k).await?;

        debug!(
            candidates = candidates.len(),
            kept = ranked.len(),
            "rerank retrieval"
        );

        let kept: Vec<_> = ranked
            .iter()
            .map(|r| candidates[r.index].clone())
            .collect();
        let mut results = attach_papers(&self.store, &kept)
            .await
            .map_err(|e| retrieval_err("paper lookup failed", e))?;

        // attach_papers preserves hit order, so scores line up unless a
        // paper was dropped
        if results.len() == ranked.len() {
            for (chunk, r) in results.iter_mut().zip(ranked.iter()) {
                chunk.rerank_score = Some(r.score);
                chunk.rerank_rank = Some(r.rank);
            }
        } else {
            for chunk in results.iter_mut() {
                let hit = ranked
                    .iter()
                    .find(|r| candidates[r.index].text == chunk.text);
                if let Some(r) = hit {
                    chunk.rerank_score = Some(r.score);
                    chunk.rerank_rank = Some(r.rank);
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use citegraph_common::embeddings::{Embedder, NgramEmbedder};
    use citegraph_common::graph::MemoryBackend;
    use citegraph_common::models::{ChunkRecord, Paper};
    use citegraph_common::rerank::LexicalReranker;

    fn paper(id: &str) -> Paper {
        Paper {
            arxiv_id: id.to_string(),
            title: format!("Title {id}"),
            summary: String::new(),
            authors: vec![],
            categories: vec![],
            published: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            abs_link: String::new(),
            pdf_link: String::new(),
            full_text: String::new(),
            cited_arxiv_ids: vec![],
            citation_count: None,
        }
    }

    async fn seeded_backend(texts: &[(&str, &str)]) -> Arc<MemoryBackend> {
        let embedder = Arc::new(NgramEmbedder::new(64));
        let backend = Arc::new(MemoryBackend::new(embedder.clone()));

        let papers: Vec<Paper> = texts.iter().map(|(id, _)| paper(id)).collect();
        backend.upsert_papers(&papers).await.unwrap();

        let chunks: Vec<ChunkRecord> = texts
            .iter()
            .map(|(id, text)| ChunkRecord {
                arxiv_id: id.to_string(),
                seq: 0,
                text: text.to_string(),
            })
            .collect();
        let mut embeddings = Vec::new();
        for c in &chunks {
            embeddings.push(embedder.embed(&c.text).await.unwrap());
        }
        backend.index(&chunks, &embeddings).await.unwrap();
        backend
    }

    #[tokio::test]
    async fn test_results_carry_score_and_rank() {
        let backend = seeded_backend(&[
            ("2301.00001", "graph retrieval with citations"),
            ("2301.00002", "protein folding dynamics"),
            ("2301.00003", "retrieval augmented generation with graphs"),
        ])
        .await;
        let retriever = RerankRetriever::new(
            backend.clone(),
            backend,
            Arc::new(LexicalReranker::new()),
            2,
        );

        let results = retriever.retrieve("graph retrieval", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rerank_rank, Some(1));
        assert_eq!(results[1].rerank_rank, Some(2));
        assert!(results[0].rerank_score.unwrap() >= results[1].rerank_score.unwrap());
        // both top results actually mention the query terms
        assert!(results[0].text.contains("retrieval"));
    }

    #[tokio::test]
    async fn test_k_limits_output_not_candidates() {
        let backend = seeded_backend(&[
            ("2301.00001", "alpha topic one"),
            ("2301.00002", "alpha topic two"),
            ("2301.00003", "alpha topic three"),
            ("2301.00004", "alpha topic four"),
        ])
        .await;
        let retriever = RerankRetriever::new(
            backend.clone(),
            backend,
            Arc::new(LexicalReranker::new()),
            2,
        );

        let results = retriever.retrieve("alpha topic", 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty() {
        let embedder = Arc::new(NgramEmbedder::new(64));
        let backend = Arc::new(MemoryBackend::new(embedder));
        let retriever = RerankRetriever::new(
            backend.clone(),
            backend,
            Arc::new(LexicalReranker::new()),
            2,
        );
        assert!(retriever.retrieve("query", 5).await.unwrap().is_empty());
    }
}
