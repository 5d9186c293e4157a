//! Hybrid retrieval
//!
//! Blends cross-encoder relevance with citation authority. The rerank
//! stage runs at double depth: the vector index supplies 2x the usual
//! candidate pool and the reranker prunes it back before the citation
//! signal is blended in. Both signals are normalized by their
//! per-query maximum so neither unit dominates, then combined with
//! configurable weights and the top k kept.

use std::sync::Arc;

use async_trait::async_trait;
use citegraph_common::errors::Result;
use citegraph_common::graph::GraphStore;
use citegraph_common::rerank::Reranker;
use citegraph_common::vector::VectorIndex;
use tracing::debug;

use super::{attach_papers, retrieval_err, RetrievedChunk, Retriever};

/// Citation-aware retrieval over reranked candidates
pub struct HybridRetriever {
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn GraphStore>,
    reranker: Arc<dyn Reranker>,
    oversample: usize,
    rerank_weight: f32,
    citation_weight: f32,
}

impl HybridRetriever {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn GraphStore>,
        reranker: Arc<dyn Reranker>,
        oversample: usize,
        rerank_weight: f32,
        citation_weight: f32,
    ) -> Self {
        Self {
            index,
            store,
            reranker,
            oversample: oversample.max(1),
            rerank_weight,
            citation_weight,
        }
    }
}

#[async_trait]
impl Retriever for HybridRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        // the rerank stage itself runs oversampled, so the vector stage
        // fetches twice its pool and the reranker prunes back to it
        let rerank_pool = self.oversample * k;
        let candidates = self
            .index
            .similarity_search(query, 2 * rerank_pool)
            .await
            .map_err(|e| retrieval_err("similarity search failed", e))?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let ranked = self.reranker.rerank(query, &texts, rerank_pool).await?;

        let kept: Vec<_> = ranked
            .iter()
            .map(|r| candidates[r.index].clone())
            .collect();
        let mut chunks = attach_papers(&self.store, &kept)
            .await
            .map_err(|e| retrieval_err("paper lookup failed", e))?;

        if chunks.len() == ranked.len() {
            for (chunk, r) in chunks.iter_mut().zip(ranked.iter()) {
                chunk.rerank_score = Some(r.score);
                chunk.rerank_rank = Some(r.rank);
            }
        } else {
            for chunk in chunks.iter_mut() {
                let hit = ranked
                    .iter()
                    .find(|r| candidates[r.index].text == chunk.text);
                if let Some(r) = hit {
                    chunk.rerank_score = Some(r.score);
                    chunk.rerank_rank = Some(r.rank);
                }
            }
        }

        let scores: Vec<f32> = chunks
            .iter()
            .map(|c| c.rerank_score.unwrap_or(0.0))
            .collect();
        let citations: Vec<u64> = chunks
            .iter()
            .map(|c| c.paper.citation_count.unwrap_or(0))
            .collect();
        let combined = combine_scores(
            &scores,
            &citations,
            self.rerank_weight,
            self.citation_weight,
        );

        for (chunk, score) in chunks.iter_mut().zip(combined.iter()) {
            chunk.hybrid_score = Some(*score);
        }
        chunks.sort_by(|a, b| {
            b.hybrid_score
                .partial_cmp(&a.hybrid_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        chunks.truncate(k);

        debug!(kept = chunks.len(), "hybrid retrieval");
        Ok(chunks)
    }
}

/// Blend rerank scores with citation counts.
///
/// Each signal is divided by its maximum over the candidate set before
/// weighting. A non-positive maximum makes that signal contribute zero
/// for every candidate.
pub fn combine_scores(
    rerank_scores: &[f32],
    citation_counts: &[u64],
    rerank_weight: f32,
    citation_weight: f32,
) -> Vec<f32> {
    let max_score = rerank_scores.iter().cloned().fold(0.0_f32, f32::max);
    let max_citations = citation_counts.iter().max().copied().unwrap_or(0);

    rerank_scores
        .iter()
        .zip(citation_counts.iter())
        .map(|(score, citations)| {
            let relevance = if max_score > 0.0 {
                score / max_score
            } else {
                0.0
            };
            let authority = if max_citations > 0 {
                *citations as f32 / max_citations as f32
            } else {
                0.0
            };
            rerank_weight * relevance + citation_weight * authority
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use citegraph_common::embeddings::{Embedder, NgramEmbedder};
    use citegraph_common::graph::MemoryBackend;
    use citegraph_common::models::{ChunkRecord, Paper};
    use citegraph_common::rerank::{LexicalReranker, RerankResult};
    use citegraph_common::vector::ChunkHit;
    use std::sync::Mutex;

    #[test]
    fn test_combine_balances_relevance_and_authority() {
        // a middling match from a heavily cited paper should beat the
        // best match from a barely cited one
        let scores = vec![0.9, 0.5, 0.2];
        let citations = vec![1, 10, 1];
        let combined = combine_scores(&scores, &citations, 0.5, 0.5);

        assert!((combined[0] - 0.55).abs() < 1e-6);
        assert!((combined[1] - (0.5 * 0.5 / 0.9 + 0.5)).abs() < 1e-6);
        assert!(combined[1] > combined[0]);
        assert!(combined[0] > combined[2]);

        // top 2 order: the cited paper's chunk, then the best match
        let mut order: Vec<usize> = (0..combined.len()).collect();
        order.sort_by(|a, b| combined[*b].partial_cmp(&combined[*a]).unwrap());
        assert_eq!(&order[..2], &[1, 0]);
    }

    #[test]
    fn test_combine_zero_citations_everywhere() {
        let combined = combine_scores(&[0.8, 0.4], &[0, 0], 0.5, 0.5);
        // citation signal contributes nothing, relevance still ranks
        assert!((combined[0] - 0.5).abs() < 1e-6);
        assert!((combined[1] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_combine_zero_scores_everywhere() {
        let combined = combine_scores(&[0.0, 0.0], &[5, 10], 0.5, 0.5);
        assert!((combined[0] - 0.25).abs() < 1e-6);
        assert!((combined[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_combine_empty() {
        assert!(combine_scores(&[], &[], 0.5, 0.5).is_empty());
    }

    fn paper(id: &str, cited: &[&str]) -> Paper {
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
            cited_arxiv_ids: cited.iter().map(|s| s.to_string()).collect(),
            citation_count: None,
        }
    }

    #[tokio::test]
    async fn test_citation_authority_promotes_cited_paper() {
        let embedder = Arc::new(NgramEmbedder::new(64));
        let backend = Arc::new(MemoryBackend::new(embedder.clone()));

        // three papers; 00002 is cited by the other two
        backend
            .upsert_papers(&[
                paper("2301.00001", &["2301.00002"]),
                paper("2301.00002", &[]),
                paper("2301.00003", &["2301.00002"]),
            ])
            .await
            .unwrap();
        backend.materialize_citations("2301.00001").await.unwrap();
        backend.materialize_citations("2301.00003").await.unwrap();

        let chunks = vec![
            ChunkRecord {
                arxiv_id: "2301.00001".to_string(),
                seq: 0,
                text: "sparse attention mechanisms for long documents".to_string(),
            },
            ChunkRecord {
                arxiv_id: "2301.00002".to_string(),
                seq: 0,
                text: "attention mechanisms in neural networks".to_string(),
            },
            ChunkRecord {
                arxiv_id: "2301.00003".to_string(),
                seq: 0,
                text: "gradient descent convergence rates".to_string(),
            },
        ];
        let mut embeddings = Vec::new();
        for c in &chunks {
            embeddings.push(embedder.embed(&c.text).await.unwrap());
        }
        backend.index(&chunks, &embeddings).await.unwrap();

        let retriever = HybridRetriever::new(
            backend.clone(),
            backend,
            Arc::new(LexicalReranker::new()),
            2,
            0.5,
            0.5,
        );
        let results = retriever
            .retrieve("attention mechanisms", 2)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        // the cited paper wins: full relevance plus full authority
        assert_eq!(results[0].paper.arxiv_id, "2301.00002");
        assert!(results[0].hybrid_score.unwrap() >= results[1].hybrid_score.unwrap());
        assert!(results[0].rerank_score.is_some());
        assert!(results[0].rerank_rank.is_some());
    }

    /// Records the depth of every similarity search it serves
    struct DepthRecordingIndex {
        inner: Arc<MemoryBackend>,
        depths: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl VectorIndex for DepthRecordingIndex {
        async fn index(
            &self,
            chunks: &[ChunkRecord],
            embeddings: &[Vec<f32>],
        ) -> Result<()> {
            self.inner.index(chunks, embeddings).await
        }

        async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ChunkHit>> {
            self.depths.lock().unwrap().push(k);
            self.inner.similarity_search(query, k).await
        }
    }

    /// Records the pool size of every rerank call
    struct PoolRecordingReranker {
        inner: LexicalReranker,
        pools: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl Reranker for PoolRecordingReranker {
        async fn rerank(
            &self,
            query: &str,
            texts: &[String],
            top_n: usize,
        ) -> Result<Vec<RerankResult>> {
            self.pools.lock().unwrap().push(top_n);
            self.inner.rerank(query, texts, top_n).await
        }
    }

    #[tokio::test]
    async fn test_vector_stage_runs_at_double_rerank_depth() {
        let embedder = Arc::new(NgramEmbedder::new(64));
        let backend = Arc::new(MemoryBackend::new(embedder.clone()));

        let papers: Vec<Paper> = (1..=5)
            .map(|i| paper(&format!("2301.0000{i}"), &[]))
            .collect();
        backend.upsert_papers(&papers).await.unwrap();
        let chunks: Vec<ChunkRecord> = papers
            .iter()
            .map(|p| ChunkRecord {
                arxiv_id: p.arxiv_id.clone(),
                seq: 0,
                text: format!("shared topic text for {}", p.arxiv_id),
            })
            .collect();
        let mut embeddings = Vec::new();
        for c in &chunks {
            embeddings.push(embedder.embed(&c.text).await.unwrap());
        }
        backend.index(&chunks, &embeddings).await.unwrap();

        let index = Arc::new(DepthRecordingIndex {
            inner: backend.clone(),
            depths: Mutex::new(Vec::new()),
        });
        let reranker = Arc::new(PoolRecordingReranker {
            inner: LexicalReranker::new(),
            pools: Mutex::new(Vec::new()),
        });
        let retriever = HybridRetriever::new(
            index.clone(),
            backend,
            reranker.clone(),
            2,
            0.5,
            0.5,
        );

        let results = retriever.retrieve("shared topic", 2).await.unwrap();

        // the vector stage fetches double the rerank pool, which the
        // reranker then prunes back to before the blend
        assert_eq!(index.depths.lock().unwrap().as_slice(), &[8]);
        assert_eq!(reranker.pools.lock().unwrap().as_slice(), &[4]);
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_index_yields_empty() {
        let embedder = Arc::new(NgramEmbedder::new(64));
        let backend = Arc::new(MemoryBackend::new(embedder));
        let retriever = HybridRetriever::new(
            backend.clone(),
            backend,
            Arc::new(LexicalReranker::new()),
            2,
            0.5,
            0.5,
        );
        assert!(retriever.retrieve("query", 5).await.unwrap().is_empty());
    }
}
