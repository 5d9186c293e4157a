//! In-memory backend
//!
//! One struct backing both the graph store and the vector index, used
//! by tests and local experiments. Mirrors the query contract of the
//! real backend closely enough that engine-level tests run against it
//! without a database.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embeddings::Embedder;
use crate::errors::{AppError, Result};
use crate::models::{Author, Category, ChunkRecord, CitationLink, CitationNeighborhood, Paper};
use crate::vector::{ChunkHit, VectorIndex};

use super::GraphStore;

#[derive(Debug, Clone)]
struct StoredChunk {
    record: ChunkRecord,
    embedding: Vec<f32>,
    linked: bool,
}

#[derive(Default)]
struct State {
    papers: HashMap<String, Paper>,
    categories: HashMap<String, Category>,
    /// author name -> papers linked to that author
    authors: HashMap<String, HashSet<String>>,
    /// (citing, cited)
    citations: HashSet<(String, String)>,
    chunks: Vec<StoredChunk>,
}

/// Graph store and vector index over process memory
pub struct MemoryBackend {
    state: RwLock<State>,
    embedder: Arc<dyn Embedder>,
}

impl MemoryBackend {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            embedder,
        }
    }

    fn lock_err() -> AppError {
        AppError::Store {
            message: "memory backend lock poisoned".into(),
        }
    }

    fn incoming_count(state: &State, arxiv_id: &str) -> u64 {
        state
            .citations
            .iter()
            .filter(|(_, cited)| cited == arxiv_id)
            .count() as u64
    }

    fn paper_with_count(state: &State, arxiv_id: &str) -> Option<Paper> {
        state.papers.get(arxiv_id).map(|p| {
            let mut p = p.clone();
            p.citation_count = Some(Self::incoming_count(state, arxiv_id));
            p
        })
    }

    fn direct_citers(state: &State, arxiv_id: &str) -> Vec<String> {
        state
            .citations
            .iter()
            .filter(|(_, cited)| cited == arxiv_id)
            .map(|(citing, _)| citing.clone())
            .collect()
    }
}

#[async_trait]
impl GraphStore for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn seed_categories(&self, categories: &[Category]) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Self::lock_err())?;
        for c in categories {
            state
                .categories
                .entry(c.code.clone())
                .or_insert_with(|| c.clone());
        }
        Ok(())
    }

    async fn upsert_papers(&self, papers: &[Paper]) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Self::lock_err())?;
        for paper in papers {
            // first write wins for attributes, links merge on every pass
            state
                .papers
                .entry(paper.arxiv_id.clone())
                .or_insert_with(|| {
                    let mut p = paper.clone();
                    p.full_text = String::new();
                    p.citation_count = None;
                    p
                });
            for code in &paper.categories {
                state
                    .categories
                    .entry(code.clone())
                    .or_insert_with(|| Category {
                        code: code.clone(),
                        title: code.clone(),
                        description: String::new(),
                    });
            }
            for name in &paper.authors {
                state
                    .authors
                    .entry(name.clone())
                    .or_default()
                    .insert(paper.arxiv_id.clone());
            }
        }
        Ok(())
    }

    async fn materialize_citations(&self, arxiv_id: &str) -> Result<u64> {
        let mut state = self.state.write().map_err(|_| Self::lock_err())?;
        let cited_ids = match state.papers.get(arxiv_id) {
            Some(p) => p.cited_arxiv_ids.clone(),
            None => return Ok(0),
        };
        for cited in cited_ids {
            if cited != arxiv_id && state.papers.contains_key(&cited) {
                state.citations.insert((arxiv_id.to_string(), cited));
            }
        }
        Ok(state
            .citations
            .iter()
            .filter(|(citing, _)| citing == arxiv_id)
            .count() as u64)
    }

    async fn get_papers(&self, ids: &[String]) -> Result<Vec<Paper>> {
        let state = self.state.read().map_err(|_| Self::lock_err())?;
        Ok(ids
            .iter()
            .filter_map(|id| Self::paper_with_count(&state, id))
            .collect())
    }

    async fn citing_papers(&self, arxiv_id: &str) -> Result<Vec<Paper>> {
        let state = self.state.read().map_err(|_| Self::lock_err())?;
        let mut papers: Vec<Paper> = Self::direct_citers(&state, arxiv_id)
            .iter()
            .filter_map(|id| Self::paper_with_count(&state, id))
            .collect();
        papers.sort_by(|a, b| {
            b.citation_count
                .cmp(&a.citation_count)
                .then_with(|| a.arxiv_id.cmp(&b.arxiv_id))
        });
        Ok(papers)
    }

    async fn top_authors(&self, arxiv_id: &str) -> Result<Vec<Author>> {
        let state = self.state.read().map_err(|_| Self::lock_err())?;
        let names = match state.papers.get(arxiv_id) {
            Some(p) => p.authors.clone(),
            None => return Ok(Vec::new()),
        };
        let mut authors: Vec<Author> = names
            .iter()
            .map(|name| Author {
                name: name.clone(),
                paper_count: state
                    .authors
                    .get(name)
                    .map(|papers| papers.len() as u64)
                    .unwrap_or(0),
            })
            .collect();
        authors.sort_by(|a, b| {
            b.paper_count
                .cmp(&a.paper_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(authors)
    }

    async fn cited_by_neighborhood(&self, arxiv_id: &str) -> Result<CitationNeighborhood> {
        let state = self.state.read().map_err(|_| Self::lock_err())?;
        let first_ids: Vec<String> = Self::direct_citers(&state, arxiv_id);
        let first_set: HashSet<&String> = first_ids.iter().collect();

        let mut second_ids: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for first in &first_ids {
            for citer in Self::direct_citers(&state, first) {
                if citer != arxiv_id && !first_set.contains(&citer) && seen.insert(citer.clone()) {
                    second_ids.push(citer);
                }
            }
        }

        Ok(CitationNeighborhood {
            first_order: first_ids
                .iter()
                .filter_map(|id| Self::paper_with_count(&state, id))
                .collect(),
            second_order: second_ids
                .iter()
                .filter_map(|id| Self::paper_with_count(&state, id))
                .collect(),
        })
    }

    async fn induced_subgraph(&self, ids: &[String]) -> Result<Vec<CitationLink>> {
        let state = self.state.read().map_err(|_| Self::lock_err())?;
        let id_set: HashSet<&String> = ids.iter().collect();
        Ok(state
            .citations
            .iter()
            .filter(|(citing, cited)| id_set.contains(citing) && id_set.contains(cited))
            .map(|(citing, cited)| CitationLink {
                citing: citing.clone(),
                cited: cited.clone(),
            })
            .collect())
    }

    async fn link_chunks(&self) -> Result<u64> {
        let mut state = self.state.write().map_err(|_| Self::lock_err())?;
        let known: HashSet<String> = state.papers.keys().cloned().collect();
        let mut linked = 0;
        for chunk in &mut state.chunks {
            if !chunk.linked && known.contains(&chunk.record.arxiv_id) {
                chunk.linked = true;
                linked += 1;
            }
        }
        Ok(linked)
    }

    async fn purge_orphan_chunks(&self) -> Result<u64> {
        let mut state = self.state.write().map_err(|_| Self::lock_err())?;
        let known: HashSet<String> = state.papers.keys().cloned().collect();
        let before = state.chunks.len();
        state.chunks.retain(|c| known.contains(&c.record.arxiv_id));
        Ok((before - state.chunks.len()) as u64)
    }

    async fn chunk_count(&self) -> Result<u64> {
        let state = self.state.read().map_err(|_| Self::lock_err())?;
        Ok(state.chunks.len() as u64)
    }
}

#[async_trait]
impl VectorIndex for MemoryBackend {
    async fn index(&self, chunks: &[ChunkRecord], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(AppError::Store {
                message: format!(
                    "chunk/embedding length mismatch: {} vs {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        let mut state = self.state.write().map_err(|_| Self::lock_err())?;
        for (record, embedding) in chunks.iter().zip(embeddings.iter()) {
            state.chunks.push(StoredChunk {
                record: record.clone(),
                embedding: embedding.clone(),
                linked: false,
            });
        }
        Ok(())
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<ChunkHit>> {
        // embed outside the lock
        let query_vec = self.embedder.embed(query).await?;

        let state = self.state.read().map_err(|_| Self::lock_err())?;
        let mut hits: Vec<ChunkHit> = state
            .chunks
            .iter()
            .map(|c| ChunkHit {
                arxiv_id: c.record.arxiv_id.clone(),
                text: c.record.text.clone(),
                score: cosine_similarity(&query_vec, &c.embedding),
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k);
        Ok(hits)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::NgramEmbedder;
    use chrono::NaiveDate;

    fn paper(id: &str, authors: &[&str], cited: &[&str]) -> Paper {
        Paper {
            arxiv_id: id.to_string(),
            title: format!("Paper {id}"),
            summary: format!("Summary of {id}"),
            authors: authors.iter().map(|s| s.to_string()).collect(),
            categories: vec!["cs.LG".to_string()],
            published: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            abs_link: format!("https://arxiv.org/abs/{id}"),
            pdf_link: format!("https://arxiv.org/pdf/{id}"),
            full_text: String::new(),
            cited_arxiv_ids: cited.iter().map(|s| s.to_string()).collect(),
            citation_count: None,
        }
    }

    fn backend() -> MemoryBackend {
        MemoryBackend::new(Arc::new(NgramEmbedder::new(64)))
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent_and_create_only() {
        let store = backend();
        let original = paper("2301.00001", &["Alice"], &[]);
        store.upsert_papers(&[original.clone()]).await.unwrap();

        let mut changed = original.clone();
        changed.title = "Renamed".to_string();
        changed.authors.push("Bob".to_string());
        store.upsert_papers(&[changed]).await.unwrap();

        let got = store
            .get_papers(&["2301.00001".to_string()])
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        // attributes keep the first write
        assert_eq!(got[0].title, "Paper 2301.00001");

        // the new author link was still added
        let authors = store.top_authors("2301.00001").await.unwrap();
        let names: Vec<&str> = authors.iter().map(|a| a.name.as_str()).collect();
        assert!(names.contains(&"Bob"));
    }

    #[tokio::test]
    async fn test_citations_only_resolve_to_stored_papers() {
        let store = backend();
        let a = paper("2301.00001", &["Alice"], &["2302.00002", "9999.99999", "2301.00001"]);
        let b = paper("2302.00002", &["Bob"], &[]);
        store.upsert_papers(&[a, b]).await.unwrap();

        let edges = store.materialize_citations("2301.00001").await.unwrap();
        assert_eq!(edges, 1);

        let citing = store.citing_papers("2302.00002").await.unwrap();
        assert_eq!(citing.len(), 1);
        assert_eq!(citing[0].arxiv_id, "2301.00001");

        // unresolved and self references produced no edges
        assert!(store.citing_papers("9999.99999").await.unwrap().is_empty());
        assert!(store.citing_papers("2301.00001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_materialize_is_idempotent() {
        let store = backend();
        let a = paper("2301.00001", &[], &["2302.00002"]);
        let b = paper("2302.00002", &[], &[]);
        store.upsert_papers(&[a, b]).await.unwrap();

        assert_eq!(store.materialize_citations("2301.00001").await.unwrap(), 1);
        assert_eq!(store.materialize_citations("2301.00001").await.unwrap(), 1);

        let got = store.get_papers(&["2302.00002".to_string()]).await.unwrap();
        assert_eq!(got[0].citation_count, Some(1));
    }

    #[tokio::test]
    async fn test_citing_papers_ordered_by_citation_count() {
        let store = backend();
        // both b and c cite a; c is itself cited by d, b is not
        let a = paper("1000.00001", &[], &[]);
        let b = paper("1000.00002", &[], &["1000.00001"]);
        let c = paper("1000.00003", &[], &["1000.00001"]);
        let d = paper("1000.00004", &[], &["1000.00003"]);
        store.upsert_papers(&[a, b, c, d]).await.unwrap();
        for id in ["1000.00002", "1000.00003", "1000.00004"] {
            store.materialize_citations(id).await.unwrap();
        }

        let citing = store.citing_papers("1000.00001").await.unwrap();
        assert_eq!(citing.len(), 2);
        assert_eq!(citing[0].arxiv_id, "1000.00003");
        assert_eq!(citing[0].citation_count, Some(1));
        assert_eq!(citing[1].arxiv_id, "1000.00002");
    }

    #[tokio::test]
    async fn test_top_authors_ordered_by_paper_count() {
        let store = backend();
        let p1 = paper("1000.00001", &["Prolific", "Quiet"], &[]);
        let p2 = paper("1000.00002", &["Prolific"], &[]);
        store.upsert_papers(&[p1, p2]).await.unwrap();

        let authors = store.top_authors("1000.00001").await.unwrap();
        assert_eq!(authors[0].name, "Prolific");
        assert_eq!(authors[0].paper_count, 2);
        assert_eq!(authors[1].name, "Quiet");
        assert_eq!(authors[1].paper_count, 1);
    }

    #[tokio::test]
    async fn test_neighborhood_orders_do_not_overlap() {
        let store = backend();
        // b cites a; c cites b; d cites both a and b
        let a = paper("1000.00001", &[], &[]);
        let b = paper("1000.00002", &[], &["1000.00001"]);
        let c = paper("1000.00003", &[], &["1000.00002"]);
        let d = paper("1000.00004", &[], &["1000.00001", "1000.00002"]);
        store.upsert_papers(&[a, b, c, d]).await.unwrap();
        for id in ["1000.00002", "1000.00003", "1000.00004"] {
            store.materialize_citations(id).await.unwrap();
        }

        let hood = store.cited_by_neighborhood("1000.00001").await.unwrap();
        let first: Vec<&str> = hood.first_order.iter().map(|p| p.arxiv_id.as_str()).collect();
        let second: Vec<&str> = hood.second_order.iter().map(|p| p.arxiv_id.as_str()).collect();
        assert!(first.contains(&"1000.00002"));
        assert!(first.contains(&"1000.00004"));
        // d cites both a and b, so it stays first-order only
        assert!(!second.contains(&"1000.00004"));
        assert_eq!(second, vec!["1000.00003"]);
    }

    #[tokio::test]
    async fn test_induced_subgraph_filters_both_endpoints() {
        let store = backend();
        let a = paper("1000.00001", &[], &[]);
        let b = paper("1000.00002", &[], &["1000.00001"]);
        let c = paper("1000.00003", &[], &["1000.00002"]);
        store.upsert_papers(&[a, b, c]).await.unwrap();
        store.materialize_citations("1000.00002").await.unwrap();
        store.materialize_citations("1000.00003").await.unwrap();

        let ids = vec!["1000.00001".to_string(), "1000.00002".to_string()];
        let edges = store.induced_subgraph(&ids).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].citing, "1000.00002");
        assert_eq!(edges[0].cited, "1000.00001");
    }

    #[tokio::test]
    async fn test_orphan_chunks_purged() {
        let store = backend();
        let a = paper("1000.00001", &[], &[]);
        store.upsert_papers(&[a]).await.unwrap();

        let chunks = vec![
            ChunkRecord {
                arxiv_id: "1000.00001".to_string(),
                seq: 0,
                text: "kept".to_string(),
            },
            ChunkRecord {
                arxiv_id: "9999.00001".to_string(),
                seq: 0,
                text: "orphan".to_string(),
            },
        ];
        let embeddings = vec![vec![0.1; 64], vec![0.2; 64]];
        store.index(&chunks, &embeddings).await.unwrap();

        assert_eq!(store.link_chunks().await.unwrap(), 1);
        assert_eq!(store.purge_orphan_chunks().await.unwrap(), 1);
        assert_eq!(store.chunk_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_similarity_search_returns_closest_first() {
        let store = backend();
        let chunks = vec![
            ChunkRecord {
                arxiv_id: "1000.00001".to_string(),
                seq: 0,
                text: "graph neural networks for citation analysis".to_string(),
            },
            ChunkRecord {
                arxiv_id: "1000.00002".to_string(),
                seq: 0,
                text: "stellar formation in dwarf galaxies".to_string(),
            },
        ];
        let embedder = NgramEmbedder::new(64);
        let mut embeddings = Vec::new();
        for c in &chunks {
            embeddings.push(embedder.embed(&c.text).await.unwrap());
        }
        store.index(&chunks, &embeddings).await.unwrap();

        let hits = store
            .similarity_search("citation graph neural networks", 2)
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].arxiv_id, "1000.00001");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
