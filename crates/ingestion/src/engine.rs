//! Graph ingestion engine
//!
//! Drives a whole ingestion run: liveness gate, taxonomy seeding,
//! closure discovery, batched upserts, citation materialization,
//! chunk indexing and orphan cleanup. Batches that fail are retried
//! one item at a time so a single bad record never sinks its batch.

use std::collections::HashSet;
use std::sync::Arc;

use citegraph_common::config::AppConfig;
use citegraph_common::embeddings::Embedder;
use citegraph_common::errors::Result;
use citegraph_common::graph::{wait_for_store, GraphStore};
use citegraph_common::models::{taxonomy, ChunkRecord, Paper};
use citegraph_common::vector::VectorIndex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::builder::RecordBuilder;
use crate::chunker::chunk_text;

/// Counters for one ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Unique ids the run attempted to build
    pub papers_discovered: usize,
    /// Papers committed to the graph store
    pub papers_ingested: usize,
    /// Papers that failed to build or to upsert
    pub papers_failed: usize,
    /// Citation edges present after materialization
    pub citation_edges: u64,
    /// Chunks written to the vector index
    pub chunks_indexed: usize,
    /// Chunks that failed to embed or index
    pub chunks_failed: usize,
    /// Orphan chunks removed at the end of the run
    pub orphans_purged: u64,
    /// Chunks in the index after cleanup
    pub chunk_count: u64,
}

/// End-to-end ingestion over a store, an index and an embedder
pub struct IngestionEngine {
    builder: Arc<dyn RecordBuilder>,
    store: Arc<dyn GraphStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    config: AppConfig,
}

impl IngestionEngine {
    pub fn new(
        builder: Arc<dyn RecordBuilder>,
        store: Arc<dyn GraphStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        config: AppConfig,
    ) -> Self {
        Self {
            builder,
            store,
            index,
            embedder,
            config,
        }
    }

    /// Ingest the seed papers and every paper they cite.
    ///
    /// Discovery goes one level deep: cited papers are ingested, but
    /// their citations are only recorded as raw ids.
    pub async fn run(&self, seeds: &[String]) -> Result<IngestionReport> {
        let mut report = IngestionReport::default();

        wait_for_store(
            self.store.as_ref(),
            self.config.store.liveness_retries,
            self.config.liveness_interval(),
        )
        .await?;

        self.store.seed_categories(&taxonomy()).await?;
        info!("category taxonomy seeded");

        let papers = self.discover(seeds, &mut report).await;
        info!(
            discovered = report.papers_discovered,
            built = papers.len(),
            "paper discovery complete"
        );

        let ingested = self.upsert_batched(&papers, &mut report).await;

        for id in &ingested {
            match self.store.materialize_citations(id).await {
                Ok(edges) => report.citation_edges += edges,
                Err(e) => warn!(arxiv_id = %id, error = %e, "citation materialization failed"),
            }
        }
        info!(edges = report.citation_edges, "citation edges materialized");

        let ingested_set: HashSet<&String> = ingested.iter().collect();
        let chunks = self.chunk_papers(
            papers
                .iter()
                .filter(|p| ingested_set.contains(&p.arxiv_id)),
            &mut report,
        );
        self.index_batched(chunks, &mut report).await;

        let linked = self.store.link_chunks().await?;
        report.orphans_purged = self.store.purge_orphan_chunks().await?;
        report.chunk_count = self.store.chunk_count().await?;
        info!(
            linked,
            purged = report.orphans_purged,
            total = report.chunk_count,
            "chunk linking complete"
        );

        Ok(report)
    }

    /// Build the seeds, then one level of cited papers
    async fn discover(&self, seeds: &[String], report: &mut IngestionReport) -> Vec<Paper> {
        let mut built: Vec<Paper> = Vec::new();
        let mut attempted: HashSet<String> = HashSet::new();

        for id in seeds {
            if attempted.insert(id.clone()) {
                self.build_one(id, &mut built, report).await;
            }
        }

        let cited: Vec<String> = built
            .iter()
            .flat_map(|p| p.cited_arxiv_ids.iter().cloned())
            .collect();
        for id in cited {
            if attempted.insert(id.clone()) {
                self.build_one(&id, &mut built, report).await;
            }
        }

        report.papers_discovered = attempted.len();
        built
    }

    async fn build_one(&self, id: &str, built: &mut Vec<Paper>, report: &mut IngestionReport) {
        match self.builder.build(id).await {
            Ok(paper) => built.push(paper),
            Err(e) => {
                warn!(arxiv_id = %id, error = %e, "failed to build paper, skipping");
                report.papers_failed += 1;
            }
        }
    }

    /// Upsert in batches; a failed batch degrades to singleton upserts
    async fn upsert_batched(&self, papers: &[Paper], report: &mut IngestionReport) -> Vec<String> {
        let mut ingested = Vec::new();

        for batch in papers.chunks(self.config.ingestion.paper_batch_size.max(1)) {
            match self.store.upsert_papers(batch).await {
                Ok(()) => {
                    ingested.extend(batch.iter().map(|p| p.arxiv_id.clone()));
                }
                Err(e) => {
                    warn!(
                        batch_size = batch.len(),
                        error = %e,
                        "batch upsert failed, retrying papers one at a time"
                    );
                    for paper in batch {
                        match self.store.upsert_papers(std::slice::from_ref(paper)).await {
                            Ok(()) => ingested.push(paper.arxiv_id.clone()),
                            Err(e) => {
                                warn!(arxiv_id = %paper.arxiv_id, error = %e, "paper upsert failed");
                                report.papers_failed += 1;
                            }
                        }
                    }
                }
            }
        }

        report.papers_ingested = ingested.len();
        ingested
    }

    fn chunk_papers<'a>(
        &self,
        papers: impl Iterator<Item = &'a Paper>,
        report: &mut IngestionReport,
    ) -> Vec<ChunkRecord> {
        let mut chunks = Vec::new();
        for paper in papers {
            match chunk_text(
                &paper.arxiv_id,
                &paper.full_text,
                self.config.ingestion.chunk_size,
                self.config.ingestion.chunk_overlap,
            ) {
                Ok(mut paper_chunks) => chunks.append(&mut paper_chunks),
                Err(e) => {
                    warn!(arxiv_id = %paper.arxiv_id, error = %e, "chunking failed");
                    report.chunks_failed += 1;
                }
            }
        }
        chunks
    }

    /// Embed and index in batches with the same singleton fallback
    async fn index_batched(&self, chunks: Vec<ChunkRecord>, report: &mut IngestionReport) {
        for batch in chunks.chunks(self.config.ingestion.chunk_batch_size.max(1)) {
            match self.index_chunks(batch).await {
                Ok(()) => report.chunks_indexed += batch.len(),
                Err(e) => {
                    warn!(
                        batch_size = batch.len(),
                        error = %e,
                        "chunk batch failed, retrying one at a time"
                    );
                    for chunk in batch {
                        match self.index_chunks(std::slice::from_ref(chunk)).await {
                            Ok(()) => report.chunks_indexed += 1,
                            Err(e) => {
                                warn!(
                                    arxiv_id = %chunk.arxiv_id,
                                    seq = chunk.seq,
                                    error = %e,
                                    "chunk indexing failed"
                                );
                                report.chunks_failed += 1;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn index_chunks(&self, batch: &[ChunkRecord]) -> Result<()> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        self.index.index(batch, &embeddings).await
    }
}
