//! Graph store abstraction
//!
//! The graph store holds papers, authors, categories, chunks and the
//! citation edges between papers. Callers depend on the query contract
//! here, not on any particular backend.

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::{Author, Category, CitationLink, CitationNeighborhood, Paper};

pub use memory::MemoryBackend;
pub use postgres::PostgresStore;

/// Knowledge graph operations over paper metadata and citations
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Cheap liveness probe
    async fn ping(&self) -> Result<()>;

    /// Seed the category taxonomy. Idempotent; existing codes are left
    /// untouched.
    async fn seed_categories(&self, categories: &[Category]) -> Result<()>;

    /// Upsert a batch of papers atomically.
    ///
    /// Identity is `arxiv_id`. A paper that already exists keeps its
    /// stored attributes; only missing author and category links are
    /// added. Either every paper in the batch commits or none do.
    async fn upsert_papers(&self, papers: &[Paper]) -> Result<()>;

    /// Materialize citation edges from `arxiv_id` to every raw cited id
    /// that resolves to a stored paper. Unresolved ids are skipped, not
    /// recorded. Returns the number of edges now present for the paper.
    async fn materialize_citations(&self, arxiv_id: &str) -> Result<u64>;

    /// Fetch papers by id, with `citation_count` populated. Unknown ids
    /// are omitted from the result.
    async fn get_papers(&self, ids: &[String]) -> Result<Vec<Paper>>;

    /// Papers citing `arxiv_id`, most-cited first
    async fn citing_papers(&self, arxiv_id: &str) -> Result<Vec<Paper>>;

    /// Authors of `arxiv_id`, ordered by how many stored papers they
    /// authored, descending
    async fn top_authors(&self, arxiv_id: &str) -> Result<Vec<Author>>;

    /// Direct citers of `arxiv_id` plus papers citing those citers.
    /// A paper citing both the target and a direct citer appears only
    /// in `first_order`.
    async fn cited_by_neighborhood(&self, arxiv_id: &str) -> Result<CitationNeighborhood>;

    /// Citation edges where both endpoints are in `ids`
    async fn induced_subgraph(&self, ids: &[String]) -> Result<Vec<CitationLink>>;

    /// Attach stored chunks to their papers. Returns the number of
    /// chunks linked in this pass.
    async fn link_chunks(&self) -> Result<u64>;

    /// Delete chunks whose paper does not exist. Returns the number of
    /// chunks removed.
    async fn purge_orphan_chunks(&self) -> Result<u64>;

    /// Total number of stored chunks
    async fn chunk_count(&self) -> Result<u64>;
}

/// Block until the store answers a ping, probing at a fixed interval.
///
/// Returns StoreUnavailable once `max_retries` probes have failed.
pub async fn wait_for_store(
    store: &dyn GraphStore,
    max_retries: u32,
    interval: Duration,
) -> Result<()> {
    let mut last_error = String::new();

    for attempt in 1..=max_retries {
        match store.ping().await {
            Ok(()) => {
                info!(attempt, "graph store is up");
                return Ok(());
            }
            Err(err) => {
                last_error = err.to_string();
                warn!(
                    attempt,
                    max_retries,
                    error = %last_error,
                    "graph store not ready, retrying"
                );
            }
        }
        if attempt < max_retries {
            tokio::time::sleep(interval).await;
        }
    }

    Err(AppError::StoreUnavailable {
        attempts: max_retries,
        message: last_error,
    })
}
