//! CiteGraph common library
//!
//! Shared foundations for the ingestion, search and context crates:
//! - Domain models (papers, authors, categories, chunks, citations)
//! - Graph store and vector index abstractions with Postgres and
//!   in-memory backends
//! - Embedding, rerank and language model clients
//! - Configuration and the shared error taxonomy

pub mod config;
pub mod embeddings;
pub mod errors;
pub mod graph;
pub mod llm;
pub mod models;
pub mod rerank;
pub mod vector;

pub use config::AppConfig;
pub use errors::{AppError, ErrorCode, Result};
pub use graph::{wait_for_store, GraphStore, MemoryBackend, PostgresStore};
pub use models::{
    taxonomy, Author, Category, ChunkRecord, CitationLink, CitationNeighborhood, Paper,
};
pub use vector::{ChunkHit, VectorIndex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
