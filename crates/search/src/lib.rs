//! CiteGraph search library
//!
//! Retrieval over the ingested corpus: vector similarity, reranked,
//! and citation-aware hybrid strategies behind a common trait.

pub mod retrieval;

pub use retrieval::{
    HybridRetriever, RerankRetriever, RetrievedChunk, Retriever, VectorRetriever,
};
