//! CiteGraph ingestion library
//!
//! Turns arXiv ids into a populated knowledge graph: paper records
//! with author, category and citation edges, plus embedded text chunks
//! in the vector index.

pub mod builder;
pub mod chunker;
pub mod citations;
pub mod engine;
pub mod pdf;
pub mod source;

pub use builder::{PaperBuilder, RecordBuilder};
pub use engine::{IngestionEngine, IngestionReport};
pub use source::{ArxivClient, PaperMeta, PaperSource};
