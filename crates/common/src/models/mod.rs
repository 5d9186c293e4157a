//! Domain models shared across the workspace
//!
//! These are the records that flow between the ingestion engine, the
//! graph store and the retrievers. Storage backends map them onto
//! their own schemas.

pub mod taxonomy;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use taxonomy::taxonomy;

/// A fully assembled paper record, ready for upsert.
///
/// `arxiv_id` is the external identifier and the sole identity key.
/// `cited_arxiv_ids` holds raw citation targets extracted from the full
/// text; they become edges only once the cited paper itself exists in
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub arxiv_id: String,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published: NaiveDate,
    pub abs_link: String,
    pub pdf_link: String,
    /// Extracted document text; the builder fills it, read paths leave
    /// it empty
    #[serde(default)]
    pub full_text: String,
    /// Deduplicated, order-preserving, never contains `arxiv_id` itself
    pub cited_arxiv_ids: Vec<String>,
    /// Incoming citation count; populated on read paths, not by the builder
    #[serde(default)]
    pub citation_count: Option<u64>,
}

impl Paper {
    /// Whether this paper's extracted citations include `other_id`
    pub fn cites(&self, other_id: &str) -> bool {
        self.cited_arxiv_ids.iter().any(|c| c == other_id)
    }
}

/// An author as stored in the graph.
///
/// Authors are identified by display name. Two people sharing a name
/// collapse into one node and one person published under name variants
/// splits into several. Accepted limitation of the source metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    /// Number of papers this author node is linked to
    pub paper_count: u64,
}

/// A node in the subject classification taxonomy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub code: String,
    pub title: String,
    pub description: String,
}

/// One text chunk of a paper's full text.
///
/// `seq` is the zero-based position of the chunk within its paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub arxiv_id: String,
    pub seq: usize,
    pub text: String,
}

/// A directed citation edge between two stored papers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitationLink {
    pub citing: String,
    pub cited: String,
}

/// Papers citing a target, split by distance.
///
/// `first_order` cite the target directly; `second_order` cite a
/// first-order paper but not the target itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationNeighborhood {
    pub first_order: Vec<Paper>,
    pub second_order: Vec<Paper>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_paper() -> Paper {
        Paper {
            arxiv_id: "2301.00001".to_string(),
            title: "A Paper".to_string(),
            summary: "Summary text".to_string(),
            authors: vec!["A. Author".to_string()],
            categories: vec!["cs.LG".to_string()],
            published: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            abs_link: "https://arxiv.org/abs/2301.00001".to_string(),
            pdf_link: "https://arxiv.org/pdf/2301.00001".to_string(),
            full_text: "Body text".to_string(),
            cited_arxiv_ids: vec!["2210.12345".to_string()],
            citation_count: None,
        }
    }

    #[test]
    fn test_cites() {
        let p = sample_paper();
        assert!(p.cites("2210.12345"));
        assert!(!p.cites("2301.00001"));
    }

    #[test]
    fn test_paper_serde_roundtrip() {
        let p = sample_paper();
        let json = serde_json::to_string(&p).unwrap();
        let back: Paper = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_citation_count_defaults_to_none() {
        // older serialized records lack the field
        let json = r#"{
            "arxiv_id": "2301.00001",
            "title": "A Paper",
            "summary": "s",
            "authors": [],
            "categories": [],
            "published": "2023-01-03",
            "abs_link": "a",
            "pdf_link": "p",
            "cited_arxiv_ids": []
        }"#;
        let p: Paper = serde_json::from_str(json).unwrap();
        assert_eq!(p.citation_count, None);
    }
}
