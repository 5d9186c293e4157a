//! Paper record builder
//!
//! Composes the source client, PDF extraction and citation extraction
//! into complete paper records. No retries here; callers decide what a
//! failed paper means.

use async_trait::async_trait;
use citegraph_common::errors::{AppError, Result};
use citegraph_common::models::Paper;
use tracing::debug;

use crate::citations::extract_citations;
use crate::pdf;
use crate::source::PaperSource;

/// Anything that can turn an arXiv id into a complete paper record
#[async_trait]
pub trait RecordBuilder: Send + Sync {
    async fn build(&self, arxiv_id: &str) -> Result<Paper>;
}

/// Builds full paper records from an external source
pub struct PaperBuilder<S> {
    source: S,
}

impl<S: PaperSource> PaperBuilder<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch metadata and full text for one arXiv id and assemble a
    /// complete record.
    ///
    /// Fails with ResourceNotFound when the provider response carries
    /// no PDF link and with Parse when no text can be extracted.
    pub async fn build(&self, arxiv_id: &str) -> Result<Paper> {
        let meta = self.source.fetch_metadata(arxiv_id).await?;

        let pdf_link = meta.pdf_link.ok_or_else(|| AppError::ResourceNotFound {
            resource: "pdf link".into(),
            id: meta.arxiv_id.clone(),
        })?;

        let bytes = self.source.fetch_pdf(&pdf_link).await?;
        let full_text = pdf::extract_text(&bytes)?;
        let cited_arxiv_ids = extract_citations(&full_text, &meta.arxiv_id);

        debug!(
            arxiv_id = %meta.arxiv_id,
            text_len = full_text.len(),
            cited = cited_arxiv_ids.len(),
            "Paper record built"
        );

        Ok(Paper {
            arxiv_id: meta.arxiv_id,
            title: meta.title,
            summary: meta.summary,
            authors: meta.authors,
            categories: meta.categories,
            published: meta.published,
            abs_link: meta.abs_link,
            pdf_link,
            full_text,
            cited_arxiv_ids,
            citation_count: None,
        })
    }
}

#[async_trait]
impl<S: PaperSource> RecordBuilder for PaperBuilder<S> {
    async fn build(&self, arxiv_id: &str) -> Result<Paper> {
        PaperBuilder::build(self, arxiv_id).await
    }
}
