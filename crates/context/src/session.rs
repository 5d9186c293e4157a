//! Answer session
//!
//! Orchestrates one conversation turn: retrieve chunks, render the
//! grounding prompt, generate, and remember which papers the answer
//! used. A follow-up turn enriches those papers with graph context
//! (citing papers and top authors) and summarizes them.

use std::sync::Arc;

use citegraph_common::errors::Result;
use citegraph_common::graph::GraphStore;
use citegraph_common::llm::LanguageModel;
use citegraph_search::retrieval::Retriever;
use regex_lite::Regex;
use tracing::debug;

use crate::prompts;

const ARXIV_ID_PATTERN: &str = r"\d{4}\.\d{4,5}";

/// Session parameters
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Chunks retrieved per question
    pub top_k: usize,
    /// Token prepended to every rendered prompt
    pub bos_token: String,
    /// Citing papers and authors listed per paper in follow-ups
    pub related_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            bos_token: "<|begin_of_text|>".to_string(),
            related_limit: 3,
        }
    }
}

/// One conversation over the corpus
pub struct RagSession {
    llm: Arc<dyn LanguageModel>,
    retriever: Arc<dyn Retriever>,
    store: Arc<dyn GraphStore>,
    options: SessionOptions,
    used_papers: Vec<String>,
}

impl RagSession {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        retriever: Arc<dyn Retriever>,
        store: Arc<dyn GraphStore>,
        options: SessionOptions,
    ) -> Self {
        Self {
            llm,
            retriever,
            store,
            options,
            used_papers: Vec::new(),
        }
    }

    /// Ids the last answer claimed to use
    pub fn used_papers(&self) -> &[String] {
        &self.used_papers
    }

    /// Answer a question grounded in retrieved chunks.
    ///
    /// Every retrieved chunk contributes to the context, labelled with
    /// its paper's arXiv id. The answer text is scanned for ids, which
    /// become the session's used-paper set.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let chunks = self.retriever.retrieve(question, self.options.top_k).await?;

        let mut context = String::new();
        for chunk in &chunks {
            context.push_str(&format!("Document:{}\n", chunk.text));
            context.push_str(&format!("Document arXiv ID: {}\n", chunk.paper.arxiv_id));
            context.push_str("\n\n");
        }
        debug!(chunks = chunks.len(), context_len = context.len(), "context assembled");

        let prompt = prompts::render_initial(&self.options.bos_token, &context, question);
        let answer = self.llm.generate(&prompt).await?;

        self.used_papers = extract_ids(&answer);
        debug!(used = self.used_papers.len(), "answer references parsed");

        Ok(answer)
    }

    /// Summarize the papers the last answer used, enriched with citing
    /// papers and top authors from the graph. Clears the used-paper
    /// set.
    pub async fn follow_up(&mut self) -> Result<String> {
        let papers = self.store.get_papers(&self.used_papers).await?;

        let mut context = String::new();
        for (i, paper) in papers.iter().enumerate() {
            let related: Vec<String> = self
                .store
                .citing_papers(&paper.arxiv_id)
                .await?
                .into_iter()
                .take(self.options.related_limit)
                .map(|p| format!("{}({})", p.title, p.arxiv_id))
                .collect();
            let authors: Vec<String> = self
                .store
                .top_authors(&paper.arxiv_id)
                .await?
                .into_iter()
                .take(self.options.related_limit)
                .map(|a| a.name)
                .collect();

            context.push_str(&format!("Information for Paper {}:\n", i + 1));
            context.push_str(&format!("Paper Title:{}\n", paper.title));
            context.push_str(&format!("Paper Summary: {}\n", paper.summary));
            context.push_str(&format!("Related Papers: {}\n", related.join(", ")));
            context.push_str(&format!("Top Authors: {}\n", authors.join(", ")));
            context.push_str("\n\n");
        }

        let prompt = prompts::render_followup(&self.options.bos_token, &context);
        let summary = self.llm.generate(&prompt).await?;

        self.used_papers.clear();
        Ok(summary)
    }
}

/// Extract arXiv ids from answer text, deduplicated in first-seen
/// order
fn extract_ids(text: &str) -> Vec<String> {
    let re = match Regex::new(ARXIV_ID_PATTERN) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };
    let mut seen = std::collections::HashSet::new();
    let mut ids = Vec::new();
    for m in re.find_iter(text) {
        let id = m.as_str().to_string();
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    ids
}
