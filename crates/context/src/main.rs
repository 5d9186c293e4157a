//! Question answering binary
//!
//! Usage: ask "QUESTION"
//! Answers one question over the ingested corpus with the hybrid
//! retriever, then prints the follow-up paper summary.

use std::sync::Arc;

use citegraph_common::config::AppConfig;
use citegraph_common::embeddings::create_embedder;
use citegraph_common::graph::PostgresStore;
use citegraph_common::llm::OpenAiCompatModel;
use citegraph_common::rerank::create_reranker;
use citegraph_context::session::{RagSession, SessionOptions};
use citegraph_search::retrieval::HybridRetriever;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let question = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: ask \"QUESTION\""))?;

    let config = AppConfig::load()?;

    let embedder = create_embedder(&config.embedding)?;
    let store = Arc::new(PostgresStore::connect(&config.store, embedder).await?);
    let reranker = create_reranker(&config.rerank)?;
    let llm = Arc::new(OpenAiCompatModel::new(&config.llm)?);

    let retriever = Arc::new(HybridRetriever::new(
        store.clone(),
        store.clone(),
        reranker,
        config.retrieval.oversample,
        config.retrieval.rerank_weight,
        config.retrieval.citation_weight,
    ));

    let options = SessionOptions {
        top_k: config.retrieval.top_k,
        bos_token: config.llm.bos_token.clone(),
        ..SessionOptions::default()
    };
    let mut session = RagSession::new(llm, retriever, store, options);

    let answer = session.ask(&question).await?;
    println!("{answer}");

    if !session.used_papers().is_empty() {
        let summary = session.follow_up().await?;
        println!("\n--- Papers used ---\n{summary}");
    }

    Ok(())
}
