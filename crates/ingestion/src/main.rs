//! Ingestion binary
//!
//! Usage: ingest [ARXIV_ID ...]
//! Seeds come from the command line, falling back to
//! `ingestion.seed_ids` in configuration.

use std::sync::Arc;

use citegraph_common::config::AppConfig;
use citegraph_common::embeddings::create_embedder;
use citegraph_common::graph::PostgresStore;
use citegraph_ingestion::builder::PaperBuilder;
use citegraph_ingestion::engine::IngestionEngine;
use citegraph_ingestion::source::ArxivClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    let seeds: Vec<String> = {
        let args: Vec<String> = std::env::args().skip(1).collect();
        if args.is_empty() {
            config.ingestion.seed_ids.clone()
        } else {
            args
        }
    };
    if seeds.is_empty() {
        anyhow::bail!("no seed ids given; pass them as arguments or set ingestion.seed_ids");
    }

    info!(version = citegraph_common::VERSION, seeds = seeds.len(), "starting ingestion");

    let embedder = create_embedder(&config.embedding)?;
    let store = Arc::new(PostgresStore::connect(&config.store, embedder.clone()).await?);
    store.ensure_schema(embedder.dimension()).await?;

    let source = ArxivClient::new(&config.source)?;
    let engine = IngestionEngine::new(
        Arc::new(PaperBuilder::new(source)),
        store.clone(),
        store,
        embedder,
        config,
    );

    let report = engine.run(&seeds).await?;
    info!(
        discovered = report.papers_discovered,
        ingested = report.papers_ingested,
        failed = report.papers_failed,
        edges = report.citation_edges,
        chunks = report.chunks_indexed,
        purged = report.orphans_purged,
        "ingestion finished"
    );

    Ok(())
}
