//! Configuration management for CiteGraph services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Graph/vector store configuration
    pub store: StoreConfig,

    /// Paper source (arXiv export API) configuration
    pub source: SourceConfig,

    /// Ingestion engine configuration
    pub ingestion: IngestionConfig,

    /// Retrieval configuration
    pub retrieval: RetrievalConfig,

    /// Embedding service configuration
    pub embedding: EmbeddingConfig,

    /// Reranker service configuration
    pub rerank: RerankConfig,

    /// Language model configuration
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Liveness probes before giving up on a cold store
    #[serde(default = "default_liveness_retries")]
    pub liveness_retries: u32,

    /// Seconds between liveness probes
    #[serde(default = "default_liveness_interval")]
    pub liveness_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Request timeout in seconds (PDF downloads can be slow)
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// User agent sent to the export API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Papers per upsert batch
    #[serde(default = "default_paper_batch_size")]
    pub paper_batch_size: usize,

    /// Chunks per insert batch
    #[serde(default = "default_chunk_batch_size")]
    pub chunk_batch_size: usize,

    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Character overlap between adjacent chunks
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Seed arXiv identifiers to ingest
    #[serde(default)]
    pub seed_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// Number of chunks returned to the caller
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Weight of the normalized rerank score in the hybrid blend
    #[serde(default = "default_rerank_weight")]
    pub rerank_weight: f32,

    /// Weight of the normalized citation count in the hybrid blend
    #[serde(default = "default_citation_weight")]
    pub citation_weight: f32,

    /// Candidate multiplier for rerank and hybrid retrieval (fetch
    /// oversample * top_k from the vector index before reranking)
    #[serde(default = "default_oversample")]
    pub oversample: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: remote, ngram
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API base URL (OpenAI-compatible /embeddings endpoint)
    pub endpoint: Option<String>,

    /// API key for the embedding service
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RerankConfig {
    /// Reranker provider: remote, lexical
    #[serde(default = "default_rerank_provider")]
    pub provider: String,

    /// API base URL (POST /rerank)
    pub endpoint: Option<String>,

    /// API key for the rerank service
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_rerank_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_rerank_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// API base URL (OpenAI-compatible /completions endpoint)
    pub endpoint: Option<String>,

    /// API key for the model endpoint
    pub api_key: Option<String>,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Stop token appended to requests
    #[serde(default = "default_stop_token")]
    pub stop_token: String,

    /// Beginning-of-sequence token prepended to rendered prompts
    #[serde(default = "default_bos_token")]
    pub bos_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_max_connections() -> u32 { 20 }
fn default_connect_timeout() -> u64 { 10 }
fn default_liveness_retries() -> u32 { 10 }
fn default_liveness_interval() -> u64 { 10 }
fn default_source_timeout() -> u64 { 120 }
fn default_user_agent() -> String { "citegraph/0.1".to_string() }
fn default_paper_batch_size() -> usize { 10 }
fn default_chunk_batch_size() -> usize { 50 }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 20 }
fn default_top_k() -> usize { 5 }
fn default_rerank_weight() -> f32 { 0.5 }
fn default_citation_weight() -> f32 { 0.5 }
fn default_oversample() -> usize { 2 }
fn default_embedding_provider() -> String { "remote".to_string() }
fn default_embedding_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_embedding_dimension() -> usize { 384 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_rerank_provider() -> String { "remote".to_string() }
fn default_rerank_model() -> String { "mxbai-rerank-large-v1".to_string() }
fn default_rerank_timeout() -> u64 { 30 }
fn default_llm_model() -> String { "meta-llama-3-8b-instruct".to_string() }
fn default_max_tokens() -> u32 { 2048 }
fn default_temperature() -> f32 { 0.3 }
fn default_stop_token() -> String { "<|eot_id|>".to_string() }
fn default_bos_token() -> String { "<|begin_of_text|>".to_string() }
fn default_llm_timeout() -> u64 { 120 }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("store.url", "postgres://localhost/citegraph")?

            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__STORE__URL=postgres://db/citegraph
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get the liveness probe interval as Duration
    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.store.liveness_interval_secs)
    }

    /// Get the paper source timeout as Duration
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                url: "postgres://localhost/citegraph".to_string(),
                max_connections: default_max_connections(),
                connect_timeout_secs: default_connect_timeout(),
                liveness_retries: default_liveness_retries(),
                liveness_interval_secs: default_liveness_interval(),
            },
            source: SourceConfig {
                timeout_secs: default_source_timeout(),
                user_agent: default_user_agent(),
            },
            ingestion: IngestionConfig {
                paper_batch_size: default_paper_batch_size(),
                chunk_batch_size: default_chunk_batch_size(),
                chunk_size: default_chunk_size(),
                chunk_overlap: default_chunk_overlap(),
                seed_ids: Vec::new(),
            },
            retrieval: RetrievalConfig {
                top_k: default_top_k(),
                rerank_weight: default_rerank_weight(),
                citation_weight: default_citation_weight(),
                oversample: default_oversample(),
            },
            embedding: EmbeddingConfig {
                provider: default_embedding_provider(),
                endpoint: None,
                api_key: None,
                model: default_embedding_model(),
                dimension: default_embedding_dimension(),
                timeout_secs: default_embedding_timeout(),
                max_retries: default_embedding_retries(),
            },
            rerank: RerankConfig {
                provider: default_rerank_provider(),
                endpoint: None,
                api_key: None,
                model: default_rerank_model(),
                timeout_secs: default_rerank_timeout(),
            },
            llm: LlmConfig {
                endpoint: None,
                api_key: None,
                model: default_llm_model(),
                max_tokens: default_max_tokens(),
                temperature: default_temperature(),
                stop_token: default_stop_token(),
                bos_token: default_bos_token(),
                timeout_secs: default_llm_timeout(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ingestion.paper_batch_size, 10);
        assert_eq!(config.ingestion.chunk_batch_size, 50);
        assert_eq!(config.ingestion.chunk_size, 1000);
        assert_eq!(config.ingestion.chunk_overlap, 20);
        assert_eq!(config.retrieval.top_k, 5);
    }

    #[test]
    fn test_hybrid_weights_sum_to_one() {
        let config = AppConfig::default();
        let total = config.retrieval.rerank_weight + config.retrieval.citation_weight;
        assert!((total - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_liveness_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.liveness_retries, 10);
        assert_eq!(config.liveness_interval(), Duration::from_secs(10));
    }
}
