//! Reranker abstraction
//!
//! A reranker rescores candidate texts against the query with a model
//! stronger than the embedding used for first-stage recall. Providers:
//! - Remote cross-encoder endpoints (TEI-style POST /rerank)
//! - A lexical term-overlap fallback that needs no external service

use crate::config::RerankConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// One reranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankResult {
    /// Position of the text in the input slice
    pub index: usize,
    /// Relevance score, higher is better
    pub score: f32,
    /// 1-based position in the reranked order
    pub rank: usize,
}

/// Trait for candidate rescoring
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score `texts` against `query` and return the best `top_n`,
    /// highest score first, with ranks assigned from 1.
    async fn rerank(&self, query: &str, texts: &[String], top_n: usize)
        -> Result<Vec<RerankResult>>;
}

/// Client for TEI-style /rerank endpoints
pub struct RemoteReranker {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [String],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankEntry>,
}

#[derive(Deserialize)]
struct RerankEntry {
    index: usize,
    relevance_score: f32,
}

impl RemoteReranker {
    pub fn new(config: &RerankConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "rerank.endpoint is required for the remote provider".into(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Reranker for RemoteReranker {
    async fn rerank(
        &self,
        query: &str,
        texts: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.endpoint);
        let request = RerankRequest {
            model: &self.model,
            query,
            texts,
            top_n,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(|e| AppError::Retrieval {
            message: format!("rerank request failed: {e}"),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval {
                message: format!("rerank API error {status}: {body}"),
            });
        }

        let parsed: RerankResponse = response.json().await.map_err(|e| AppError::Retrieval {
            message: format!("failed to parse rerank response: {e}"),
        })?;

        let mut results: Vec<RerankResult> = parsed
            .results
            .into_iter()
            .filter(|r| r.index < texts.len())
            .map(|r| RerankResult {
                index: r.index,
                score: r.relevance_score,
                rank: 0,
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_n);
        for (i, r) in results.iter_mut().enumerate() {
            r.rank = i + 1;
        }
        Ok(results)
    }
}

/// Term-overlap reranker.
///
/// Scores each text by the fraction of distinct query terms it
/// contains. Crude, but deterministic and dependency-free.
pub struct LexicalReranker;

impl LexicalReranker {
    pub fn new() -> Self {
        Self
    }

    fn terms(text: &str) -> HashSet<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(|t| t.to_string())
            .collect()
    }
}

impl Default for LexicalReranker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Reranker for LexicalReranker {
    async fn rerank(
        &self,
        query: &str,
        texts: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        let query_terms = Self::terms(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<RerankResult> = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let text_terms = Self::terms(text);
                let overlap = query_terms.intersection(&text_terms).count();
                RerankResult {
                    index,
                    score: overlap as f32 / query_terms.len() as f32,
                    rank: 0,
                }
            })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.index.cmp(&b.index))
        });
        results.truncate(top_n);
        for (i, r) in results.iter_mut().enumerate() {
            r.rank = i + 1;
        }
        Ok(results)
    }
}

/// Create a reranker based on configuration
pub fn create_reranker(config: &RerankConfig) -> Result<Arc<dyn Reranker>> {
    match config.provider.as_str() {
        "remote" => Ok(Arc::new(RemoteReranker::new(config)?)),
        "lexical" => Ok(Arc::new(LexicalReranker::new())),
        other => Err(AppError::Configuration {
            message: format!("unknown rerank provider: {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lexical_orders_by_overlap() {
        let reranker = LexicalReranker::new();
        let texts = vec![
            "stellar winds in binary systems".to_string(),
            "citation graphs for paper retrieval".to_string(),
            "retrieval over knowledge graphs of papers".to_string(),
        ];
        let results = reranker
            .rerank("paper retrieval with citation graphs", &texts, 3)
            .await
            .unwrap();
        assert_eq!(results[0].index, 1);
        assert_eq!(results[0].rank, 1);
        assert!(results[0].score >= results[1].score);
        assert_eq!(results.last().unwrap().index, 0);
    }

    #[tokio::test]
    async fn test_lexical_truncates_to_top_n() {
        let reranker = LexicalReranker::new();
        let texts = vec![
            "alpha beta".to_string(),
            "alpha gamma".to_string(),
            "delta epsilon".to_string(),
        ];
        let results = reranker.rerank("alpha", &texts, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].rank, 2);
    }

    #[tokio::test]
    async fn test_lexical_empty_query_yields_nothing() {
        let reranker = LexicalReranker::new();
        let texts = vec!["anything".to_string()];
        let results = reranker.rerank("  ", &texts, 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let mut config = crate::config::AppConfig::default().rerank;
        config.provider = "psychic".to_string();
        assert!(create_reranker(&config).is_err());
    }
}
