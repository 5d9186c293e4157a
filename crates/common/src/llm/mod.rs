//! Language model abstraction
//!
//! The answer orchestrator only needs plain text completion over a
//! fully rendered prompt, so the trait stays minimal.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Trait for text generation
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Client for OpenAI-compatible /completions endpoints
pub struct OpenAiCompatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    stop_token: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
    stop: Vec<&'a str>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

impl OpenAiCompatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "llm.endpoint is required".into(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stop_token: config.stop_token.clone(),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/completions", self.endpoint);
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stop: vec![self.stop_token.as_str()],
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(ref key) = self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(|e| AppError::Generation {
            message: format!("completion request failed: {e}"),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Generation {
                message: format!("completion API error {status}: {body}"),
            });
        }

        let parsed: CompletionResponse =
            response.json().await.map_err(|e| AppError::Generation {
                message: format!("failed to parse completion response: {e}"),
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AppError::Generation {
                message: "completion response had no choices".into(),
            })
    }
}

/// Test model returning canned answers in order.
///
/// Records every prompt it sees so tests can assert on the rendered
/// context.
pub struct ScriptedModel {
    answers: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(answers: Vec<String>) -> Self {
        let mut answers = answers;
        answers.reverse();
        Self {
            answers: Mutex::new(answers),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far, oldest first
    pub fn seen_prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        let mut answers = self.answers.lock().map_err(|_| AppError::Generation {
            message: "scripted model lock poisoned".into(),
        })?;
        answers.pop().ok_or_else(|| AppError::Generation {
            message: "scripted model ran out of answers".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_model_plays_answers_in_order() {
        let model = ScriptedModel::new(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(model.generate("p1").await.unwrap(), "first");
        assert_eq!(model.generate("p2").await.unwrap(), "second");
        assert!(model.generate("p3").await.is_err());
        assert_eq!(model.seen_prompts(), vec!["p1", "p2", "p3"]);
    }
}
