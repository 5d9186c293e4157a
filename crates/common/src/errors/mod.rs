//! Error types for CiteGraph
//!
//! One taxonomy shared by every crate in the workspace:
//! - external paper source failures (fetch / parse / missing resource)
//! - graph and vector store failures (transient vs. exhausted-retry)
//! - retrieval and generation failures, kept distinct from "no results"

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // External paper source (1xxx)
    FetchError,
    ParseError,
    ResourceNotFound,

    // Graph / vector store (2xxx)
    StoreError,
    StoreUnavailable,

    // Retrieval & generation (3xxx)
    RetrievalFailure,
    GenerationFailure,

    // Internal (9xxx)
    ConfigurationError,
    SerializationError,
    InternalError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::FetchError => 1001,
            ErrorCode::ParseError => 1002,
            ErrorCode::ResourceNotFound => 1003,

            ErrorCode::StoreError => 2001,
            ErrorCode::StoreUnavailable => 2002,

            ErrorCode::RetrievalFailure => 3001,
            ErrorCode::GenerationFailure => 3002,

            ErrorCode::ConfigurationError => 9001,
            ErrorCode::SerializationError => 9002,
            ErrorCode::InternalError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Network or timeout failure talking to the paper source or a model
    /// endpoint.
    #[error("fetch failed: {message}")]
    Fetch { message: String },

    /// Malformed document or an unparsable provider response.
    #[error("parse failed: {message}")]
    Parse { message: String },

    /// An expected resource (PDF link, abstract link) is missing from the
    /// provider response.
    #[error("resource not found: {resource} for {id}")]
    ResourceNotFound { resource: String, id: String },

    /// A single graph/vector store operation failed.
    #[error("store error: {message}")]
    Store { message: String },

    /// The store stayed unreachable for the whole retry budget.
    #[error("store unavailable after {attempts} attempts: {message}")]
    StoreUnavailable { attempts: u32, message: String },

    /// Vector index or reranker failure, distinct from an empty result set.
    #[error("retrieval failed: {message}")]
    Retrieval { message: String },

    /// Language model invocation failure.
    #[error("generation failed: {message}")]
    Generation { message: String },

    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Fetch { .. } => ErrorCode::FetchError,
            AppError::Parse { .. } => ErrorCode::ParseError,
            AppError::ResourceNotFound { .. } => ErrorCode::ResourceNotFound,
            AppError::Store { .. } => ErrorCode::StoreError,
            AppError::StoreUnavailable { .. } => ErrorCode::StoreUnavailable,
            AppError::Retrieval { .. } => ErrorCode::RetrievalFailure,
            AppError::Generation { .. } => ErrorCode::GenerationFailure,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// A fatal error is one the calling operation cannot make progress past.
    /// Per-item fetch/parse failures are skippable during batch ingestion.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::StoreUnavailable { .. } | AppError::Configuration { .. }
        )
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Fetch {
            message: err.to_string(),
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Store {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ResourceNotFound {
            resource: "pdf link".into(),
            id: "2301.12345".into(),
        };
        assert_eq!(err.code(), ErrorCode::ResourceNotFound);
        assert_eq!(err.code().as_code(), 1003);
    }

    #[test]
    fn test_fatal_classification() {
        let transient = AppError::Fetch {
            message: "timed out".into(),
        };
        assert!(!transient.is_fatal());

        let fatal = AppError::StoreUnavailable {
            attempts: 10,
            message: "connection refused".into(),
        };
        assert!(fatal.is_fatal());
    }

    #[test]
    fn test_retrieval_distinct_from_store() {
        let err = AppError::Retrieval {
            message: "reranker endpoint returned 500".into(),
        };
        assert_eq!(err.code(), ErrorCode::RetrievalFailure);
        assert!(!err.is_fatal());
    }
}
