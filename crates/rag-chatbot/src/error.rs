//! Error types for the RAG chatbot

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Chunk,
    Embed,
    Upsert,
    Query,
    Generate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Chunk => "chunk",
            Stage::Embed => "embed",
            Stage::Upsert => "upsert",
            Stage::Query => "query",
            Stage::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing setup; fatal, never retried
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote API rejected the credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network, rate-limit or timeout failure; the caller may retry with backoff
    #[error("Transient API error: {0}")]
    TransientApi(String),

    /// Vector length does not match the index dimension
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Referenced index or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generation produced no usable content
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// Request rejected by a remote API or by boundary validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Failure annotated with the pipeline stage it came from
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a transient API error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientApi(message.into())
    }

    /// Create an invalid request error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attach the pipeline stage, keeping an existing annotation
    pub fn at(self, stage: Stage) -> Self {
        match self {
            Error::Stage { .. } => self,
            other => Error::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Innermost error, with stage annotations stripped
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }

    /// Stage the error was raised in, if known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether a caller may retry the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Error::TransientApi(_))
    }

    /// Stable machine-readable error type
    pub fn kind(&self) -> &'static str {
        match self.root() {
            Error::Config(_) => "config_error",
            Error::Authentication(_) => "authentication_error",
            Error::TransientApi(_) => "transient_api_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::NotFound(_) => "not_found",
            Error::EmptyResponse(_) => "empty_response",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) | Error::Stage { .. } => "internal_error",
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::TransientApi(format!("request timed out: {}", err))
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Error::TransientApi(format!("request failed: {}", err))
        } else if err.is_decode() {
            Error::Internal(format!("failed to decode response: {}", err))
        } else {
            Error::TransientApi(err.to_string())
        }
    }
}

/// Malformed or mistyped request bodies
impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self.root() {
            Error::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::TransientApi(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "The service is temporarily unavailable. Please try again.".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Sorry, something went wrong while processing your request.".to_string(),
            ),
        };

        tracing::error!(
            stage = self.stage().map(|s| s.as_str()).unwrap_or("-"),
            kind = self.kind(),
            "Request failed: {}",
            self
        );

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
