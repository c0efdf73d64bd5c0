//! Response types for the pipeline and the HTTP interface

use serde::{Deserialize, Serialize};

use crate::types::document::RetrievedChunk;

/// One question and its answer; nothing is persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// The question as asked
    pub query: String,
    /// The generated (or fallback) answer
    pub answer: String,
    /// Context the answer was grounded on, in rank order
    pub retrieved_context: Vec<RetrievedChunk>,
    /// Whether the language model was called
    pub generated: bool,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub retrieved_context: Vec<String>,
}

impl From<ChatTurn> for ChatResponse {
    fn from(turn: ChatTurn) -> Self {
        Self {
            answer: turn.answer,
            retrieved_context: turn.retrieved_context.into_iter().map(|c| c.text).collect(),
        }
    }
}

/// Upsert batch that did not make it into the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedBatch {
    /// Batch position within the document
    pub batch_index: usize,
    /// Record ids in the batch
    pub record_ids: Vec<String>,
    /// Error message
    pub error: String,
    /// Whether retrying the batch may succeed
    pub retryable: bool,
}

/// Outcome of ingesting one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Document identifier
    pub source_id: String,
    /// Chunks produced by the chunker
    pub chunks_total: usize,
    /// Chunks confirmed stored by the index
    pub chunks_stored: usize,
    /// Batches that failed
    pub failed_batches: Vec<FailedBatch>,
}

impl IngestReport {
    pub fn empty(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            chunks_total: 0,
            chunks_stored: 0,
            failed_batches: Vec::new(),
        }
    }

    /// True when every chunk was stored
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty() && self.chunks_stored == self.chunks_total
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Declared vector dimension
    pub dimension: usize,
    /// Records across all namespaces
    pub total_vector_count: u64,
}

/// Reachability of each provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineHealth {
    pub embedder: bool,
    pub vector_store: bool,
    pub llm: bool,
}

impl PipelineHealth {
    pub fn is_healthy(&self) -> bool {
        self.embedder && self.vector_store && self.llm
    }
}

/// Body of `GET /health` and `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Per-provider reachability, reported by `/api/health` only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers: Option<PipelineHealth>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            message: "Service is healthy".to_string(),
            providers: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            providers: None,
        }
    }

    pub fn from_providers(providers: PipelineHealth) -> Self {
        let mut response = if providers.is_healthy() {
            Self::ok()
        } else {
            Self::error("One or more providers are unreachable")
        };
        response.providers = Some(providers);
        response
    }
}
