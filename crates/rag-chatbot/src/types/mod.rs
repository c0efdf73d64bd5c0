//! Core types for the RAG chatbot

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, IndexedRecord, RecordMetadata, RetrievedChunk, RetrievedContext};
pub use query::{ChatRequest, IngestRequest};
pub use response::{
    ChatResponse, ChatTurn, FailedBatch, HealthResponse, IndexStats, IngestReport, PipelineHealth,
};
