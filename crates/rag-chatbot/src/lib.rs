//! rag-chatbot: retrieval-augmented question answering over ingested documents
//!
//! Documents are split into overlapping token-bounded chunks, embedded with
//! the OpenAI embeddings API and stored in a Pinecone index. Questions are
//! embedded, matched against the index and answered by a chat model
//! grounded on the retrieved chunks.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result, Stage};
pub use pipeline::RagPipeline;
pub use types::PipelineHealth;
pub use types::{
    document::{Chunk, IndexedRecord, RetrievedChunk, RetrievedContext},
    query::{ChatRequest, IngestRequest},
    response::{ChatResponse, ChatTurn, IngestReport},
};
