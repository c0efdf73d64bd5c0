//! Provider abstractions for embeddings, vector storage and answer generation
//!
//! The pipeline only talks to these traits. Remote implementations target
//! the OpenAI and Pinecone HTTP APIs; the in-memory store stands in for the
//! managed index during development and tests.

pub mod embedding;
pub mod http;
pub mod llm;
pub mod local;
pub mod openai;
pub mod pinecone;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::{GenerationRequest, LlmProvider};
pub use local::InMemoryVectorStore;
pub use openai::{OpenAiChat, OpenAiEmbedder};
pub use pinecone::{IndexDescription, PineconeAdmin, PineconeStore};
pub use vector_store::VectorStoreProvider;
