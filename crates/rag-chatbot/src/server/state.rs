//! Application state for the chatbot server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::{RagConfig, VectorBackend};
use crate::error::Result;
use crate::ingestion::BpeTokenizer;
use crate::pipeline::RagPipeline;
use crate::providers::{
    InMemoryVectorStore, OpenAiChat, OpenAiEmbedder, PineconeStore, VectorStoreProvider,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pipeline: RagPipeline,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Build the providers named by `config` and wire them into a pipeline
    pub async fn new(config: RagConfig) -> Result<Self> {
        let pipeline = build_pipeline(config).await?;
        Ok(Self::from_pipeline(pipeline))
    }

    /// Wrap an already assembled pipeline. Not ready until the server is
    /// listening.
    pub fn from_pipeline(pipeline: RagPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline,
                ready: RwLock::new(false),
            }),
        }
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.inner.pipeline
    }

    pub fn config(&self) -> &RagConfig {
        self.inner.pipeline.config()
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}

/// Construct the configured providers. Remote indexes are described up
/// front so a missing index or wrong dimension fails at startup.
pub async fn build_pipeline(config: RagConfig) -> Result<RagPipeline> {
    let config = Arc::new(config);

    let tokenizer = Arc::new(BpeTokenizer::for_model(&config.chunking.tokenizer_model)?);
    let embedder = Arc::new(OpenAiEmbedder::new(&config)?);
    let llm = Arc::new(OpenAiChat::new(&config)?);

    let store: Arc<dyn VectorStoreProvider> = match config.vector_store.backend {
        VectorBackend::Pinecone => Arc::new(PineconeStore::connect(&config).await?),
        VectorBackend::Memory => {
            tracing::warn!("Using in-memory vector store; records are lost on restart");
            Arc::new(InMemoryVectorStore::new(config.embeddings.dimensions))
        }
    };

    RagPipeline::new(config, tokenizer, embedder, store, llm)
}
