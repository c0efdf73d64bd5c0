//! In-process providers for pipeline and server tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rag_chatbot::config::{RagConfig, Secret, VectorBackend};
use rag_chatbot::error::{Error, Result};
use rag_chatbot::ingestion::BpeTokenizer;
use rag_chatbot::providers::{
    EmbeddingProvider, GenerationRequest, InMemoryVectorStore, LlmProvider, VectorStoreProvider,
};
use rag_chatbot::types::{IndexStats, IndexedRecord, RetrievedContext};
use rag_chatbot::RagPipeline;

pub const DIMS: usize = 256;

pub const SKY_DOC: &str = "The sky is blue. Water is wet.";

pub const LONG_DOC: &str = "Rust is a systems programming language. \
Cargo is the Rust package manager. \
Tokio is an asynchronous runtime for Rust. \
Axum is a web framework built on Tokio. \
Serde serializes and deserializes Rust data structures.";

/// Small chunks so short documents split into several records
pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.openai.api_key = Secret::new("sk-test");
    config.vector_store.backend = VectorBackend::Memory;
    config.embeddings.dimensions = DIMS;
    config.chunking.max_tokens = 6;
    config.chunking.overlap_tokens = 2;
    config
}

/// Bag-of-words embedding: each lowercase word is hashed into a bucket
pub struct HashEmbedder {
    dims: usize,
    pub calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in word.to_lowercase().bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dims as u64) as usize] += 1.0;
        }
        vector
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// Embedder whose credentials are always rejected
pub struct RejectingEmbedder {
    dims: usize,
    pub calls: AtomicUsize,
}

impl RejectingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for RejectingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::Authentication("OpenAI embeddings returned HTTP 401: invalid api key".into()))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "rejecting"
    }
}

/// Chat model that records the context it was given
pub struct RecordingLlm {
    pub contexts: Mutex<Vec<Vec<String>>>,
    reject: bool,
}

impl RecordingLlm {
    pub fn new() -> Self {
        Self {
            contexts: Mutex::new(Vec::new()),
            reject: false,
        }
    }

    /// Every call fails with an authentication error
    pub fn rejecting() -> Self {
        Self {
            contexts: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn last_context(&self) -> Option<Vec<String>> {
        self.contexts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        self.contexts.lock().push(request.context.to_vec());
        if self.reject {
            return Err(Error::Authentication("OpenAI chat completions returned HTTP 401".into()));
        }
        match request.context.first() {
            Some(top) => Ok(format!("Based on the context: {}", top)),
            None => Ok("I don't have enough information to answer that question.".to_string()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.reject)
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

/// How `FlakyStore` fails batches containing `fail_id`
#[derive(Clone, Copy)]
pub enum Failure {
    Transient,
    Auth,
}

/// In-memory store that fails upserts of batches containing chosen ids
pub struct FlakyStore {
    pub inner: InMemoryVectorStore,
    fail_ids: Vec<String>,
    failure: Failure,
    pub upsert_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn new(dims: usize, fail_ids: &[&str], failure: Failure) -> Self {
        Self {
            inner: InMemoryVectorStore::new(dims),
            fail_ids: fail_ids.iter().map(|s| s.to_string()).collect(),
            failure,
            upsert_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl VectorStoreProvider for FlakyStore {
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if records.iter().any(|r| self.fail_ids.contains(&r.id)) {
            return Err(match self.failure {
                Failure::Transient => {
                    Error::transient("Pinecone upsert returned HTTP 429: rate limited")
                }
                Failure::Auth => Error::Authentication("Pinecone upsert returned HTTP 401".into()),
            });
        }
        self.inner.upsert(records).await
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<RetrievedContext> {
        self.inner.query(vector, top_k).await
    }

    async fn describe(&self) -> Result<IndexStats> {
        self.inner.describe().await
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Pipeline over the given providers with the cl100k tokenizer
pub fn pipeline_with(
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
) -> RagPipeline {
    let tokenizer = Arc::new(BpeTokenizer::cl100k().expect("cl100k tokenizer"));
    RagPipeline::new(Arc::new(config), tokenizer, embedder, store, llm).expect("pipeline")
}

/// Hash embedder, in-memory store and recording model
pub struct Harness {
    pub embedder: Arc<HashEmbedder>,
    pub store: Arc<InMemoryVectorStore>,
    pub llm: Arc<RecordingLlm>,
    pub pipeline: RagPipeline,
}

impl Harness {
    pub fn new(config: RagConfig) -> Self {
        let embedder = Arc::new(HashEmbedder::new(DIMS));
        let store = Arc::new(InMemoryVectorStore::new(DIMS));
        let llm = Arc::new(RecordingLlm::new());
        let pipeline = pipeline_with(config, embedder.clone(), store.clone(), llm.clone());
        Self {
            embedder,
            store,
            llm,
            pipeline,
        }
    }
}
