//! Configuration for the RAG chatbot
//!
//! Built once at startup (defaults, optional TOML file, `.env`, environment)
//! and handed to every component constructor. Nothing reads the environment
//! after [`RagConfig::load`] returns.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Main RAG system configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// OpenAI API configuration (embeddings and chat completions)
    pub openai: OpenAiConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Vector store configuration
    pub vector_store: VectorStoreConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Generation configuration
    pub generation: GenerationConfig,
    /// Ingestion configuration
    pub ingest: IngestConfig,
}

/// API credential; never printed in full
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<unset>)")
        } else {
            f.write_str("Secret(****)")
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            enable_cors: true,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// OpenAI API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key (required)
    #[serde(skip_serializing)]
    pub api_key: Secret,
    /// API base URL
    pub base_url: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Chat completion model name
    pub generation_model: String,
    /// Texts per embedding request
    pub embedding_batch_size: usize,
    /// Embedding requests in flight at once
    pub max_concurrent_requests: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::default(),
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            generation_model: "gpt-4o".to_string(),
            embedding_batch_size: 100,
            max_concurrent_requests: 4,
            timeout_secs: 60,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Vector dimension shared by the model and the index
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dimensions: 1536 }
    }
}

/// Vector store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Managed Pinecone index
    #[default]
    Pinecone,
    /// Process-local index (development and tests)
    Memory,
}

impl FromStr for VectorBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "memory" => Ok(Self::Memory),
            other => Err(Error::config(format!("unknown vector backend '{}'", other))),
        }
    }
}

/// Similarity metric declared by the index
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Cosine,
    Dotproduct,
    Euclidean,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Dotproduct => "dotproduct",
            Metric::Euclidean => "euclidean",
        }
    }
}

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Backend provider
    pub backend: VectorBackend,
    /// Pinecone API key (required for the pinecone backend)
    #[serde(skip_serializing)]
    pub api_key: Secret,
    /// Index name
    pub index_name: String,
    /// Serverless cloud
    pub cloud: String,
    /// Serverless region
    pub region: String,
    /// Similarity metric
    pub metric: Metric,
    /// Namespace records are written to and read from
    pub namespace: String,
    /// Control plane URL
    pub controller_url: String,
    /// Records per upsert request
    pub upsert_batch_size: usize,
    /// Upsert requests in flight at once
    pub max_concurrent_upserts: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            api_key: Secret::default(),
            index_name: "rag-chatbot".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            metric: Metric::Cosine,
            namespace: String::new(),
            controller_url: "https://api.pinecone.io".to_string(),
            upsert_batch_size: 100,
            max_concurrent_upserts: 4,
            timeout_secs: 30,
        }
    }
}

/// Token-window chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum tokens per chunk
    pub max_tokens: usize,
    /// Tokens shared by consecutive chunks
    pub overlap_tokens: usize,
    /// Model whose tokenizer defines token boundaries
    pub tokenizer_model: String,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 500,
            overlap_tokens: 50,
            tokenizer_model: "text-embedding-3-small".to_string(),
        }
    }
}

/// What `answer` does when retrieval comes back empty
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoContextPolicy {
    /// Return `fallback_message` without calling the model
    #[default]
    Fallback,
    /// Call the model with an explicit "no context found" note
    Generate,
}

impl FromStr for NoContextPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "generate" => Ok(Self::Generate),
            other => Err(Error::config(format!("unknown no-context policy '{}'", other))),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve
    pub top_k: usize,
    /// Drop matches scoring below this value
    pub similarity_threshold: Option<f32>,
    /// Behavior when nothing is retrieved
    pub no_context_policy: NoContextPolicy,
    /// Answer returned under the fallback policy
    pub fallback_message: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: None,
            no_context_policy: NoContextPolicy::Fallback,
            fallback_message:
                "I couldn't find any relevant information to answer your question.".to_string(),
        }
    }
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling temperature (0.0 for reproducible answers)
    pub temperature: f32,
    /// Instructions placed ahead of the retrieved context
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Default grounding instructions
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI assistant using a Retrieval Augmented Generation (RAG) system.
Answer the user's question based ONLY on the provided context.
If the context doesn't contain enough information to answer the question,
say \"I don't have enough information to answer that question.\"
Don't make up information or use knowledge outside the provided context.
Always cite your sources from the context if possible.";

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Documents ingested concurrently by `ingest_many`
    pub max_concurrent_documents: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_documents: 4,
        }
    }
}

impl RagConfig {
    /// Load configuration: defaults, then the optional TOML file, then `.env`
    /// and process environment overrides. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };

        // Missing .env is fine
        let _ = dotenvy::dotenv();
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; absent sections take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    /// Apply overrides from a variable lookup (the process environment in production)
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("OPENAI_API_KEY") {
            self.openai.api_key = Secret::new(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.openai.base_url = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL") {
            self.chunking.tokenizer_model = v.clone();
            self.openai.embedding_model = v;
        }
        if let Some(v) = get("EMBEDDING_MODEL_DIMENSION") {
            self.embeddings.dimensions = parse_var("EMBEDDING_MODEL_DIMENSION", &v)?;
        }
        if let Some(v) = get("GENERATION_MODEL") {
            self.openai.generation_model = v;
        }
        if let Some(v) = get("PINECONE_API_KEY") {
            self.vector_store.api_key = Secret::new(v);
        }
        if let Some(v) = get("PINECONE_INDEX_NAME") {
            self.vector_store.index_name = v;
        }
        if let Some(v) = get("PINECONE_CLOUD") {
            self.vector_store.cloud = v;
        }
        if let Some(v) = get("PINECONE_REGION") {
            self.vector_store.region = v;
        }
        if let Some(v) = get("PINECONE_NAMESPACE") {
            self.vector_store.namespace = v;
        }
        if let Some(v) = get("RAG_VECTOR_BACKEND") {
            self.vector_store.backend = v.parse()?;
        }
        if let Some(v) = get("RAG_TOP_K") {
            self.retrieval.top_k = parse_var("RAG_TOP_K", &v)?;
        }
        if let Some(v) = get("RAG_NO_CONTEXT_POLICY") {
            self.retrieval.no_context_policy = v.parse()?;
        }
        if let Some(v) = get("RAG_MAX_TOKENS_PER_CHUNK") {
            self.chunking.max_tokens = parse_var("RAG_MAX_TOKENS_PER_CHUNK", &v)?;
        }
        if let Some(v) = get("RAG_CHUNK_OVERLAP") {
            self.chunking.overlap_tokens = parse_var("RAG_CHUNK_OVERLAP", &v)?;
        }
        if let Some(v) = get("RAG_TEMPERATURE") {
            self.generation.temperature = parse_var("RAG_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("RAG_HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("RAG_PORT") {
            self.server.port = parse_var("RAG_PORT", &v)?;
        }

        Ok(())
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.is_empty() {
            return Err(Error::config(
                "OPENAI_API_KEY is not set. Please add it to your environment variables.",
            ));
        }
        if self.vector_store.backend == VectorBackend::Pinecone
            && self.vector_store.api_key.is_empty()
        {
            return Err(Error::config(
                "PINECONE_API_KEY is not set. Please add it to your environment variables.",
            ));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embedding dimensions must be positive"));
        }
        if self.chunking.max_tokens == 0 {
            return Err(Error::config("chunking.max_tokens must be positive"));
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err(Error::config(format!(
                "chunking.overlap_tokens ({}) must be less than chunking.max_tokens ({})",
                self.chunking.overlap_tokens, self.chunking.max_tokens
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be positive"));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::config(format!(
                "generation.temperature must be within [0, 2], got {}",
                self.generation.temperature
            )));
        }
        if self.openai.embedding_batch_size == 0 || self.vector_store.upsert_batch_size == 0 {
            return Err(Error::config("batch sizes must be positive"));
        }
        if self.openai.max_concurrent_requests == 0
            || self.vector_store.max_concurrent_upserts == 0
            || self.ingest.max_concurrent_documents == 0
        {
            return Err(Error::config("concurrency limits must be positive"));
        }
        if self.vector_store.index_name.trim().is_empty() {
            return Err(Error::config("vector_store.index_name must not be empty"));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{} has an invalid value: '{}'", key, value)))
}
