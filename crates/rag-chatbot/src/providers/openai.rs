//! OpenAI providers for embeddings and chat completion

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::config::{RagConfig, Secret};
use crate::error::{Error, Result};
use crate::generation::{ChatMessage, PromptBuilder};

use super::embedding::EmbeddingProvider;
use super::http::{build_client, check_response};
use super::llm::{GenerationRequest, LlmProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embedding provider (`/embeddings`)
pub struct OpenAiEmbedder {
    client: Client,
    base_url: String,
    api_key: Secret,
    model: String,
    dimensions: usize,
    batch_size: usize,
    permits: Semaphore,
}

impl OpenAiEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.openai.timeout_secs)?,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            api_key: config.openai.api_key.clone(),
            model: config.openai.embedding_model.clone(),
            dimensions: config.embeddings.dimensions,
            batch_size: config.openai.embedding_batch_size.max(1),
            permits: Semaphore::new(config.openai.max_concurrent_requests.max(1)),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Only the text-embedding-3 family accepts a `dimensions` parameter
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }

    async fn embed_batch(&self, batch_index: usize, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::internal(format!("embedding semaphore closed: {}", e)))?;

        tracing::debug!(batch = batch_index, size = batch.len(), "Embedding batch");

        let request = EmbeddingRequest {
            model: &self.model,
            input: batch,
            encoding_format: "float",
            dimensions: self.requested_dimensions(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await?;
        let response = check_response("OpenAI embeddings", response).await?;
        let parsed: EmbeddingResponse = response.json().await?;

        order_embeddings(parsed.data, batch.len(), self.dimensions)
    }
}

/// Put vectors back in input order and check count and dimension
fn order_embeddings(
    mut data: Vec<EmbeddingData>,
    expected_count: usize,
    dimensions: usize,
) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected_count {
        return Err(Error::internal(format!(
            "embedding API returned {} vectors for {} inputs",
            data.len(),
            expected_count
        )));
    }

    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(Error::internal("embedding API returned non-contiguous indices"));
    }

    data.into_iter()
        .map(|d| {
            if d.embedding.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: d.embedding.len(),
                });
            }
            Ok(d.embedding)
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        let batches = texts
            .chunks(self.batch_size)
            .enumerate()
            .map(|(i, batch)| self.embed_batch(i, batch));

        // join_all keeps batch order, so flattening restores input order
        let results = join_all(batches).await;
        let mut vectors = Vec::with_capacity(texts.len());
        for result in results {
            vectors.extend(result?);
        }

        tracing::debug!(
            texts = texts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Embedded texts with {}",
            self.model
        );
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(self.api_key.expose())
            .send()
            .await;

        match response {
            Ok(r) => Ok(r.status().is_success()),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat-completion provider (`/chat/completions`)
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: Secret,
    model: String,
}

impl OpenAiChat {
    /// Create a new OpenAI chat provider
    pub fn new(config: &RagConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.openai.timeout_secs)?,
            base_url: config.openai.base_url.trim_end_matches('/').to_string(),
            api_key: config.openai.api_key.clone(),
            model: config.openai.generation_model.clone(),
        })
    }
}

/// First choice's content, or `EmptyResponse`
fn answer_text(response: ChatCompletionResponse) -> Result<String> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::EmptyResponse("completion had no choices".to_string()))?;

    match choice.message.content {
        Some(content) if !content.trim().is_empty() => Ok(content.trim().to_string()),
        _ => Err(Error::EmptyResponse(format!(
            "completion had no content (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        ))),
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: PromptBuilder::build_messages(request),
            temperature: request.temperature,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await?;
        let response = check_response("OpenAI chat completions", response).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        let answer = answer_text(parsed)?;
        tracing::debug!(
            context = request.context.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated answer with {}",
            self.model
        );
        Ok(answer)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models/{}", self.base_url, self.model))
            .bearer_auth(self.api_key.expose())
            .send()
            .await;

        match response {
            Ok(r) => Ok(r.status().is_success()),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
