//! Ingest and answer flows over the provider traits
//!
//! `ingest`: chunk → embed → upsert. `answer`: embed query → similarity
//! search → generate. No state is kept between calls; everything shared is
//! read-only configuration and the provider handles.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use crate::config::{NoContextPolicy, RagConfig};
use crate::error::{Error, Result, Stage};
use crate::ingestion::{TokenChunker, Tokenizer};
use crate::providers::{EmbeddingProvider, GenerationRequest, LlmProvider, VectorStoreProvider};
use crate::types::{
    ChatTurn, FailedBatch, IndexStats, IndexedRecord, IngestReport, PipelineHealth,
    RetrievedContext,
};

/// RAG pipeline orchestrator
pub struct RagPipeline {
    config: Arc<RagConfig>,
    chunker: TokenChunker,
    tokenizer: Arc<dyn Tokenizer>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    /// Bounds upsert batches in flight across all documents
    upsert_permits: Semaphore,
}

impl RagPipeline {
    /// Assemble a pipeline. Fails if chunking settings are invalid or the
    /// embedder and index disagree on dimension.
    pub fn new(
        config: Arc<RagConfig>,
        tokenizer: Arc<dyn Tokenizer>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let chunker =
            TokenChunker::new(config.chunking.max_tokens, config.chunking.overlap_tokens)?;

        if embedder.dimensions() != store.dimension() {
            return Err(Error::DimensionMismatch {
                expected: store.dimension(),
                actual: embedder.dimensions(),
            });
        }

        let upsert_permits = Semaphore::new(config.vector_store.max_concurrent_upserts.max(1));

        tracing::info!(
            "Pipeline ready: {} embeddings, {} index, {} generation ({})",
            embedder.name(),
            store.name(),
            llm.name(),
            llm.model()
        );

        Ok(Self {
            config,
            chunker,
            tokenizer,
            embedder,
            store,
            llm,
            upsert_permits,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn chunker(&self) -> &TokenChunker {
        &self.chunker
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.store
    }

    /// Chunk, embed and upsert one document.
    ///
    /// Transient upsert failures are reported per batch in the returned
    /// report while the other batches proceed; if every batch fails the
    /// first error is returned instead. Any other failure aborts.
    pub async fn ingest(&self, text: &str, source_id: &str) -> Result<IngestReport> {
        let start = Instant::now();

        let chunks = self
            .chunker
            .chunk(self.tokenizer.as_ref(), text, source_id)
            .map_err(|e| e.at(Stage::Chunk))?;

        if chunks.is_empty() {
            tracing::info!("Document '{}' is empty, nothing to ingest", source_id);
            return Ok(IngestReport::empty(source_id));
        }
        tracing::info!("Split '{}' into {} chunks", source_id, chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| e.at(Stage::Embed))?;

        if vectors.len() != chunks.len() {
            return Err(Error::internal(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            ))
            .at(Stage::Embed));
        }

        let records: Vec<IndexedRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexedRecord::from_chunk(source_id, chunk, vector))
            .collect();

        let mut report = self.upsert_batches(source_id, &records).await?;
        report.chunks_total = chunks.len();

        if report.is_complete() {
            tracing::info!(
                "Ingested '{}': {} chunks in {}ms",
                source_id,
                report.chunks_stored,
                start.elapsed().as_millis()
            );
        } else {
            tracing::warn!(
                "Ingested '{}' partially: {}/{} chunks stored, {} batches failed",
                source_id,
                report.chunks_stored,
                report.chunks_total,
                report.failed_batches.len()
            );
        }
        Ok(report)
    }

    async fn upsert_batches(
        &self,
        source_id: &str,
        records: &[IndexedRecord],
    ) -> Result<IngestReport> {
        let batch_size = self.config.vector_store.upsert_batch_size.max(1);

        let batches = records.chunks(batch_size).enumerate().map(|(i, batch)| async move {
            let result = match self.upsert_permits.acquire().await {
                Ok(_permit) => self.store.upsert(batch).await,
                Err(e) => Err(Error::internal(format!("upsert semaphore closed: {}", e))),
            };
            tracing::debug!("Upsert batch {} ({} records): {}", i, batch.len(), result.is_ok());
            (i, batch, result)
        });
        let results = join_all(batches).await;

        let mut report = IngestReport::empty(source_id);
        let mut first_error = None;
        for (batch_index, batch, result) in results {
            match result {
                Ok(stored) => report.chunks_stored += stored,
                Err(e) if e.is_retryable() => {
                    tracing::warn!("Upsert batch {} of '{}' failed: {}", batch_index, source_id, e);
                    report.failed_batches.push(FailedBatch {
                        batch_index,
                        record_ids: batch.iter().map(|r| r.id.clone()).collect(),
                        error: e.to_string(),
                        retryable: true,
                    });
                    first_error.get_or_insert(e);
                }
                Err(e) => return Err(e.at(Stage::Upsert)),
            }
        }

        if report.chunks_stored == 0 {
            if let Some(e) = first_error {
                return Err(e.at(Stage::Upsert));
            }
        }
        Ok(report)
    }

    /// Ingest several documents with bounded concurrency. Results come back
    /// in input order.
    pub async fn ingest_many(
        &self,
        documents: Vec<(String, String)>,
    ) -> Vec<(String, Result<IngestReport>)> {
        let permits = Semaphore::new(self.config.ingest.max_concurrent_documents.max(1));

        let futures = documents.into_iter().map(|(source_id, text)| {
            let permits = &permits;
            async move {
                let result = match permits.acquire().await {
                    Ok(_permit) => self.ingest(&text, &source_id).await,
                    Err(e) => Err(Error::internal(format!("ingest semaphore closed: {}", e))),
                };
                if let Err(e) = &result {
                    tracing::error!("Failed to ingest '{}': {}", source_id, e);
                }
                (source_id, result)
            }
        });

        join_all(futures).await
    }

    /// Embed the query and return the ranked matches above the threshold
    pub async fn retrieve(&self, query: &str) -> Result<RetrievedContext> {
        let vector = self
            .embedder
            .embed_one(query)
            .await
            .map_err(|e| e.at(Stage::Embed))?;

        let context = self
            .store
            .query(&vector, self.config.retrieval.top_k)
            .await
            .map_err(|e| e.at(Stage::Query))?;

        Ok(context.with_threshold(self.config.retrieval.similarity_threshold))
    }

    /// Answer a question from retrieved context
    pub async fn answer(&self, query: &str) -> Result<ChatTurn> {
        let start = Instant::now();
        let context = self.retrieve(query).await?;
        tracing::info!("Retrieved {} chunks for query", context.len());

        if context.is_empty()
            && self.config.retrieval.no_context_policy == NoContextPolicy::Fallback
        {
            tracing::info!("No context found, returning fallback answer");
            return Ok(ChatTurn {
                query: query.to_string(),
                answer: self.config.retrieval.fallback_message.clone(),
                retrieved_context: Vec::new(),
                generated: false,
            });
        }

        let snippets = context.texts();
        let request =
            GenerationRequest::new(query, &snippets, &self.config.generation.system_prompt)
                .with_temperature(self.config.generation.temperature);

        let answer = self
            .llm
            .generate(&request)
            .await
            .map_err(|e| e.at(Stage::Generate))?;

        tracing::info!(
            "Answered in {}ms with {} context chunks",
            start.elapsed().as_millis(),
            snippets.len()
        );

        Ok(ChatTurn {
            query: query.to_string(),
            answer,
            retrieved_context: context.into_matches(),
            generated: true,
        })
    }

    /// Index statistics from the vector store
    pub async fn index_stats(&self) -> Result<IndexStats> {
        self.store.describe().await
    }

    /// Check every provider; failures count as unreachable
    pub async fn health(&self) -> PipelineHealth {
        let (embedder, vector_store, llm) = tokio::join!(
            self.embedder.health_check(),
            self.store.health_check(),
            self.llm.health_check()
        );

        PipelineHealth {
            embedder: embedder.unwrap_or(false),
            vector_store: vector_store.unwrap_or(false),
            llm: llm.unwrap_or(false),
        }
    }
}
