//! End-to-end pipeline behavior over in-process providers

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use rag_chatbot::config::NoContextPolicy;
use rag_chatbot::error::{Error, Stage};
use rag_chatbot::providers::{EmbeddingProvider, InMemoryVectorStore, VectorStoreProvider};
use rag_chatbot::RagPipeline;

#[tokio::test]
async fn test_sky_is_blue_end_to_end() {
    let harness = Harness::new(test_config());

    let report = harness.pipeline.ingest(SKY_DOC, "sky").await.unwrap();
    assert!(report.chunks_total >= 2, "expected several chunks, got {}", report.chunks_total);
    assert_eq!(report.chunks_stored, report.chunks_total);
    assert!(report.is_complete());

    let turn = harness.pipeline.answer("What color is the sky?").await.unwrap();
    assert!(turn.generated);
    assert!(turn.retrieved_context[0].text.contains("sky is blue"));

    let context = harness.llm.last_context().unwrap();
    assert!(context.iter().any(|c| c.contains("sky is blue")));
    assert!(turn.answer.contains("sky is blue"));
}

#[tokio::test]
async fn test_records_carry_chunk_metadata() {
    let harness = Harness::new(test_config());
    harness.pipeline.ingest(SKY_DOC, "sky").await.unwrap();

    let first = harness.store.metadata("sky-0").unwrap();
    assert_eq!(first.source_id.as_deref(), Some("sky"));
    assert_eq!(first.chunk_index, Some(0));
    assert_eq!(first.source_offset, Some(0));
    assert_eq!(first.token_count, Some(6));

    let second = harness.store.metadata("sky-1").unwrap();
    assert_eq!(second.source_offset, Some(4));
}

#[tokio::test]
async fn test_reingest_overwrites_instead_of_duplicating() {
    let harness = Harness::new(test_config());

    let first = harness.pipeline.ingest(SKY_DOC, "sky").await.unwrap();
    assert_eq!(harness.store.len(), first.chunks_total);

    let second = harness.pipeline.ingest(SKY_DOC, "sky").await.unwrap();
    assert_eq!(second.chunks_total, first.chunks_total);
    assert_eq!(harness.store.len(), first.chunks_total);
}

#[tokio::test]
async fn test_empty_document_makes_no_calls() {
    let harness = Harness::new(test_config());

    let report = harness.pipeline.ingest("", "empty").await.unwrap();
    assert_eq!(report.chunks_total, 0);
    assert_eq!(report.chunks_stored, 0);
    assert_eq!(harness.embedder.calls(), 0);
    assert!(harness.store.is_empty());
}

#[tokio::test]
async fn test_self_match_scores_one() {
    let harness = Harness::new(test_config());
    harness.pipeline.ingest(SKY_DOC, "sky").await.unwrap();

    let text = harness.store.metadata("sky-0").unwrap().text;
    let context = harness.pipeline.retrieve(&text).await.unwrap();
    assert_eq!(context.matches()[0].id, "sky-0");
    assert!((context.matches()[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn test_retrieval_bounded_and_ranked() {
    let mut config = test_config();
    config.retrieval.top_k = 3;
    let harness = Harness::new(config);
    harness.pipeline.ingest(LONG_DOC, "long").await.unwrap();
    assert!(harness.store.len() > 3);

    let context = harness.pipeline.retrieve("Which runtime does Axum use?").await.unwrap();
    assert!(context.len() <= 3);
    for pair in context.matches().windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[tokio::test]
async fn test_fallback_when_nothing_retrieved() {
    let harness = Harness::new(test_config());

    let turn = harness.pipeline.answer("What color is the sky?").await.unwrap();
    assert!(!turn.generated);
    assert!(turn.retrieved_context.is_empty());
    assert_eq!(turn.answer, harness.pipeline.config().retrieval.fallback_message);
    assert_eq!(harness.llm.calls(), 0);
}

#[tokio::test]
async fn test_generate_policy_calls_model_without_context() {
    let mut config = test_config();
    config.retrieval.no_context_policy = NoContextPolicy::Generate;
    let harness = Harness::new(config);

    let turn = harness.pipeline.answer("What color is the sky?").await.unwrap();
    assert!(turn.generated);
    assert_eq!(harness.llm.calls(), 1);
    assert_eq!(harness.llm.last_context(), Some(Vec::new()));
}

#[tokio::test]
async fn test_threshold_filters_weak_matches() {
    let mut config = test_config();
    config.retrieval.similarity_threshold = Some(0.99);
    let harness = Harness::new(config);
    harness.pipeline.ingest(SKY_DOC, "sky").await.unwrap();

    let turn = harness.pipeline.answer("Is Rust fast?").await.unwrap();
    assert!(!turn.generated);
    assert_eq!(harness.llm.calls(), 0);
}

#[tokio::test]
async fn test_embedding_auth_failure_not_retried() {
    let embedder = Arc::new(RejectingEmbedder::new(DIMS));
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let llm = Arc::new(RecordingLlm::new());
    let pipeline = pipeline_with(test_config(), embedder.clone(), store.clone(), llm.clone());

    let err = pipeline.ingest(SKY_DOC, "sky").await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Embed));
    assert!(matches!(err.root(), Error::Authentication(_)));
    assert!(!err.is_retryable());
    assert_eq!(embedder.calls(), 1);
    assert!(store.is_empty());

    let err = pipeline.answer("What color is the sky?").await.unwrap_err();
    assert!(matches!(err.root(), Error::Authentication(_)));
    assert_eq!(embedder.calls(), 2);
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn test_generation_auth_failure_names_stage() {
    let embedder = Arc::new(HashEmbedder::new(DIMS));
    let store = Arc::new(InMemoryVectorStore::new(DIMS));
    let llm = Arc::new(RecordingLlm::rejecting());
    let pipeline = pipeline_with(test_config(), embedder, store, llm.clone());
    pipeline.ingest(SKY_DOC, "sky").await.unwrap();

    let err = pipeline.answer("What color is the sky?").await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Generate));
    assert!(matches!(err.root(), Error::Authentication(_)));
    assert_eq!(llm.calls(), 1);
}

#[tokio::test]
async fn test_transient_batch_failure_is_reported() {
    let mut config = test_config();
    config.vector_store.upsert_batch_size = 1;
    let store = Arc::new(FlakyStore::new(DIMS, &["long-1"], Failure::Transient));
    let pipeline = pipeline_with(
        config,
        Arc::new(HashEmbedder::new(DIMS)),
        store.clone(),
        Arc::new(RecordingLlm::new()),
    );

    let report = pipeline.ingest(LONG_DOC, "long").await.unwrap();
    assert!(!report.is_complete());
    assert_eq!(report.chunks_stored, report.chunks_total - 1);
    assert_eq!(report.failed_batches.len(), 1);

    let failed = &report.failed_batches[0];
    assert_eq!(failed.batch_index, 1);
    assert_eq!(failed.record_ids, vec!["long-1".to_string()]);
    assert!(failed.retryable);

    assert_eq!(store.upsert_calls.load(Ordering::SeqCst), report.chunks_total);
    assert_eq!(store.inner.len(), report.chunks_total - 1);
}

#[tokio::test]
async fn test_every_batch_failing_returns_error() {
    let store = Arc::new(FlakyStore::new(DIMS, &["sky-0", "sky-1"], Failure::Transient));
    let pipeline = pipeline_with(
        test_config(),
        Arc::new(HashEmbedder::new(DIMS)),
        store,
        Arc::new(RecordingLlm::new()),
    );

    let err = pipeline.ingest(SKY_DOC, "sky").await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Upsert));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_upsert_auth_failure_aborts() {
    let mut config = test_config();
    config.vector_store.upsert_batch_size = 1;
    let store = Arc::new(FlakyStore::new(DIMS, &["long-2"], Failure::Auth));
    let pipeline = pipeline_with(
        config,
        Arc::new(HashEmbedder::new(DIMS)),
        store,
        Arc::new(RecordingLlm::new()),
    );

    let err = pipeline.ingest(LONG_DOC, "long").await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Upsert));
    assert!(matches!(err.root(), Error::Authentication(_)));
}

#[tokio::test]
async fn test_ingest_many_keeps_input_order() {
    let harness = Harness::new(test_config());

    let documents = vec![
        ("sky".to_string(), SKY_DOC.to_string()),
        ("long".to_string(), LONG_DOC.to_string()),
        ("empty".to_string(), String::new()),
    ];
    let results = harness.pipeline.ingest_many(documents).await;

    let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["sky", "long", "empty"]);

    let stored: usize = results
        .iter()
        .map(|(_, r)| r.as_ref().unwrap().chunks_stored)
        .sum();
    assert_eq!(harness.store.len(), stored);
    assert_eq!(results[2].1.as_ref().unwrap().chunks_total, 0);
}

#[tokio::test]
async fn test_dimension_disagreement_rejected_at_construction() {
    let tokenizer = Arc::new(rag_chatbot::ingestion::BpeTokenizer::cl100k().unwrap());
    let result = RagPipeline::new(
        Arc::new(test_config()),
        tokenizer,
        Arc::new(HashEmbedder::new(8)),
        Arc::new(InMemoryVectorStore::new(16)),
        Arc::new(RecordingLlm::new()),
    );

    assert!(matches!(
        result.err(),
        Some(Error::DimensionMismatch { expected: 16, actual: 8 })
    ));
}

#[tokio::test]
async fn test_invalid_chunking_rejected_at_construction() {
    let mut config = test_config();
    config.chunking.overlap_tokens = config.chunking.max_tokens;
    let tokenizer = Arc::new(rag_chatbot::ingestion::BpeTokenizer::cl100k().unwrap());
    let result = RagPipeline::new(
        Arc::new(config),
        tokenizer,
        Arc::new(HashEmbedder::new(DIMS)),
        Arc::new(InMemoryVectorStore::new(DIMS)),
        Arc::new(RecordingLlm::new()),
    );

    assert!(matches!(result.err(), Some(Error::Config(_))));
}

#[tokio::test]
async fn test_health_reports_each_provider() {
    let pipeline = pipeline_with(
        test_config(),
        Arc::new(HashEmbedder::new(DIMS)),
        Arc::new(InMemoryVectorStore::new(DIMS)),
        Arc::new(RecordingLlm::rejecting()),
    );

    let health = pipeline.health().await;
    assert!(health.embedder);
    assert!(health.vector_store);
    assert!(!health.llm);
    assert!(!health.is_healthy());

    let stats = pipeline.index_stats().await.unwrap();
    assert_eq!(stats.dimension, DIMS);
    assert_eq!(pipeline.vector_store().dimension(), DIMS);
}
