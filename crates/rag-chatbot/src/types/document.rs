//! Chunk, index record and retrieval types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token-bounded excerpt of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Record id (`{source_id}-{chunk_index}`)
    pub id: String,
    /// Decoded chunk text
    pub text: String,
    /// Position of the chunk within its document
    pub chunk_index: usize,
    /// Offset of the first token within the source token sequence
    pub source_offset: usize,
    /// Number of tokens in the chunk
    pub token_count: usize,
}

impl Chunk {
    /// Deterministic record id for a chunk of a source document
    pub fn record_id(source_id: &str, chunk_index: usize) -> String {
        format!("{}-{}", source_id, chunk_index)
    }
}

/// Metadata stored alongside each vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Chunk text; read back at query time as context
    pub text: String,
    /// Document the chunk came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Chunk position within the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    /// Token offset within the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_offset: Option<usize>,
    /// Token count of the chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    /// Any further fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RecordMetadata {
    /// Metadata carrying only the text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_id: None,
            chunk_index: None,
            source_offset: None,
            token_count: None,
            extra: BTreeMap::new(),
        }
    }

    /// Metadata for a chunk of a source document
    pub fn for_chunk(source_id: &str, chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            source_id: Some(source_id.to_string()),
            chunk_index: Some(chunk.chunk_index),
            source_offset: Some(chunk.source_offset),
            token_count: Some(chunk.token_count),
            extra: BTreeMap::new(),
        }
    }
}

/// Vector plus metadata as written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    /// Unique id within the index
    pub id: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Metadata; `text` is mandatory
    pub metadata: RecordMetadata,
}

impl IndexedRecord {
    /// Build the record for an embedded chunk
    pub fn from_chunk(source_id: &str, chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            vector,
            metadata: RecordMetadata::for_chunk(source_id, chunk),
        }
    }
}

/// One match returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Record id
    pub id: String,
    /// Stored chunk text
    pub text: String,
    /// Similarity score (cosine: roughly -1.0 to 1.0, higher is closer)
    pub score: f32,
}

/// Matches ranked by descending score, at most `top_k` long
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    matches: Vec<RetrievedChunk>,
}

impl RetrievedContext {
    /// Rank matches by descending score and keep the best `top_k`.
    /// The sort is stable, so equal scores keep the order the index returned.
    pub fn ranked(mut matches: Vec<RetrievedChunk>, top_k: usize) -> Self {
        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Self { matches }
    }

    /// Drop matches scoring below `threshold`
    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        if let Some(threshold) = threshold {
            self.matches.retain(|m| m.score >= threshold);
        }
        self
    }

    pub fn matches(&self) -> &[RetrievedChunk] {
        &self.matches
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Chunk texts in rank order
    pub fn texts(&self) -> Vec<String> {
        self.matches.iter().map(|m| m.text.clone()).collect()
    }

    pub fn into_matches(self) -> Vec<RetrievedChunk> {
        self.matches
    }
}
