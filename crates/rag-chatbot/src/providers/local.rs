//! Process-local vector store
//!
//! Holds records in memory and ranks them by cosine similarity. Used for
//! development without a Pinecone account and as the index in tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{IndexStats, IndexedRecord, RecordMetadata, RetrievedChunk, RetrievedContext};

use super::vector_store::{check_batch, check_dimension, VectorStoreProvider};

#[derive(Debug, Clone)]
struct StoredVector {
    vector: Vec<f32>,
    metadata: RecordMetadata,
}

/// In-memory cosine index keyed by record id
pub struct InMemoryVectorStore {
    dimension: usize,
    records: RwLock<BTreeMap<String, StoredVector>>,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of `dimension` entries
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Metadata stored under `id`
    pub fn metadata(&self, id: &str) -> Option<RecordMetadata> {
        self.records.read().get(id).map(|r| r.metadata.clone())
    }

    /// Stored record ids in ascending order
    pub fn ids(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// Drop every record
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize> {
        check_batch(self.dimension, records)?;

        let mut stored = self.records.write();
        for record in records {
            stored.insert(
                record.id.clone(),
                StoredVector {
                    vector: record.vector.clone(),
                    metadata: record.metadata.clone(),
                },
            );
        }
        Ok(records.len())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<RetrievedContext> {
        check_dimension(self.dimension, vector)?;

        // BTreeMap iteration is id-ordered, so the stable ranking breaks ties by id
        let matches = self
            .records
            .read()
            .iter()
            .map(|(id, stored)| RetrievedChunk {
                id: id.clone(),
                text: stored.metadata.text.clone(),
                score: cosine_similarity(vector, &stored.vector),
            })
            .collect();

        Ok(RetrievedContext::ranked(matches, top_k))
    }

    async fn describe(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            dimension: self.dimension,
            total_vector_count: self.len() as u64,
        })
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Cosine similarity in [-1, 1]; zero vectors score 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
