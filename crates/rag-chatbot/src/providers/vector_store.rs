//! Vector store provider trait for upserting and querying records

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{IndexStats, IndexedRecord, RetrievedContext};

/// Trait for a similarity index holding chunk vectors
///
/// Implementations:
/// - `PineconeStore`: managed Pinecone serverless index
/// - `InMemoryVectorStore`: process-local cosine index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert or overwrite records by id. Returns the number stored.
    async fn upsert(&self, records: &[IndexedRecord]) -> Result<usize>;

    /// At most `top_k` records, ranked by descending similarity to `vector`
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<RetrievedContext>;

    /// Index dimension and record count
    async fn describe(&self) -> Result<IndexStats>;

    /// Declared dimension of the index
    fn dimension(&self) -> usize;

    /// Check if the index is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Fail with `DimensionMismatch` unless `vector` has `expected` entries
pub fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Validate a batch before it is written: matching dimensions, unique ids
pub fn check_batch(expected: usize, records: &[IndexedRecord]) -> Result<()> {
    let mut seen = std::collections::HashSet::with_capacity(records.len());
    for record in records {
        check_dimension(expected, &record.vector)?;
        if record.id.is_empty() {
            return Err(Error::invalid("record id must not be empty"));
        }
        if !seen.insert(record.id.as_str()) {
            return Err(Error::invalid(format!(
                "duplicate record id '{}' in upsert batch",
                record.id
            )));
        }
    }
    Ok(())
}
