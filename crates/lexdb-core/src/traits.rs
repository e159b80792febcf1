use crate::error::{EmbeddingError, VectorStoreError};
use crate::types::{BackendKind, Filters, RawResult, SimilarityMetric, UpsertBatch};

/// Text to fixed-length vectors. Every vector from one instance has `dim()` entries.
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;

    /// Empty input returns an empty list without touching the model.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Fails with [`EmbeddingError::EmptyQuery`] on blank text.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// One vector index. Implementations are safe for concurrent readers; callers
/// serialize writes to a given instance.
pub trait VectorIndexBackend: Send + Sync {
    fn kind(&self) -> BackendKind;
    fn metric(&self) -> SimilarityMetric;
    fn dim(&self) -> usize;

    /// Upsert by id. The batch is validated before any mutation.
    fn add_or_update(&self, batch: &UpsertBatch) -> Result<(), VectorStoreError>;

    /// At most `top_k` results, descending by similarity. Empty index or no
    /// match yields `Ok(vec![])`.
    fn search(&self, query: &[f32], top_k: usize, filters: &Filters) -> Result<Vec<RawResult>, VectorStoreError>;

    /// Removes the given ids, ignoring unknown ones. Returns how many were removed.
    fn delete(&self, ids: &[String]) -> Result<usize, VectorStoreError>;

    fn count(&self) -> Result<usize, VectorStoreError>;

    /// Flush to durable storage. A no-op for self-persisting backends.
    fn persist(&self) -> Result<(), VectorStoreError>;
}

/// Shared guard for query-side calls.
pub fn require_query_text(text: &str) -> Result<&str, EmbeddingError> {
    let trimmed = text.trim();
    if trimmed.is_empty() { Err(EmbeddingError::EmptyQuery) } else { Ok(trimmed) }
}
