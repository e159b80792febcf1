//! Embed ingested records and upsert them into every active backend.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use lexdb_core::error::{ConfigError, EmbeddingError, Error, VectorStoreError};
use lexdb_core::ingest::IngestRecord;
use lexdb_core::traits::{EmbeddingProvider, VectorIndexBackend};
use lexdb_core::types::{BackendKind, UpsertBatch};

use crate::manager::IndexManager;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub records: usize,
    pub batches: usize,
    pub backends: Vec<BackendKind>,
}

pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    stores: Vec<Arc<dyn VectorIndexBackend>>,
    batch_size: usize,
}

impl Indexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        stores: Vec<Arc<dyn VectorIndexBackend>>,
        batch_size: usize,
    ) -> Result<Self, Error> {
        if stores.is_empty() {
            return Err(ConfigError::NoBackendsEnabled.into());
        }
        if batch_size == 0 {
            return Err(ConfigError::invalid("ingest_batch_size", "must be a positive integer").into());
        }
        Ok(Self { embedder, stores, batch_size })
    }

    pub fn from_manager(manager: &IndexManager, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, Error> {
        let stores = manager.get_active_stores()?.into_values().collect();
        Self::new(embedder, stores, manager.config().ingest_batch_size)
    }

    pub fn index(&self, records: &[IngestRecord]) -> Result<IndexReport, Error> { self.index_with(records, |_| {}) }

    /// Like [`Indexer::index`], calling `on_batch(n)` after each batch of `n` records lands.
    pub fn index_with(&self, records: &[IngestRecord], mut on_batch: impl FnMut(usize)) -> Result<IndexReport, Error> {
        let mut batches = 0usize;
        for chunk in records.chunks(self.batch_size) {
            let texts: Vec<String> = chunk.iter().map(|r| r.text.clone()).collect();
            let embeddings = self.embedder.embed_documents(&texts)?;
            if embeddings.len() != texts.len() {
                return Err(EmbeddingError::CountMismatch { expected: texts.len(), actual: embeddings.len() }.into());
            }
            let batch = UpsertBatch::new(
                chunk.iter().map(|r| r.id.clone()).collect(),
                texts,
                embeddings,
                chunk.iter().map(|r| r.metadata.clone()).collect(),
            );
            for store in &self.stores {
                store.add_or_update(&batch)?;
            }
            batches += 1;
            debug!(batch = batches, size = chunk.len(), "batch indexed");
            on_batch(chunk.len());
        }
        let report = IndexReport {
            records: records.len(),
            batches,
            backends: self.stores.iter().map(|s| s.kind()).collect(),
        };
        info!(records = report.records, batches = report.batches, backends = ?report.backends, "indexing complete");
        Ok(report)
    }

    /// Remove `ids` from every store; returns how many each store removed.
    pub fn delete(&self, ids: &[String]) -> Result<BTreeMap<BackendKind, usize>, VectorStoreError> {
        let mut removed = BTreeMap::new();
        for store in &self.stores {
            removed.insert(store.kind(), store.delete(ids)?);
        }
        info!(requested = ids.len(), removed = ?removed, "delete complete");
        Ok(removed)
    }
}
