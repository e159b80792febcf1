//! In-process exact vector index with explicit directory persistence.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use lexdb_core::error::VectorStoreError;
use lexdb_core::traits::VectorIndexBackend;
use lexdb_core::types::{BackendKind, Filters, Metadata, RawResult, SimilarityMetric, UpsertBatch};

use crate::math::{prepare, similarity};
use crate::persist::{read_snapshot, write_snapshot, Snapshot};

#[derive(Default)]
struct FlatState {
    ids: Vec<String>,
    texts: Vec<String>,
    metadatas: Vec<Metadata>,
    /// Row-major, `ids.len() * dim` values, already prepared for the metric.
    vectors: Vec<f32>,
    slots: HashMap<String, usize>,
}

impl FlatState {
    fn from_snapshot(s: Snapshot) -> Self {
        let slots = s.ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        Self { ids: s.ids, texts: s.texts, metadatas: s.metadatas, vectors: s.vectors, slots }
    }

    fn reindex(&mut self) {
        self.slots = self.ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
    }
}

/// Brute-force index: every search scores every stored vector.
///
/// Scores are exact and ties keep insertion order, so identical queries give
/// identical output across runs and across a persist/load cycle. Reads take a
/// shared lock; writes are expected from a single writer.
pub struct FlatIndex {
    dim: usize,
    metric: SimilarityMetric,
    dir: Option<PathBuf>,
    state: RwLock<FlatState>,
}

impl std::fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("dim", &self.dim)
            .field("metric", &self.metric)
            .field("dir", &self.dir)
            .field("len", &self.state.read().ids.len())
            .finish()
    }
}

impl FlatIndex {
    /// Memory-only index; `persist()` does nothing.
    pub fn new(dim: usize, metric: SimilarityMetric) -> Self {
        Self { dim, metric, dir: None, state: RwLock::new(FlatState::default()) }
    }

    /// Index backed by `dir`, loading whatever a previous `persist()` left there.
    pub fn open(dir: impl Into<PathBuf>, dim: usize, metric: SimilarityMetric) -> Result<Self, VectorStoreError> {
        let dir = dir.into();
        let state = match read_snapshot(&dir, dim, metric)? {
            Some(snapshot) => FlatState::from_snapshot(snapshot),
            None => FlatState::default(),
        };
        info!(backend = "flat", dir = %dir.display(), dim, %metric, count = state.ids.len(), "flat index opened");
        Ok(Self { dim, metric, dir: Some(dir), state: RwLock::new(state) })
    }

    pub fn dir(&self) -> Option<&Path> { self.dir.as_deref() }

    pub fn ids(&self) -> Vec<String> { self.state.read().ids.clone() }

    /// Stored (prepared) vector for `id`.
    pub fn vector(&self, id: &str) -> Option<Vec<f32>> {
        let state = self.state.read();
        let slot = *state.slots.get(id)?;
        Some(state.vectors[slot * self.dim..(slot + 1) * self.dim].to_vec())
    }
}

impl VectorIndexBackend for FlatIndex {
    fn kind(&self) -> BackendKind { BackendKind::Flat }

    fn metric(&self) -> SimilarityMetric { self.metric }

    fn dim(&self) -> usize { self.dim }

    fn add_or_update(&self, batch: &UpsertBatch) -> Result<(), VectorStoreError> {
        batch.validate(self.dim)?;
        let mut state = self.state.write();
        let (mut inserted, mut updated) = (0usize, 0usize);
        for i in batch.last_write_positions() {
            let v = prepare(self.metric, &batch.embeddings[i]);
            let id = &batch.ids[i];
            if let Some(&slot) = state.slots.get(id) {
                state.texts[slot] = batch.texts[i].clone();
                state.metadatas[slot] = batch.metadatas[i].clone();
                state.vectors[slot * self.dim..(slot + 1) * self.dim].copy_from_slice(&v);
                updated += 1;
            } else {
                let slot = state.ids.len();
                state.ids.push(id.clone());
                state.texts.push(batch.texts[i].clone());
                state.metadatas.push(batch.metadatas[i].clone());
                state.vectors.extend_from_slice(&v);
                state.slots.insert(id.clone(), slot);
                inserted += 1;
            }
        }
        debug!(backend = "flat", inserted, updated, count = state.ids.len(), "upsert applied");
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize, filters: &Filters) -> Result<Vec<RawResult>, VectorStoreError> {
        if query.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let state = self.state.read();
        if top_k == 0 || state.ids.is_empty() { return Ok(Vec::new()); }

        let q = prepare(self.metric, query);
        let mut scored: Vec<(usize, f32)> = (0..state.ids.len())
            .filter(|&slot| filters.is_empty() || state.metadatas[slot].matches(filters))
            .map(|slot| (slot, similarity(self.metric, &state.vectors[slot * self.dim..(slot + 1) * self.dim], &q)))
            .collect();
        // Stable: equal scores keep slot order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(slot, score)| RawResult {
                id: state.ids[slot].clone(),
                text: state.texts[slot].clone(),
                metadata: state.metadatas[slot].clone(),
                similarity_score: score,
                source: BackendKind::Flat,
            })
            .collect())
    }

    fn delete(&self, ids: &[String]) -> Result<usize, VectorStoreError> {
        let mut state = self.state.write();
        let mut doomed: Vec<usize> = ids.iter().filter_map(|id| state.slots.get(id).copied()).collect();
        doomed.sort_unstable();
        doomed.dedup();
        for &slot in doomed.iter().rev() {
            state.ids.remove(slot);
            state.texts.remove(slot);
            state.metadatas.remove(slot);
            state.vectors.drain(slot * self.dim..(slot + 1) * self.dim);
        }
        if !doomed.is_empty() { state.reindex(); }
        debug!(backend = "flat", removed = doomed.len(), count = state.ids.len(), "delete applied");
        Ok(doomed.len())
    }

    fn count(&self) -> Result<usize, VectorStoreError> { Ok(self.state.read().ids.len()) }

    fn persist(&self) -> Result<(), VectorStoreError> {
        let Some(dir) = &self.dir else {
            debug!(backend = "flat", "memory-only index, nothing to persist");
            return Ok(());
        };
        let snapshot = {
            let state = self.state.read();
            Snapshot {
                dim: self.dim,
                metric: self.metric,
                ids: state.ids.clone(),
                texts: state.texts.clone(),
                metadatas: state.metadatas.clone(),
                vectors: state.vectors.clone(),
            }
        };
        write_snapshot(dir, &snapshot)?;
        info!(backend = "flat", dir = %dir.display(), count = snapshot.ids.len(), "flat index persisted");
        Ok(())
    }
}
