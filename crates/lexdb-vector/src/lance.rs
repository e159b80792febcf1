//! Managed collection backend on LanceDB.
//!
//! LanceDB persists every write itself, so [`LanceStore::persist`] is a no-op.
//! The store owns a Tokio runtime and exposes the synchronous backend API.

use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info};

use lexdb_core::error::VectorStoreError;
use lexdb_core::traits::VectorIndexBackend;
use lexdb_core::types::{BackendKind, Filters, Metadata, RawResult, SimilarityMetric, UpsertBatch};

use crate::filter::{id_in, plan};
use crate::schema::{build_record_schema, vector_dim, ID_COL, METADATA_COL, TEXT_COL};
use crate::table::{ensure_table, open_db};

/// Candidate multiplier when some filters can only be checked after the search.
pub const OVERFETCH_FACTOR: usize = 10;

fn backend<E: std::fmt::Display>(e: E) -> VectorStoreError { VectorStoreError::Backend(e.to_string()) }

fn distance_type(metric: SimilarityMetric) -> DistanceType {
    match metric {
        SimilarityMetric::Cosine => DistanceType::Cosine,
        SimilarityMetric::L2 => DistanceType::L2,
    }
}

/// Run `fut` to completion from sync code, reusing the caller's runtime when
/// there is one.
fn block_on<F, T>(runtime: &Runtime, fut: F) -> Result<T, VectorStoreError>
where
    F: Future<Output = Result<T, VectorStoreError>>,
{
    match Handle::try_current() {
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(fut)),
        Err(_) => runtime.block_on(fut),
    }
}

pub struct LanceStore {
    runtime: Runtime,
    table: Table,
    collection: String,
    dim: usize,
    metric: SimilarityMetric,
}

impl std::fmt::Debug for LanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanceStore")
            .field("collection", &self.collection)
            .field("dim", &self.dim)
            .field("metric", &self.metric)
            .finish_non_exhaustive()
    }
}

impl LanceStore {
    /// Open (creating if needed) `collection` in the database at `dir`.
    pub fn open(dir: impl AsRef<Path>, collection: &str, dim: usize, metric: SimilarityMetric) -> Result<Self, VectorStoreError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| VectorStoreError::io(dir, e))?;
        let dim_i32 = i32::try_from(dim).map_err(|_| VectorStoreError::Backend(format!("dimension {dim} is too large")))?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| VectorStoreError::io(dir, e))?;
        let uri = dir.to_string_lossy().to_string();

        let table = block_on(&runtime, async {
            let conn = open_db(&uri).await.map_err(backend)?;
            let created = ensure_table(&conn, collection, build_record_schema(dim_i32)).await.map_err(backend)?;
            if created { debug!(collection, "created lance table"); }
            let table = conn.open_table(collection).execute().await.map_err(backend)?;
            let schema = table.schema().await.map_err(backend)?;
            match vector_dim(&schema) {
                Some(n) if n == dim_i32 => Ok(table),
                Some(n) => Err(VectorStoreError::DimensionMismatch { expected: dim, actual: usize::try_from(n).unwrap_or(0) }),
                None => Err(VectorStoreError::corrupt(dir, format!("table '{collection}' has no vector column"))),
            }
        })?;

        let store = Self { runtime, table, collection: collection.to_string(), dim, metric };
        let count = store.count()?;
        info!(backend = "lance", uri = %uri, collection, dim, %metric, count, "lance store opened");
        Ok(store)
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T, VectorStoreError>
    where
        F: Future<Output = Result<T, VectorStoreError>>,
    {
        block_on(&self.runtime, fut)
    }

    async fn nearest(&self, query: &[f32], limit: usize, predicate: Option<&str>) -> Result<Vec<RecordBatch>, VectorStoreError> {
        let mut q = self
            .table
            .vector_search(query.to_vec())
            .map_err(backend)?
            .distance_type(distance_type(self.metric))
            .limit(limit);
        if let Some(predicate) = predicate {
            q = q.only_if(predicate);
        }
        let stream = q.execute().await.map_err(backend)?;
        stream.try_collect::<Vec<RecordBatch>>().await.map_err(backend)
    }

    fn to_record_batch(&self, batch: &UpsertBatch, positions: &[usize]) -> Result<RecordBatch, VectorStoreError> {
        let dim = i32::try_from(self.dim).map_err(backend)?;
        let schema = build_record_schema(dim);
        let column = |pick: fn(&Metadata) -> Option<&String>| -> StringArray {
            positions.iter().map(|&i| pick(&batch.metadatas[i]).cloned()).collect()
        };
        let metadata_json = positions
            .iter()
            .map(|&i| serde_json::to_string(&batch.metadatas[i]))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
        let vectors = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            positions.iter().map(|&i| Some(batch.embeddings[i].iter().copied().map(Some))),
            dim,
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from_iter_values(positions.iter().map(|&i| batch.ids[i].as_str()))),
                Arc::new(StringArray::from_iter_values(positions.iter().map(|&i| batch.texts[i].as_str()))),
                Arc::new(column(|m| m.title.as_ref())),
                Arc::new(column(|m| m.heading.as_ref())),
                Arc::new(column(|m| m.section.as_ref())),
                Arc::new(column(|m| m.year.as_ref())),
                Arc::new(column(|m| m.assessment_year.as_ref())),
                Arc::new(StringArray::from(metadata_json)),
                Arc::new(vectors),
            ],
        )
        .map_err(|e| VectorStoreError::Serialization(e.to_string()))
    }

    fn rows_to_results(&self, batch: &RecordBatch, filters: &Filters, post_filter: bool, out: &mut Vec<RawResult>) -> Result<(), VectorStoreError> {
        let strings = |name: &str| {
            batch
                .column_by_name(name)
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| VectorStoreError::Serialization(format!("missing {name} column")))
        };
        let ids = strings(ID_COL)?;
        let texts = strings(TEXT_COL)?;
        let metas = strings(METADATA_COL)?;
        let distances = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
            .ok_or_else(|| VectorStoreError::Serialization("missing _distance column".into()))?;

        for i in 0..batch.num_rows() {
            let metadata: Metadata =
                serde_json::from_str(metas.value(i)).map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
            if post_filter && !metadata.matches(filters) { continue; }
            let distance = distances.value(i);
            let similarity_score = match self.metric {
                SimilarityMetric::Cosine => 1.0 - distance,
                SimilarityMetric::L2 => -distance,
            };
            out.push(RawResult {
                id: ids.value(i).to_string(),
                text: texts.value(i).to_string(),
                metadata,
                similarity_score,
                source: BackendKind::Lance,
            });
        }
        Ok(())
    }
}

impl VectorIndexBackend for LanceStore {
    fn kind(&self) -> BackendKind { BackendKind::Lance }

    fn metric(&self) -> SimilarityMetric { self.metric }

    fn dim(&self) -> usize { self.dim }

    fn add_or_update(&self, batch: &UpsertBatch) -> Result<(), VectorStoreError> {
        batch.validate(self.dim)?;
        if batch.is_empty() { return Ok(()); }
        // merge_insert rejects duplicate source keys
        let positions = batch.last_write_positions();
        let rb = self.to_record_batch(batch, &positions)?;
        let schema = rb.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
        self.block_on(async {
            let mut mi = self.table.merge_insert(&[ID_COL]);
            mi.when_matched_update_all(None).when_not_matched_insert_all();
            mi.execute(reader).await.map_err(backend)?;
            Ok(())
        })?;
        debug!(backend = "lance", collection = %self.collection, rows = positions.len(), "upsert applied");
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize, filters: &Filters) -> Result<Vec<RawResult>, VectorStoreError> {
        if query.len() != self.dim {
            return Err(VectorStoreError::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        if top_k == 0 { return Ok(Vec::new()); }

        let plan = plan(filters);
        // Rows the pushed-down predicate admits; the ceiling for widening.
        let candidates = self.block_on(async { self.table.count_rows(plan.predicate.clone()).await.map_err(backend) })?;
        if candidates == 0 { return Ok(Vec::new()); }

        let first = if plan.post_filter { top_k.saturating_mul(OVERFETCH_FACTOR) } else { top_k };
        let mut limit = first.min(candidates);
        loop {
            let batches = self.block_on(self.nearest(query, limit, plan.predicate.as_deref()))?;
            let mut out = Vec::new();
            for batch in &batches {
                self.rows_to_results(batch, filters, plan.post_filter, &mut out)?;
            }
            if !plan.post_filter || out.len() >= top_k || limit >= candidates {
                out.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
                out.truncate(top_k);
                return Ok(out);
            }
            debug!(backend = "lance", collection = %self.collection, limit, kept = out.len(), top_k, "post-filter under-filled, widening");
            limit = limit.saturating_mul(2).min(candidates);
        }
    }

    fn delete(&self, ids: &[String]) -> Result<usize, VectorStoreError> {
        if ids.is_empty() { return Ok(0); }
        let predicate = id_in(ids);
        let removed = self.block_on(async {
            let matched = self.table.count_rows(Some(predicate.clone())).await.map_err(backend)?;
            if matched > 0 {
                self.table.delete(&predicate).await.map_err(backend)?;
            }
            Ok(matched)
        })?;
        debug!(backend = "lance", collection = %self.collection, removed, "delete applied");
        Ok(removed)
    }

    fn count(&self) -> Result<usize, VectorStoreError> {
        self.block_on(async { self.table.count_rows(None).await.map_err(backend) })
    }

    fn persist(&self) -> Result<(), VectorStoreError> {
        debug!(backend = "lance", collection = %self.collection, "lance persists on write");
        Ok(())
    }
}
