//! expand → embed → search every backend → dedup → rerank.

use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use lexdb_core::config::EngineConfig;
use lexdb_core::error::{ConfigError, EmbeddingError, RetrieverError, VectorStoreError};
use lexdb_core::traits::{require_query_text, EmbeddingProvider, VectorIndexBackend};
use lexdb_core::types::{Filters, RawResult, RerankedResult};

use crate::dedup::dedup_by_id;
use crate::expander::QueryExpander;
use crate::manager::IndexManager;
use crate::reranker::Reranker;

/// What one expanded query contributed.
enum VariantOutcome {
    NotEmbedded(EmbeddingError),
    Searched(Vec<Result<Vec<RawResult>, VectorStoreError>>),
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    backends: Vec<Arc<dyn VectorIndexBackend>>,
    expander: QueryExpander,
    reranker: Reranker,
    top_k_default: usize,
    pool: rayon::ThreadPool,
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("backends", &self.backends.iter().map(|b| b.kind()).collect::<Vec<_>>())
            .field("expander", &self.expander)
            .field("top_k_default", &self.top_k_default)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Fails with [`RetrieverError::NoBackends`] when `backends` is empty.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        backends: Vec<Arc<dyn VectorIndexBackend>>,
        config: &EngineConfig,
    ) -> Result<Self, RetrieverError> {
        if backends.is_empty() {
            return Err(RetrieverError::NoBackends);
        }
        config.validate()?;
        if let Some(b) = backends.iter().find(|b| b.dim() != embedder.dim()) {
            return Err(ConfigError::invalid(
                "embedding_dim",
                format!("{} backend has dim {}, embedder produces {}", b.kind(), b.dim(), embedder.dim()),
            )
            .into());
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_embedding_workers.min(config.max_query_expansions))
            .thread_name(|i| format!("lexdb-retrieve-{i}"))
            .build()
            .map_err(|e| ConfigError::invalid("max_embedding_workers", e.to_string()))?;
        Ok(Self {
            embedder,
            backends,
            expander: QueryExpander::from_config(config),
            reranker: Reranker::from_config(config),
            top_k_default: config.top_k_default,
            pool,
        })
    }

    /// Every active store of `manager`, opening them if needed.
    pub fn from_manager(manager: &IndexManager, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, RetrieverError> {
        let stores = manager.get_active_stores()?;
        Self::new(embedder, stores.into_values().collect(), manager.config())
    }

    pub fn top_k_default(&self) -> usize { self.top_k_default }

    /// `top_k` falls back to the configured default. A failed search or
    /// embedding for one expanded query is logged and skipped; the call only
    /// fails when nothing could be searched.
    pub fn retrieve(&self, query: &str, top_k: Option<usize>, filters: &Filters) -> Result<Vec<RerankedResult>, RetrieverError> {
        let started = Instant::now();
        require_query_text(query)?;
        let top_k = match top_k {
            Some(0) => return Err(RetrieverError::InvalidTopK),
            Some(k) => k,
            None => self.top_k_default,
        };

        let variants = self.expander.expand(query);
        debug!(original = %variants[0], variants = variants.len(), "query expanded");

        // Collected in variant order regardless of completion order.
        let outcomes: Vec<VariantOutcome> =
            self.pool.install(|| variants.par_iter().map(|v| self.run_variant(v, top_k, filters)).collect());

        let raw = self.merge_outcomes(&variants, outcomes)?;
        let before = raw.len();
        let unique = dedup_by_id(raw);
        debug!(before, after = unique.len(), "deduplicated results");

        let ranked = self.reranker.rerank(query, unique, Some(top_k));
        info!(
            query = %query,
            results = ranked.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(ranked)
    }

    fn run_variant(&self, variant: &str, top_k: usize, filters: &Filters) -> VariantOutcome {
        match self.embedder.embed_query(variant) {
            Ok(vector) => VariantOutcome::Searched(self.backends.iter().map(|b| b.search(&vector, top_k, filters)).collect()),
            Err(e) => VariantOutcome::NotEmbedded(e),
        }
    }

    fn merge_outcomes(&self, variants: &[String], outcomes: Vec<VariantOutcome>) -> Result<Vec<RawResult>, RetrieverError> {
        let mut raw = Vec::new();
        let mut first_embed_error = None;
        let (mut attempts, mut failures) = (0usize, 0usize);
        let mut last_error = None;

        for (variant, outcome) in variants.iter().zip(outcomes) {
            match outcome {
                VariantOutcome::NotEmbedded(e) => {
                    warn!(variant = %variant, error = %e, "embedding failed, variant dropped");
                    if first_embed_error.is_none() { first_embed_error = Some(e); }
                }
                VariantOutcome::Searched(per_backend) => {
                    for (backend, result) in self.backends.iter().zip(per_backend) {
                        attempts += 1;
                        match result {
                            Ok(hits) => raw.extend(hits),
                            Err(e) => {
                                warn!(variant = %variant, backend = %backend.kind(), error = %e, "search failed, contribution dropped");
                                failures += 1;
                                last_error = Some(e.to_string());
                            }
                        }
                    }
                }
            }
        }

        if attempts == 0 {
            if let Some(e) = first_embed_error {
                return Err(e.into());
            }
        }
        if attempts > 0 && failures == attempts {
            return Err(RetrieverError::AllSearchesFailed { attempts, last_error: last_error.unwrap_or_default() });
        }
        Ok(raw)
    }
}
