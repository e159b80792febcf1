//! Owns backend instances and opens each one on first use.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use lexdb_core::config::EngineConfig;
use lexdb_core::error::{Error, VectorStoreError};
use lexdb_core::traits::VectorIndexBackend;
use lexdb_core::types::BackendKind;
use lexdb_vector::{FlatIndex, LanceStore};

pub const FLAT_SUBDIR: &str = "flat";
pub const LANCE_SUBDIR: &str = "lance";

/// Lazily opened stores under `base_path`.
///
/// Construction validates the configuration and only then creates one
/// subdirectory per enabled backend. Each store is opened at most once, under
/// its own lock, the first time it is requested.
pub struct IndexManager {
    config: EngineConfig,
    flat: Mutex<Option<Arc<FlatIndex>>>,
    lance: Mutex<Option<Arc<LanceStore>>>,
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("base_path", &self.config.base_path)
            .field("enabled", &self.config.enabled_backends)
            .field("initialized", &self.initialized())
            .finish()
    }
}

impl IndexManager {
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        for kind in &config.enabled_backends {
            let dir = backend_dir(&config.base_path, *kind);
            std::fs::create_dir_all(&dir).map_err(|e| VectorStoreError::io(&dir, e))?;
        }
        info!(
            base_path = %config.base_path.display(),
            backends = ?config.enabled_backends,
            dim = config.embedding_dim,
            metric = %config.similarity_metric,
            "index manager ready"
        );
        Ok(Self { config, flat: Mutex::new(None), lance: Mutex::new(None) })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn flat_store(&self) -> Result<Option<Arc<FlatIndex>>, VectorStoreError> {
        if !self.config.backend_enabled(BackendKind::Flat) { return Ok(None); }
        let mut slot = self.flat.lock();
        if let Some(store) = slot.as_ref() { return Ok(Some(Arc::clone(store))); }
        let dir = backend_dir(&self.config.base_path, BackendKind::Flat);
        let store = Arc::new(FlatIndex::open(dir, self.config.embedding_dim, self.config.similarity_metric)?);
        *slot = Some(Arc::clone(&store));
        Ok(Some(store))
    }

    pub fn lance_store(&self) -> Result<Option<Arc<LanceStore>>, VectorStoreError> {
        if !self.config.backend_enabled(BackendKind::Lance) { return Ok(None); }
        let mut slot = self.lance.lock();
        if let Some(store) = slot.as_ref() { return Ok(Some(Arc::clone(store))); }
        let dir = backend_dir(&self.config.base_path, BackendKind::Lance);
        let store = Arc::new(LanceStore::open(
            dir,
            &self.config.collection,
            self.config.embedding_dim,
            self.config.similarity_metric,
        )?);
        *slot = Some(Arc::clone(&store));
        Ok(Some(store))
    }

    pub fn get_store(&self, kind: BackendKind) -> Result<Option<Arc<dyn VectorIndexBackend>>, VectorStoreError> {
        Ok(match kind {
            BackendKind::Flat => self.flat_store()?.map(|s| s as Arc<dyn VectorIndexBackend>),
            BackendKind::Lance => self.lance_store()?.map(|s| s as Arc<dyn VectorIndexBackend>),
        })
    }

    /// Enabled backend kind → instance, opening any not yet opened.
    pub fn get_active_stores(&self) -> Result<BTreeMap<BackendKind, Arc<dyn VectorIndexBackend>>, VectorStoreError> {
        let mut out = BTreeMap::new();
        for kind in &self.config.enabled_backends {
            if let Some(store) = self.get_store(*kind)? {
                out.insert(*kind, store);
            }
        }
        Ok(out)
    }

    /// Remove `ids` from every enabled store; no embedding model involved.
    pub fn delete(&self, ids: &[String]) -> Result<BTreeMap<BackendKind, usize>, VectorStoreError> {
        let mut removed = BTreeMap::new();
        for (kind, store) in self.get_active_stores()? {
            removed.insert(kind, store.delete(ids)?);
        }
        info!(requested = ids.len(), removed = ?removed, "delete complete");
        Ok(removed)
    }

    /// Record count per enabled store.
    pub fn counts(&self) -> Result<BTreeMap<BackendKind, usize>, VectorStoreError> {
        self.get_active_stores()?.into_iter().map(|(kind, store)| Ok((kind, store.count()?))).collect()
    }

    /// Kinds opened so far.
    pub fn initialized(&self) -> Vec<BackendKind> {
        let mut kinds = Vec::new();
        if self.flat.lock().is_some() { kinds.push(BackendKind::Flat); }
        if self.lance.lock().is_some() { kinds.push(BackendKind::Lance); }
        kinds
    }

    /// Persist every opened store. Stores never opened have nothing new to write.
    pub fn persist_all(&self) -> Result<(), VectorStoreError> {
        let opened: Vec<Arc<dyn VectorIndexBackend>> = {
            let mut v: Vec<Arc<dyn VectorIndexBackend>> = Vec::new();
            if let Some(s) = self.flat.lock().as_ref() { v.push(Arc::clone(s) as Arc<dyn VectorIndexBackend>); }
            if let Some(s) = self.lance.lock().as_ref() { v.push(Arc::clone(s) as Arc<dyn VectorIndexBackend>); }
            v
        };
        for store in &opened {
            store.persist()?;
        }
        debug!(persisted = opened.len(), "persist_all done");
        Ok(())
    }
}

pub fn backend_dir(base: &Path, kind: BackendKind) -> PathBuf {
    base.join(match kind {
        BackendKind::Flat => FLAT_SUBDIR,
        BackendKind::Lance => LANCE_SUBDIR,
    })
}
