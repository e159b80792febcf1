//! Embedding providers: local BGE-M3 via candle, a deterministic hashing
//! embedder, and a timeout wrapper for either.

pub mod device;
pub mod hashing;
pub mod model;
pub mod pool;
pub mod timeout;
pub mod tokenize;

use std::sync::Arc;

use lexdb_core::config::EngineConfig;
use lexdb_core::error::EmbeddingError;
use lexdb_core::traits::EmbeddingProvider;
use tracing::info;

pub use device::select_device;
pub use hashing::HashEmbedder;
pub use model::{BgeM3Provider, BGE_M3_DIM, BGE_M3_MAX_TOKENS};
pub use pool::masked_mean_l2;
pub use timeout::TimeoutEmbedder;
pub use tokenize::tokenize_on_device;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// `HashEmbedder` when `APP_USE_FAKE_EMBEDDINGS` is set, otherwise BGE-M3.
/// Fails if the provider's dimension differs from `dim`.
pub fn default_provider(dim: usize) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    if use_fake_embeddings() {
        info!(dim, "using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::new(dim)));
    }
    let model = BgeM3Provider::new().map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;
    if model.dim() != dim {
        return Err(EmbeddingError::DimensionMismatch { expected: dim, actual: model.dim() });
    }
    Ok(Arc::new(model))
}

/// [`default_provider`] wrapped in a [`TimeoutEmbedder`] when the engine sets a timeout.
pub fn configured_provider(config: &EngineConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let provider = default_provider(config.embedding_dim)?;
    Ok(match config.embed_timeout() {
        Some(timeout) => Arc::new(TimeoutEmbedder::new(provider, timeout)),
        None => provider,
    })
}
