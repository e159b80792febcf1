//! Error kinds shared by every lexdb crate.
//!
//! Each subsystem gets its own enum so callers can tell an embedding
//! failure from a backend failure; [`Error`] wraps all of them for code
//! that does not care.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::SimilarityMetric;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("query text cannot be empty")]
    EmptyQuery,

    #[error("embedding model failed: {0}")]
    Model(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedder returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("ids ({ids}), texts ({texts}), embeddings ({embeddings}) and metadatas ({metadatas}) must have the same length")]
    LengthMismatch { ids: usize, texts: usize, embeddings: usize, metadatas: usize },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index was built with metric {found}, configured metric is {expected}")]
    MetricMismatch { expected: SimilarityMetric, found: SimilarityMetric },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt index at {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl VectorStoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Corrupt { path: path.into(), reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one vector backend must be enabled")]
    NoBackendsEnabled,

    #[error("embedding dimension must be a positive integer, got {0}")]
    InvalidEmbeddingDim(usize),

    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(String),
}

impl ConfigError {
    pub fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { key: key.to_string(), reason: reason.into() }
    }
}

#[derive(Debug, Error)]
pub enum RetrieverError {
    #[error("at least one vector backend must be configured")]
    NoBackends,

    #[error("top_k must be a positive integer")]
    InvalidTopK,

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error("all {attempts} searches failed; last error: {last_error}")]
    AllSearchesFailed { attempts: usize, last_error: String },

    #[error(transparent)]
    Store(#[from] VectorStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Umbrella error for callers that mix subsystems.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    VectorStore(#[from] VectorStoreError),

    #[error(transparent)]
    Retriever(#[from] RetrieverError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
