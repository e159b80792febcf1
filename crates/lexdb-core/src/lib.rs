pub mod config;
pub mod error;
pub mod ingest;
pub mod traits;
pub mod types;

pub use config::{expand_path, resolve_with_base, Config, EngineConfig, ExpansionConfig, RecencyTier, RerankerConfig};
pub use error::{ConfigError, EmbeddingError, Error, Result, RetrieverError, VectorStoreError};
pub use ingest::{content_id, IngestRecord};
pub use traits::{EmbeddingProvider, VectorIndexBackend};
pub use types::{
    BackendKind, Filters, Metadata, RawResult, Record, RecordId, RerankedResult, Signals, SimilarityMetric,
    UpsertBatch,
};
