//! Hybrid retrieval: query expansion, multi-backend vector search,
//! deduplication and metadata-aware reranking.

pub mod dedup;
pub mod expander;
pub mod indexer;
pub mod manager;
pub mod reranker;
pub mod retriever;

pub use dedup::dedup_by_id;
pub use expander::{normalize, QueryExpander};
pub use indexer::{IndexReport, Indexer};
pub use manager::IndexManager;
pub use reranker::Reranker;
pub use retriever::Retriever;
