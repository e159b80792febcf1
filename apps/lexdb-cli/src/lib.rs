//! Shared plumbing for the `lexdb` and `lexdb-indexer` binaries.

pub mod input;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use lexdb_core::config::{Config, EngineConfig};
use lexdb_core::traits::EmbeddingProvider;
use lexdb_core::types::Filters;
use lexdb_embed::configured_provider;
use lexdb_retrieval::IndexManager;

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

/// Stores are opened lazily and the embedding model only on request, so
/// `stats` and `delete` never load it.
pub struct Engine {
    pub config: EngineConfig,
    pub manager: IndexManager,
}

impl Engine {
    pub fn embedder(&self) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
        configured_provider(&self.config).context("loading embedding provider")
    }
}

/// Load `[engine]` from the layered config, optionally overriding `base_path`.
pub fn load_engine_config(base_path: Option<PathBuf>) -> anyhow::Result<EngineConfig> {
    let mut config = Config::load().engine().context("loading [engine] configuration")?;
    if let Some(path) = base_path {
        config.base_path = path;
    }
    Ok(config)
}

pub fn open_engine(config: EngineConfig) -> anyhow::Result<Engine> {
    let manager = IndexManager::new(config.clone())?;
    Ok(Engine { config, manager })
}

/// `key=value`; the value is read as JSON when it parses as a scalar, so
/// `year=2020` and `year="2020"` both work.
pub fn parse_filter(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty filter key in '{raw}'"));
    }
    let value = match serde_json::from_str::<Value>(value.trim()) {
        Ok(v @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => v,
        _ => Value::String(value.trim().to_string()),
    };
    Ok((key.to_string(), value))
}

pub fn filters_from(pairs: Vec<(String, Value)>) -> Filters { pairs.into_iter().collect() }
