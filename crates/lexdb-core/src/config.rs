//! Layered configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, so `APP_ENGINE__TOP_K_DEFAULT=7` sets
//! `engine.top_k_default`). The retrieval engine reads its options from the
//! `[engine]` table through [`Config::engine`].
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{BackendKind, SimilarityMetric};

pub struct Config {
    figment: Figment,
    /// Directory the config files were read from; relative paths resolve here.
    dir: Option<PathBuf>,
}

impl Config {
    /// Load from the current directory, picking the env overlay from `RUST_ENV`.
    pub fn load() -> Self {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> Self {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self { figment, dir: Some(dir.to_path_buf()) }
    }

    /// Relative paths stay relative to the working directory.
    pub fn from_figment(figment: Figment) -> Self { Self { figment, dir: None } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the `[engine]` table. A relative `base_path`
    /// resolves against the directory the config was loaded from.
    pub fn engine(&self) -> Result<EngineConfig, ConfigError> {
        let mut cfg: EngineConfig = self
            .figment
            .extract_inner("engine")
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        let raw = cfg.base_path.to_string_lossy().into_owned();
        cfg.base_path = match &self.dir {
            Some(dir) => resolve_with_base(dir, raw),
            None => expand_path(raw),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Options recognised by the retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub embedding_dim: usize,
    #[serde(default)]
    pub similarity_metric: SimilarityMetric,
    #[serde(default = "default_backends")]
    pub enabled_backends: BTreeSet<BackendKind>,
    #[serde(default = "default_top_k")]
    pub top_k_default: usize,
    #[serde(default = "default_max_expansions")]
    pub max_query_expansions: usize,
    #[serde(default = "default_weight_similarity")]
    pub weight_similarity: f32,
    #[serde(default = "default_weight_metadata")]
    pub weight_metadata: f32,
    #[serde(default = "default_base_path")]
    pub base_path: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_workers")]
    pub max_embedding_workers: usize,
    #[serde(default)]
    pub embed_timeout_ms: Option<u64>,
    #[serde(default = "default_ingest_batch")]
    pub ingest_batch_size: usize,
    #[serde(default)]
    pub reranker: RerankerConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
}

fn default_backends() -> BTreeSet<BackendKind> { BTreeSet::from([BackendKind::Flat]) }
fn default_top_k() -> usize { 10 }
fn default_max_expansions() -> usize { 5 }
fn default_weight_similarity() -> f32 { 0.7 }
fn default_weight_metadata() -> f32 { 0.3 }
fn default_base_path() -> PathBuf { PathBuf::from("data/vectorstores") }
fn default_collection() -> String { "default".to_string() }
fn default_workers() -> usize { 4 }
fn default_ingest_batch() -> usize { 64 }
fn default_true() -> bool { true }

impl EngineConfig {
    /// Defaults for everything except the embedding dimension.
    pub fn new(embedding_dim: usize) -> Self {
        Self {
            embedding_dim,
            similarity_metric: SimilarityMetric::default(),
            enabled_backends: default_backends(),
            top_k_default: default_top_k(),
            max_query_expansions: default_max_expansions(),
            weight_similarity: default_weight_similarity(),
            weight_metadata: default_weight_metadata(),
            base_path: default_base_path(),
            collection: default_collection(),
            max_embedding_workers: default_workers(),
            embed_timeout_ms: None,
            ingest_batch_size: default_ingest_batch(),
            reranker: RerankerConfig::default(),
            expansion: ExpansionConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dim == 0 {
            return Err(ConfigError::InvalidEmbeddingDim(self.embedding_dim));
        }
        if self.enabled_backends.is_empty() {
            return Err(ConfigError::NoBackendsEnabled);
        }
        positive("top_k_default", self.top_k_default)?;
        positive("max_query_expansions", self.max_query_expansions)?;
        positive("max_embedding_workers", self.max_embedding_workers)?;
        positive("ingest_batch_size", self.ingest_batch_size)?;
        non_negative("weight_similarity", self.weight_similarity)?;
        non_negative("weight_metadata", self.weight_metadata)?;
        if self.embed_timeout_ms == Some(0) {
            return Err(ConfigError::invalid("embed_timeout_ms", "must be positive when set"));
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::invalid("collection", "must not be empty"));
        }
        self.reranker.validate()
    }

    pub fn embed_timeout(&self) -> Option<Duration> { self.embed_timeout_ms.map(Duration::from_millis) }

    pub fn backend_enabled(&self, kind: BackendKind) -> bool { self.enabled_backends.contains(&kind) }
}

fn positive(key: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 { Err(ConfigError::invalid(key, "must be a positive integer")) } else { Ok(()) }
}

fn non_negative(key: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, format!("must be a finite non-negative number, got {value}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyTier {
    pub min_year: u32,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_true")]
    pub boost_exact_match: bool,
    #[serde(default = "default_true")]
    pub boost_recent: bool,
    #[serde(default = "default_exact_increment")]
    pub exact_match_increment: f32,
    #[serde(default = "default_exact_cap")]
    pub exact_match_cap: f32,
    /// A year earns the largest boost among the tiers whose `min_year` it reaches.
    #[serde(default = "default_recency_tiers")]
    pub recency_tiers: Vec<RecencyTier>,
}

fn default_exact_increment() -> f32 { 0.05 }
fn default_exact_cap() -> f32 { 0.3 }
fn default_recency_tiers() -> Vec<RecencyTier> {
    vec![RecencyTier { min_year: 2020, boost: 0.2 }, RecencyTier { min_year: 2015, boost: 0.1 }]
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            boost_exact_match: true,
            boost_recent: true,
            exact_match_increment: default_exact_increment(),
            exact_match_cap: default_exact_cap(),
            recency_tiers: default_recency_tiers(),
        }
    }
}

impl RerankerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("reranker.exact_match_increment", self.exact_match_increment)?;
        non_negative("reranker.exact_match_cap", self.exact_match_cap)?;
        for tier in &self.recency_tiers {
            non_negative("reranker.recency_tiers.boost", tier.boost)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    #[serde(default = "default_true")]
    pub enable_synonyms: bool,
    #[serde(default = "default_true")]
    pub enable_phrases: bool,
}

impl Default for ExpansionConfig {
    fn default() -> Self { Self { enable_synonyms: true, enable_phrases: true } }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
