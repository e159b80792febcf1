//! Similarity plus metadata signals into one final score.

use lexdb_core::config::{EngineConfig, RerankerConfig};
use lexdb_core::types::{Metadata, RawResult, RerankedResult, Signals};

#[derive(Debug, Clone)]
pub struct Reranker {
    weight_similarity: f32,
    weight_metadata: f32,
    config: RerankerConfig,
}

impl Default for Reranker {
    fn default() -> Self { Self::new(0.7, 0.3, RerankerConfig::default()) }
}

/// Leading four ASCII digits of `raw`, e.g. `"2018-19"` gives 2018.
pub fn parse_year(raw: &str) -> Option<u32> {
    let head = raw.trim().get(..4)?;
    if head.bytes().all(|b| b.is_ascii_digit()) { head.parse().ok() } else { None }
}

/// `year` when present and non-empty, otherwise `assessment_year`.
pub fn effective_year(metadata: &Metadata) -> Option<u32> {
    match metadata.year.as_deref().map(str::trim) {
        Some(y) if !y.is_empty() => parse_year(y),
        _ => metadata.assessment_year.as_deref().and_then(parse_year),
    }
}

impl Reranker {
    pub fn new(weight_similarity: f32, weight_metadata: f32, config: RerankerConfig) -> Self {
        Self { weight_similarity, weight_metadata, config }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.weight_similarity, config.weight_metadata, config.reranker.clone())
    }

    /// One increment per query token found in title, heading or section; capped.
    pub fn exact_match_boost(&self, query_tokens: &[String], metadata: &Metadata) -> f32 {
        if !self.config.boost_exact_match { return 0.0; }
        let fields: Vec<String> = [&metadata.title, &metadata.heading, &metadata.section]
            .into_iter()
            .flatten()
            .map(|f| f.to_lowercase())
            .collect();
        if fields.is_empty() { return 0.0; }
        let hits = query_tokens.iter().filter(|t| fields.iter().any(|f| f.contains(t.as_str()))).count();
        (hits as f32 * self.config.exact_match_increment).min(self.config.exact_match_cap)
    }

    /// Highest tier boost the record's year reaches; 0 without a usable year.
    pub fn recency_boost(&self, metadata: &Metadata) -> f32 {
        if !self.config.boost_recent { return 0.0; }
        let Some(year) = effective_year(metadata) else { return 0.0 };
        self.config
            .recency_tiers
            .iter()
            .filter(|tier| year >= tier.min_year)
            .map(|tier| tier.boost)
            .fold(0.0, f32::max)
    }

    /// Score, sort descending (stable), truncate to `top_k` when given.
    pub fn rerank(&self, query: &str, results: Vec<RawResult>, top_k: Option<usize>) -> Vec<RerankedResult> {
        let tokens: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let mut scored: Vec<RerankedResult> = results
            .into_iter()
            .map(|r| {
                let exact_match = self.exact_match_boost(&tokens, &r.metadata);
                let recency = self.recency_boost(&r.metadata);
                let signals = Signals {
                    similarity: r.similarity_score,
                    metadata: exact_match + recency,
                    exact_match,
                    recency,
                };
                let final_score = self.weight_similarity * signals.similarity + self.weight_metadata * signals.metadata;
                RerankedResult {
                    id: r.id,
                    text: r.text,
                    metadata: r.metadata,
                    similarity_score: r.similarity_score,
                    final_score,
                    signals,
                    source: r.source,
                }
            })
            .collect();
        scored.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        if let Some(k) = top_k { scored.truncate(k); }
        scored
    }
}
