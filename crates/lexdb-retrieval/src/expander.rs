//! Rule-based query expansion over fixed legal-domain tables.

use lexdb_core::config::EngineConfig;

/// Single-token substitutions, in the order variants are generated.
pub const TOKEN_SYNONYMS: &[(&str, &[&str])] = &[
    ("appeal", &["review petition"]),
    ("order", &["judgment", "decision"]),
    ("delay", &["late", "belated"]),
    ("dismissed", &["rejected"]),
    ("allowed", &["granted"]),
    ("penalty", &["fine", "punishment"]),
    ("tribunal", &["appellate tribunal"]),
    ("section", &["sec"]),
    ("act", &["statute"]),
    ("rule", &["regulation"]),
];

/// Multi-word domain phrases; the first occurrence is replaced.
pub const PHRASE_TERMS: &[(&str, &[&str])] = &[
    ("order dated", &["order passed on"]),
    ("assessment year", &["ay"]),
];

/// Lowercase, collapse whitespace runs to one space, trim.
pub fn normalize(query: &str) -> String {
    query.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone)]
pub struct QueryExpander {
    max_expansions: usize,
    synonyms: bool,
    phrases: bool,
}

impl Default for QueryExpander {
    fn default() -> Self { Self::new(5) }
}

impl QueryExpander {
    pub fn new(max_expansions: usize) -> Self { Self { max_expansions: max_expansions.max(1), synonyms: true, phrases: true } }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_expansions: config.max_query_expansions.max(1),
            synonyms: config.expansion.enable_synonyms,
            phrases: config.expansion.enable_phrases,
        }
    }

    pub fn max_expansions(&self) -> usize { self.max_expansions }

    /// Normalised query first, then token variants, then phrase variants;
    /// duplicates dropped, at most `max_expansions` entries.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let original = normalize(query);
        let tokens: Vec<&str> = original.split(' ').filter(|t| !t.is_empty()).collect();

        let mut candidates = vec![original.clone()];
        if self.synonyms {
            candidates.extend(token_variants(&tokens));
        }
        if self.phrases {
            candidates.extend(phrase_variants(&tokens));
        }

        let mut out: Vec<String> = Vec::with_capacity(self.max_expansions);
        for c in candidates {
            if out.len() == self.max_expansions { break; }
            if !out.contains(&c) { out.push(c); }
        }
        out
    }
}

fn token_variants(tokens: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for (pos, token) in tokens.iter().enumerate() {
        let Some((_, alts)) = TOKEN_SYNONYMS.iter().find(|(k, _)| k == token) else { continue };
        for alt in *alts {
            let mut v: Vec<&str> = tokens.to_vec();
            v[pos] = *alt;
            out.push(v.join(" "));
        }
    }
    out
}

fn phrase_variants(tokens: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for (phrase, alts) in PHRASE_TERMS {
        let key: Vec<&str> = phrase.split(' ').collect();
        let Some(start) = tokens.windows(key.len()).position(|w| w == key.as_slice()) else { continue };
        for alt in *alts {
            let mut v: Vec<&str> = tokens[..start].to_vec();
            v.push(*alt);
            v.extend_from_slice(&tokens[start + key.len()..]);
            out.push(v.join(" "));
        }
    }
    out
}
