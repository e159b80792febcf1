//! Domain types shared by the embedding, vector and retrieval crates.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::VectorStoreError;

pub type RecordId = String;

/// Similarity metric fixed per index at construction.
///
/// `Cosine` scores are inner products of L2-normalized vectors, in `[-1, 1]`.
/// `L2` scores are negative squared Euclidean distances so that higher is
/// always closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    L2,
}

impl SimilarityMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Which backend produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process exact index persisted to a directory.
    Flat,
    /// LanceDB collection managing its own storage.
    Lance,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Lance => "lance",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Chunk metadata: typed fields for the keys the reranker and filters know
/// about, plus `extra` for everything else.
///
/// Serializes as one flat JSON object, so `{"title": "..", "court": ".."}`
/// lands `court` in `extra`. A key is stored in exactly one place: the
/// typed field when it has one, `extra` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "scalar_as_string")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "scalar_as_string")]
    pub assessment_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Keys with a typed home on [`Metadata`].
pub const KNOWN_METADATA_KEYS: [&str; 7] =
    ["title", "heading", "section", "year", "assessment_year", "source_id", "chunk_index"];

impl Metadata {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self { self.title = Some(title.into()); self }

    #[must_use]
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self { self.heading = Some(heading.into()); self }

    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self { self.section = Some(section.into()); self }

    #[must_use]
    pub fn with_year(mut self, year: impl Into<String>) -> Self { self.year = Some(year.into()); self }

    #[must_use]
    pub fn with_assessment_year(mut self, year: impl Into<String>) -> Self { self.assessment_year = Some(year.into()); self }

    /// Known keys are routed to their typed field; see [`Metadata::set`].
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Store `value` under `key`.
    ///
    /// Keys in [`KNOWN_METADATA_KEYS`] land in their typed field: scalars by
    /// their string form, arrays and objects as JSON text, null clears it.
    /// A `chunk_index` that is not a `u32` clears the field.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        let text = typed_text(&value);
        match key.as_str() {
            "title" => self.title = text,
            "heading" => self.heading = text,
            "section" => self.section = text,
            "year" => self.year = text,
            "assessment_year" => self.assessment_year = text,
            "source_id" => self.source_id = text,
            "chunk_index" => self.chunk_index = text.and_then(|t| t.trim().parse().ok()),
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    /// Extension keys, never one of [`KNOWN_METADATA_KEYS`].
    pub fn extra(&self) -> &BTreeMap<String, Value> { &self.extra }

    /// JSON view of any field, typed or extension.
    pub fn get(&self, key: &str) -> Option<Value> {
        let text = |v: &Option<String>| v.clone().map(Value::String);
        match key {
            "title" => text(&self.title),
            "heading" => text(&self.heading),
            "section" => text(&self.section),
            "year" => text(&self.year),
            "assessment_year" => text(&self.assessment_year),
            "source_id" => text(&self.source_id),
            "chunk_index" => self.chunk_index.map(Value::from),
            _ => self.extra.get(key).cloned(),
        }
    }

    /// `true` when every filter key is present and equal.
    pub fn matches(&self, filters: &Filters) -> bool {
        filters.iter().all(|(key, want)| self.get(key).is_some_and(|have| values_match(&have, want)))
    }
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!("expected a string or number, got {other}"))),
    }
}

fn typed_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        other => Some(scalar_text(other).unwrap_or_else(|| other.to_string())),
    }
}

/// String form of a JSON scalar; `None` for arrays, objects and null.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Filter equality: identical JSON, or scalars with the same string form
/// (`2020` matches `"2020"`).
pub fn values_match(have: &Value, want: &Value) -> bool {
    if have == want { return true; }
    matches!((scalar_text(have), scalar_text(want)), (Some(a), Some(b)) if a == b)
}

/// Metadata equality constraints applied at search time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, Value>);

impl Filters {
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) { self.0.insert(key.into(), value.into()); }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }
}

impl FromIterator<(String, Value)> for Filters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self { Self(iter.into_iter().collect()) }
}

/// The unit stored and retrieved. Re-adding an `id` replaces the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Metadata,
}

impl Record {
    pub fn new(id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>, metadata: Metadata) -> Self {
        Self { id: id.into(), text: text.into(), embedding, metadata }
    }
}

/// Columnar upsert input: parallel arrays, one entry per record.
///
/// Backends call [`UpsertBatch::validate`] before touching any state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertBatch {
    pub ids: Vec<RecordId>,
    pub texts: Vec<String>,
    pub embeddings: Vec<Vec<f32>>,
    pub metadatas: Vec<Metadata>,
}

impl UpsertBatch {
    pub fn new(ids: Vec<RecordId>, texts: Vec<String>, embeddings: Vec<Vec<f32>>, metadatas: Vec<Metadata>) -> Self {
        Self { ids, texts, embeddings, metadatas }
    }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    pub fn validate(&self, dim: usize) -> Result<(), VectorStoreError> {
        let n = self.ids.len();
        if self.texts.len() != n || self.embeddings.len() != n || self.metadatas.len() != n {
            return Err(VectorStoreError::LengthMismatch {
                ids: n,
                texts: self.texts.len(),
                embeddings: self.embeddings.len(),
                metadatas: self.metadatas.len(),
            });
        }
        if let Some(bad) = self.embeddings.iter().find(|e| e.len() != dim) {
            return Err(VectorStoreError::DimensionMismatch { expected: dim, actual: bad.len() });
        }
        Ok(())
    }

    /// Positions that survive last-write-wins on duplicate ids, in batch order.
    pub fn last_write_positions(&self) -> Vec<usize> {
        let mut last: HashMap<&str, usize> = HashMap::with_capacity(self.ids.len());
        for (i, id) in self.ids.iter().enumerate() { last.insert(id.as_str(), i); }
        (0..self.ids.len()).filter(|&i| last.get(self.ids[i].as_str()) == Some(&i)).collect()
    }
}

impl From<Vec<Record>> for UpsertBatch {
    fn from(records: Vec<Record>) -> Self {
        let mut batch = Self::default();
        for r in records {
            batch.ids.push(r.id);
            batch.texts.push(r.text);
            batch.embeddings.push(r.embedding);
            batch.metadatas.push(r.metadata);
        }
        batch
    }
}

/// One backend's answer for one query vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub id: RecordId,
    pub text: String,
    pub metadata: Metadata,
    /// Backend-native, comparable only within one backend/metric.
    pub similarity_score: f32,
    pub source: BackendKind,
}

/// Per-signal breakdown kept on every reranked result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    pub similarity: f32,
    pub metadata: f32,
    pub exact_match: f32,
    pub recency: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankedResult {
    pub id: RecordId,
    pub text: String,
    pub metadata: Metadata,
    pub similarity_score: f32,
    pub final_score: f32,
    pub signals: Signals,
    pub source: BackendKind,
}
