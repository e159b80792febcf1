//! Records as they arrive from the chunking pipeline.

use serde::{Deserialize, Serialize};

use crate::types::{Metadata, RecordId};

/// Length of the hex digest suffix in [`content_id`].
const ID_HASH_HEX: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub id: RecordId,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl IngestRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: Metadata) -> Self {
        Self { id: id.into(), text: text.into(), metadata }
    }

    /// Record whose id is derived from its content, so re-ingesting the same
    /// chunk upserts instead of duplicating.
    pub fn from_content(source_id: &str, text: impl Into<String>, mut metadata: Metadata) -> Self {
        let text = text.into();
        if metadata.source_id.is_none() {
            metadata.source_id = Some(source_id.to_string());
        }
        Self { id: content_id(source_id, &text), text, metadata }
    }
}

/// `<source_id>:<first 16 hex chars of blake3(text)>`.
pub fn content_id(source_id: &str, text: &str) -> RecordId {
    let digest = blake3::hash(text.as_bytes()).to_hex();
    format!("{source_id}:{}", &digest[..ID_HASH_HEX])
}
