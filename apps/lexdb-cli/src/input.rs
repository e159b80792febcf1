//! Reading ingest records from disk.
//!
//! `.jsonl` files hold one record per line:
//! `{"id": "...", "source_id": "...", "text": "...", "metadata": {...}}`, where
//! `id` and `source_id` are optional. `.txt` files are split into paragraphs on
//! blank lines. Records without an id get a content-derived one.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use walkdir::WalkDir;

use lexdb_core::ingest::IngestRecord;
use lexdb_core::types::Metadata;

#[derive(Debug, Deserialize)]
struct InputLine {
    id: Option<String>,
    source_id: Option<String>,
    text: String,
    #[serde(default)]
    metadata: Metadata,
}

/// Every `.jsonl`/`.txt` file under `paths`, sorted so runs are repeatable.
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths
        .iter()
        .flat_map(|p| WalkDir::new(p).into_iter().filter_map(Result::ok))
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| matches!(p.extension().and_then(|e| e.to_str()), Some("jsonl" | "txt")))
        .collect();
    files.sort();
    files.dedup();
    files
}

pub fn read_records(path: &Path) -> anyhow::Result<Vec<IngestRecord>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("doc").to_string();
    if path.extension().and_then(|e| e.to_str()) == Some("txt") {
        return Ok(paragraphs(&stem, &raw));
    }

    let mut out = Vec::new();
    for (n, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: InputLine =
            serde_json::from_str(line).with_context(|| format!("{}:{}: invalid record", path.display(), n + 1))?;
        let source = parsed.source_id.unwrap_or_else(|| stem.clone());
        out.push(match parsed.id {
            Some(id) => {
                let mut metadata = parsed.metadata;
                if metadata.source_id.is_none() {
                    metadata.source_id = Some(source);
                }
                IngestRecord::new(id, parsed.text, metadata)
            }
            None => IngestRecord::from_content(&source, parsed.text, parsed.metadata),
        });
    }
    Ok(out)
}

/// Blank-line separated paragraphs; CRLF and CR line endings count as LF.
fn paragraphs(source_id: &str, raw: &str) -> Vec<IngestRecord> {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, p)| {
            let mut metadata = Metadata::new();
            metadata.chunk_index = u32::try_from(i).ok();
            IngestRecord::from_content(source_id, p, metadata)
        })
        .collect()
}

/// Records from `files`, in order.
pub fn load_records(files: &[PathBuf]) -> anyhow::Result<Vec<IngestRecord>> {
    let mut records = Vec::new();
    for file in files {
        records.extend(read_records(file)?);
    }
    Ok(records)
}
