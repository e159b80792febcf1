//! On-disk layout of a [`FlatIndex`](crate::flat::FlatIndex) directory.
//!
//! `index.bin` holds a fixed header followed by the stored vectors as
//! little-endian f32; `meta.json` holds the parallel id/text/metadata arrays
//! and a BLAKE3 checksum of `index.bin`. Both files are written through a temp
//! file in the same directory and renamed into place.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use lexdb_core::error::VectorStoreError;
use lexdb_core::types::{Metadata, SimilarityMetric};

pub const INDEX_FILE: &str = "index.bin";
pub const META_FILE: &str = "meta.json";
pub const FORMAT_VERSION: u32 = 1;

const MAGIC: &[u8; 4] = b"LXFI";
// magic + version + dim + count + metric tag
const HEADER_LEN: usize = 4 + 4 + 4 + 8 + 1;

/// Everything needed to rebuild an index without re-embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub dim: usize,
    pub metric: SimilarityMetric,
    pub ids: Vec<String>,
    pub texts: Vec<String>,
    pub metadatas: Vec<Metadata>,
    /// `ids.len() * dim` values, row-major.
    pub vectors: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct MetaFile {
    version: u32,
    dim: usize,
    metric: SimilarityMetric,
    ids: Vec<String>,
    texts: Vec<String>,
    metadatas: Vec<Metadata>,
    checksum: String,
}

fn metric_tag(metric: SimilarityMetric) -> u8 {
    match metric {
        SimilarityMetric::Cosine => 0,
        SimilarityMetric::L2 => 1,
    }
}

fn metric_from_tag(tag: u8) -> Option<SimilarityMetric> {
    match tag {
        0 => Some(SimilarityMetric::Cosine),
        1 => Some(SimilarityMetric::L2),
        _ => None,
    }
}

fn encode_index(snapshot: &Snapshot) -> Vec<u8> {
    let count = snapshot.ids.len();
    let mut buf = Vec::with_capacity(HEADER_LEN + snapshot.vectors.len() * 4);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&(snapshot.dim as u32).to_le_bytes());
    buf.extend_from_slice(&(count as u64).to_le_bytes());
    buf.push(metric_tag(snapshot.metric));
    for x in &snapshot.vectors { buf.extend_from_slice(&x.to_le_bytes()); }
    buf
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<(), VectorStoreError> {
    let target = dir.join(name);
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| VectorStoreError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| VectorStoreError::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| VectorStoreError::io(tmp.path(), e))?;
    tmp.persist(&target).map_err(|e| VectorStoreError::io(&target, e.error))?;
    Ok(())
}

pub fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<(), VectorStoreError> {
    fs::create_dir_all(dir).map_err(|e| VectorStoreError::io(dir, e))?;
    let index_bytes = encode_index(snapshot);
    let meta = MetaFile {
        version: FORMAT_VERSION,
        dim: snapshot.dim,
        metric: snapshot.metric,
        ids: snapshot.ids.clone(),
        texts: snapshot.texts.clone(),
        metadatas: snapshot.metadatas.clone(),
        checksum: blake3::hash(&index_bytes).to_hex().to_string(),
    };
    let meta_bytes = serde_json::to_vec(&meta).map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
    write_atomic(dir, INDEX_FILE, &index_bytes)?;
    write_atomic(dir, META_FILE, &meta_bytes)
}

/// `Ok(None)` when neither file exists yet.
pub fn read_snapshot(
    dir: &Path,
    expected_dim: usize,
    expected_metric: SimilarityMetric,
) -> Result<Option<Snapshot>, VectorStoreError> {
    let index_path = dir.join(INDEX_FILE);
    let meta_path = dir.join(META_FILE);
    match (index_path.exists(), meta_path.exists()) {
        (false, false) => return Ok(None),
        (true, false) => return Err(VectorStoreError::corrupt(&meta_path, "missing side-table")),
        (false, true) => return Err(VectorStoreError::corrupt(&index_path, "missing index file")),
        (true, true) => {}
    }

    let bytes = fs::read(&index_path).map_err(|e| VectorStoreError::io(&index_path, e))?;
    let header = Header::parse(&bytes, &index_path)?;
    if header.dim != expected_dim {
        return Err(VectorStoreError::DimensionMismatch { expected: expected_dim, actual: header.dim });
    }
    if header.metric != expected_metric {
        return Err(VectorStoreError::MetricMismatch { expected: expected_metric, found: header.metric });
    }
    let body = &bytes[HEADER_LEN..];
    let expected_len = header.count.checked_mul(header.dim * 4);
    if expected_len != Some(body.len()) {
        return Err(VectorStoreError::corrupt(
            &index_path,
            format!("{} vectors of dim {} do not fit {} bytes", header.count, header.dim, body.len()),
        ));
    }

    let meta_raw = fs::read(&meta_path).map_err(|e| VectorStoreError::io(&meta_path, e))?;
    let meta: MetaFile = serde_json::from_slice(&meta_raw)
        .map_err(|e| VectorStoreError::corrupt(&meta_path, format!("unreadable side-table: {e}")))?;
    check_meta(&meta, &header, &meta_path)?;
    let checksum = blake3::hash(&bytes).to_hex().to_string();
    if checksum != meta.checksum {
        return Err(VectorStoreError::corrupt(&index_path, "checksum does not match side-table"));
    }

    let vectors = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(Some(Snapshot {
        dim: header.dim,
        metric: header.metric,
        ids: meta.ids,
        texts: meta.texts,
        metadatas: meta.metadatas,
        vectors,
    }))
}

struct Header {
    dim: usize,
    count: usize,
    metric: SimilarityMetric,
}

impl Header {
    fn parse(bytes: &[u8], path: &Path) -> Result<Self, VectorStoreError> {
        let corrupt = |reason: &str| VectorStoreError::corrupt(path, reason);
        if bytes.len() < HEADER_LEN { return Err(corrupt("truncated header")); }
        if &bytes[0..4] != MAGIC { return Err(corrupt("bad magic")); }
        let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let version = u32_at(4);
        if version != FORMAT_VERSION {
            return Err(VectorStoreError::corrupt(path, format!("unsupported format version {version}")));
        }
        let dim = u32_at(8) as usize;
        let mut count_bytes = [0u8; 8];
        count_bytes.copy_from_slice(&bytes[12..20]);
        let count = usize::try_from(u64::from_le_bytes(count_bytes)).map_err(|_| corrupt("record count overflows"))?;
        let metric = metric_from_tag(bytes[20]).ok_or_else(|| corrupt("unknown metric tag"))?;
        Ok(Self { dim, count, metric })
    }
}

fn check_meta(meta: &MetaFile, header: &Header, path: &Path) -> Result<(), VectorStoreError> {
    if meta.version != FORMAT_VERSION || meta.dim != header.dim || meta.metric != header.metric {
        return Err(VectorStoreError::corrupt(path, "side-table header disagrees with index file"));
    }
    if meta.ids.len() != header.count || meta.texts.len() != header.count || meta.metadatas.len() != header.count {
        return Err(VectorStoreError::corrupt(
            path,
            format!("side-table holds {} ids for {} vectors", meta.ids.len(), header.count),
        ));
    }
    let mut seen = std::collections::HashSet::with_capacity(meta.ids.len());
    if let Some(dup) = meta.ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(VectorStoreError::corrupt(path, format!("duplicate id '{dup}'")));
    }
    Ok(())
}
