use std::collections::HashMap;

use lexdb_core::types::RawResult;

/// One entry per id, keeping the highest `similarity_score`.
///
/// Output follows first-seen order; a later duplicate with an equal score
/// does not replace the earlier one.
pub fn dedup_by_id(results: Vec<RawResult>) -> Vec<RawResult> {
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(results.len());
    let mut out: Vec<RawResult> = Vec::with_capacity(results.len());
    for r in results {
        match slot.get(&r.id) {
            Some(&i) => {
                if r.similarity_score > out[i].similarity_score { out[i] = r; }
            }
            None => {
                slot.insert(r.id.clone(), out.len());
                out.push(r);
            }
        }
    }
    out
}
