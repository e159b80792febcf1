//! Rendering retrieval results for the terminal or as JSON.

use serde::Serialize;

use lexdb_core::types::RerankedResult;

const SNIPPET_MAX_LEN: usize = 200;

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    results: &'a [RerankedResult],
}

pub fn format_json(query: &str, results: &[RerankedResult]) -> String {
    serde_json::to_string_pretty(&JsonOutput { query, results }).unwrap_or_else(|_| "{}".to_string())
}

pub fn format_human(query: &str, results: &[RerankedResult]) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\"");
    }
    let mut out = format!("🔍 {} results for \"{query}\"\n", results.len());
    for (i, r) in results.iter().enumerate() {
        let label = r.metadata.title.as_deref().or(r.metadata.heading.as_deref()).unwrap_or(r.id.as_str());
        out.push_str(&format!(
            "\n  {}. {label}  final={:.4}  sim={:.4}  exact=+{:.2}  recent=+{:.2}  [{}]\n",
            i + 1,
            r.final_score,
            r.similarity_score,
            r.signals.exact_match,
            r.signals.recency,
            r.source
        ));
        if let Some(year) = r.metadata.year.as_deref().or(r.metadata.assessment_year.as_deref()) {
            out.push_str(&format!("     year: {year}\n"));
        }
        out.push_str(&format!("     id: {}\n     {}\n", r.id, truncate_text(&r.text, SNIPPET_MAX_LEN)));
    }
    out
}

/// First `max` characters, collapsed to one line, with an ellipsis when cut.
pub fn truncate_text(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let mut cut: String = flat.chars().take(max).collect();
    cut.push('…');
    cut
}
