//! End-to-end ranking over a small legal corpus with the hashing embedder.

use std::sync::Arc;

use lexdb_core::config::EngineConfig;
use lexdb_core::traits::VectorIndexBackend;
use lexdb_core::types::{Filters, Metadata, RerankedResult, SimilarityMetric, UpsertBatch};
use lexdb_embed::HashEmbedder;
use lexdb_retrieval::Retriever;
use lexdb_vector::FlatIndex;

const DIM: usize = 1024;
const QUERY: &str = "Applicability of Section 14 of the Limitation Act";

const STATUTE: &str =
    "Section 14 of the Limitation Act excludes the time spent prosecuting another civil proceeding in good faith";
const CASE: &str =
    "The Supreme Court held that Section 14 of the Limitation Act applies to proceedings under the Arbitration Act";
const CONSTITUTIONAL: &str = "Article 21 of the Constitution guarantees the right to life and personal liberty";

fn run(statute_title: &str) -> Vec<RerankedResult> {
    let embedder = HashEmbedder::new(DIM);
    let docs = [
        ("statute", STATUTE, Metadata::new().with_title(statute_title).with_year("1963")),
        ("case", CASE, Metadata::new().with_title("Supreme Court judgment").with_year("2008")),
        ("constitutional", CONSTITUTIONAL, Metadata::new().with_title("Constitutional rights").with_year("2023")),
    ];
    let index = FlatIndex::new(DIM, SimilarityMetric::Cosine);
    index
        .add_or_update(&UpsertBatch::new(
            docs.iter().map(|d| d.0.to_string()).collect(),
            docs.iter().map(|d| d.1.to_string()).collect(),
            docs.iter().map(|d| embedder.embed(d.1)).collect(),
            docs.iter().map(|d| d.2.clone()).collect(),
        ))
        .expect("upsert");

    let retriever = Retriever::new(
        Arc::new(embedder),
        vec![Arc::new(index) as Arc<dyn VectorIndexBackend>],
        &EngineConfig::new(DIM),
    )
    .expect("retriever");
    retriever.retrieve(QUERY, None, &Filters::new()).expect("retrieve")
}

fn position(results: &[RerankedResult], id: &str) -> usize {
    results.iter().position(|r| r.id == id).expect("present")
}

#[test]
fn legal_sources_outrank_unrelated_constitutional_text() {
    let results = run("Limitation Act, 1963");
    assert_eq!(results.len(), 3);
    let constitutional = position(&results, "constitutional");
    assert!(position(&results, "statute") < constitutional);
    assert!(position(&results, "case") < constitutional);
    // recency alone cannot lift the 2023 record
    assert!(results[constitutional].signals.recency > 0.0);
}

#[test]
fn exact_title_match_lifts_the_statute_to_the_top() {
    let plain = run("Limitation Act, 1963");
    let boosted = run("Section 14 of the Limitation Act");

    let score = |rs: &[RerankedResult]| rs[position(rs, "statute")].final_score;
    assert!(score(&boosted) > score(&plain));
    assert_eq!(boosted[0].id, "statute");

    let statute = &boosted[0];
    assert!((statute.signals.exact_match - 0.3).abs() < 1e-6, "boost is capped");
    assert_eq!(statute.signals.recency, 0.0);
}
