use lexdb_core::config::RerankerConfig;
use lexdb_core::types::{BackendKind, Metadata, RawResult};
use lexdb_retrieval::reranker::{effective_year, parse_year};
use lexdb_retrieval::Reranker;
use proptest::prelude::*;

fn raw(id: &str, score: f32, metadata: Metadata) -> RawResult {
    RawResult { id: id.into(), text: format!("text {id}"), metadata, similarity_score: score, source: BackendKind::Flat }
}

fn approx(a: f32, b: f32) -> bool { (a - b).abs() < 1e-6 }

#[test]
fn year_parsing_takes_four_leading_digits() {
    assert_eq!(parse_year("2021"), Some(2021));
    assert_eq!(parse_year("2018-19"), Some(2018));
    assert_eq!(parse_year(" 2015 "), Some(2015));
    assert_eq!(parse_year("FY2018"), None);
    assert_eq!(parse_year("201"), None);
    assert_eq!(parse_year(""), None);
}

#[test]
fn year_takes_precedence_over_assessment_year() {
    let both = Metadata::new().with_year("2012").with_assessment_year("2021-22");
    assert_eq!(effective_year(&both), Some(2012));

    let only_ay = Metadata::new().with_assessment_year("2018-19");
    assert_eq!(effective_year(&only_ay), Some(2018));

    let blank_year = Metadata::new().with_year("  ").with_assessment_year("2021");
    assert_eq!(effective_year(&blank_year), Some(2021));

    let bad_year = Metadata::new().with_year("unknown").with_assessment_year("2021");
    assert_eq!(effective_year(&bad_year), None);
}

#[test]
fn recency_tiers() {
    let r = Reranker::default();
    assert!(approx(r.recency_boost(&Metadata::new().with_year("2023")), 0.2));
    assert!(approx(r.recency_boost(&Metadata::new().with_year("2020")), 0.2));
    assert!(approx(r.recency_boost(&Metadata::new().with_year("2016")), 0.1));
    assert!(approx(r.recency_boost(&Metadata::new().with_year("2014")), 0.0));
    assert!(approx(r.recency_boost(&Metadata::new()), 0.0));
}

#[test]
fn exact_match_counts_tokens_and_caps() {
    let r = Reranker::default();
    let tokens = |q: &str| q.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>();
    let md = Metadata::new().with_title("Limitation Act").with_section("Section 14");

    assert!(approx(r.exact_match_boost(&tokens("section 14"), &md), 0.10));
    assert!(approx(r.exact_match_boost(&tokens("Limitation"), &md), 0.05));
    assert!(approx(r.exact_match_boost(&tokens("article 21"), &md), 0.0));
    let many = tokens("limitation act section 14 limitation act section 14");
    assert!(approx(r.exact_match_boost(&many, &md), 0.3));
    assert!(approx(r.exact_match_boost(&tokens("section"), &Metadata::new()), 0.0));
}

#[test]
fn final_score_combines_weighted_signals() {
    let r = Reranker::default();
    let md = Metadata::new().with_heading("Condonation of delay").with_year("2021");
    let out = r.rerank("delay condonation", vec![raw("a", 0.5, md)], None);
    let s = out[0].signals;
    assert!(approx(s.exact_match, 0.1));
    assert!(approx(s.recency, 0.2));
    assert!(approx(s.metadata, 0.3));
    assert!(approx(s.similarity, 0.5));
    assert!(approx(out[0].final_score, 0.7 * 0.5 + 0.3 * 0.3));
    assert!(approx(out[0].similarity_score, 0.5));
}

#[test]
fn disabled_boosts_leave_similarity_only() {
    let cfg = RerankerConfig { boost_exact_match: false, boost_recent: false, ..RerankerConfig::default() };
    let r = Reranker::new(1.0, 1.0, cfg);
    let md = Metadata::new().with_title("delay").with_year("2022");
    let out = r.rerank("delay", vec![raw("a", 0.4, md)], None);
    assert!(approx(out[0].final_score, 0.4));
}

#[test]
fn ties_keep_input_order_and_top_k_truncates() {
    let r = Reranker::default();
    let input = vec![raw("x", 0.5, Metadata::new()), raw("y", 0.9, Metadata::new()), raw("z", 0.5, Metadata::new())];
    let out = r.rerank("anything", input, Some(2));
    assert_eq!(out.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), vec!["y", "x"]);

    let all = r.rerank("anything", vec![raw("x", 0.5, Metadata::new()), raw("z", 0.5, Metadata::new())], None);
    assert_eq!(all.iter().map(|o| o.id.as_str()).collect::<Vec<_>>(), vec!["x", "z"]);
}

#[test]
fn empty_input_reranks_to_empty() {
    assert!(Reranker::default().rerank("q", Vec::new(), Some(3)).is_empty());
}

proptest! {
    #[test]
    fn rerank_output_is_descending_and_bounded(
        scores in prop::collection::vec(-1.0f32..1.0, 0..20),
        years in prop::collection::vec(prop::option::of(1990u32..2030), 20),
        top_k in prop::option::of(0usize..25),
    ) {
        let input: Vec<RawResult> = scores
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let md = match years[i] { Some(y) => Metadata::new().with_year(y.to_string()), None => Metadata::new() };
                raw(&format!("r{i}"), *s, md)
            })
            .collect();
        let n = input.len();
        let out = Reranker::default().rerank("section 14", input, top_k);
        prop_assert_eq!(out.len(), top_k.map_or(n, |k| k.min(n)));
        for w in out.windows(2) {
            prop_assert!(w[0].final_score >= w[1].final_score);
        }
    }
}
