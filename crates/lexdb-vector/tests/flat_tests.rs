use lexdb_core::error::VectorStoreError;
use lexdb_core::traits::VectorIndexBackend;
use lexdb_core::types::{Filters, Metadata, Record, SimilarityMetric, UpsertBatch};
use lexdb_vector::FlatIndex;
use proptest::prelude::*;

fn rec(id: &str, v: Vec<f32>) -> Record { Record::new(id, format!("text of {id}"), v, Metadata::new()) }

fn batch(records: Vec<Record>) -> UpsertBatch { UpsertBatch::from(records) }

fn none() -> Filters { Filters::new() }

#[test]
fn empty_index_returns_no_results() {
    let idx = FlatIndex::new(3, SimilarityMetric::Cosine);
    assert_eq!(idx.count().unwrap(), 0);
    assert!(idx.search(&[1.0, 0.0, 0.0], 5, &none()).unwrap().is_empty());
}

#[test]
fn upsert_same_record_twice_is_idempotent() {
    let idx = FlatIndex::new(3, SimilarityMetric::Cosine);
    let b = batch(vec![rec("a", vec![1.0, 0.0, 0.0]), rec("b", vec![0.0, 1.0, 0.0])]);
    idx.add_or_update(&b).unwrap();
    let before = idx.search(&[1.0, 0.5, 0.0], 10, &none()).unwrap();
    idx.add_or_update(&b).unwrap();
    let after = idx.search(&[1.0, 0.5, 0.0], 10, &none()).unwrap();
    assert_eq!(idx.count().unwrap(), 2);
    assert_eq!(before, after);
}

#[test]
fn upsert_with_new_vector_overwrites() {
    let idx = FlatIndex::new(3, SimilarityMetric::Cosine);
    idx.add_or_update(&batch(vec![rec("a", vec![1.0, 0.0, 0.0]), rec("b", vec![0.0, 1.0, 0.0])])).unwrap();
    let hit = |idx: &FlatIndex| {
        idx.search(&[1.0, 0.0, 0.0], 10, &none()).unwrap().into_iter().find(|r| r.id == "a").unwrap().similarity_score
    };
    assert!((hit(&idx) - 1.0).abs() < 1e-6);

    idx.add_or_update(&batch(vec![rec("a", vec![0.0, 0.0, 2.0])])).unwrap();
    assert_eq!(idx.count().unwrap(), 2);
    assert!(hit(&idx).abs() < 1e-6);
}

#[test]
fn duplicate_ids_in_one_batch_keep_the_last() {
    let idx = FlatIndex::new(2, SimilarityMetric::Cosine);
    idx.add_or_update(&batch(vec![rec("a", vec![1.0, 0.0]), rec("a", vec![0.0, 1.0])])).unwrap();
    assert_eq!(idx.count().unwrap(), 1);
    let v = idx.vector("a").unwrap();
    assert!((v[1] - 1.0).abs() < 1e-6);
}

#[test]
fn invalid_batches_fail_before_mutation() {
    let idx = FlatIndex::new(2, SimilarityMetric::Cosine);
    let ragged = UpsertBatch::new(vec!["a".into(), "b".into()], vec!["x".into()], vec![vec![1.0, 0.0]], vec![Metadata::new()]);
    assert!(matches!(idx.add_or_update(&ragged), Err(VectorStoreError::LengthMismatch { .. })));

    let mixed = batch(vec![rec("a", vec![1.0, 0.0]), rec("b", vec![1.0, 0.0, 0.0])]);
    assert!(matches!(idx.add_or_update(&mixed), Err(VectorStoreError::DimensionMismatch { expected: 2, actual: 3 })));
    assert_eq!(idx.count().unwrap(), 0);
}

#[test]
fn query_with_wrong_dimension_is_an_error() {
    let idx = FlatIndex::new(2, SimilarityMetric::L2);
    assert!(matches!(idx.search(&[1.0], 3, &none()), Err(VectorStoreError::DimensionMismatch { .. })));
}

#[test]
fn l2_scores_are_negative_squared_distance() {
    let idx = FlatIndex::new(2, SimilarityMetric::L2);
    idx.add_or_update(&batch(vec![rec("near", vec![1.0, 1.0]), rec("far", vec![4.0, 5.0])])).unwrap();
    let hits = idx.search(&[1.0, 1.0], 2, &none()).unwrap();
    assert_eq!(hits[0].id, "near");
    assert!(hits[0].similarity_score.abs() < 1e-6);
    assert!((hits[1].similarity_score + 25.0).abs() < 1e-4);
}

#[test]
fn equal_scores_keep_insertion_order() {
    let idx = FlatIndex::new(2, SimilarityMetric::Cosine);
    idx.add_or_update(&batch(vec![rec("first", vec![1.0, 0.0]), rec("second", vec![2.0, 0.0]), rec("third", vec![3.0, 0.0])]))
        .unwrap();
    let ids: Vec<String> = idx.search(&[1.0, 0.0], 3, &none()).unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn filters_restrict_results() {
    let idx = FlatIndex::new(2, SimilarityMetric::Cosine);
    let b = UpsertBatch::from(vec![
        Record::new("a", "a", vec![1.0, 0.0], Metadata::new().with_year("2021")),
        Record::new("b", "b", vec![1.0, 0.1], Metadata::new().with_year("2012").with_extra("court", "SC")),
    ]);
    idx.add_or_update(&b).unwrap();

    let by_year = idx.search(&[1.0, 0.0], 10, &Filters::new().with("year", 2021)).unwrap();
    assert_eq!(by_year.len(), 1);
    assert_eq!(by_year[0].id, "a");

    let by_court = idx.search(&[1.0, 0.0], 10, &Filters::new().with("court", "SC")).unwrap();
    assert_eq!(by_court.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["b"]);

    assert!(idx.search(&[1.0, 0.0], 10, &Filters::new().with("court", "HC")).unwrap().is_empty());
}

#[test]
fn delete_removes_only_known_ids() {
    let idx = FlatIndex::new(2, SimilarityMetric::Cosine);
    idx.add_or_update(&batch(vec![rec("a", vec![1.0, 0.0]), rec("b", vec![0.0, 1.0]), rec("c", vec![1.0, 1.0])])).unwrap();
    let removed = idx.delete(&["b".into(), "missing".into(), "b".into()]).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(idx.ids(), vec!["a", "c"]);
    assert!(idx.vector("b").is_none());
    let c = idx.vector("c").unwrap();
    assert!((c[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6, "slots re-packed after removal");
}

proptest! {
    #[test]
    fn search_is_bounded_and_descending(
        vectors in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 4), 0..24),
        query in prop::collection::vec(-1.0f32..1.0, 4),
        top_k in 0usize..30,
        l2 in any::<bool>(),
    ) {
        let metric = if l2 { SimilarityMetric::L2 } else { SimilarityMetric::Cosine };
        let idx = FlatIndex::new(4, metric);
        let n = vectors.len();
        let records = vectors.into_iter().enumerate().map(|(i, v)| rec(&format!("r{i}"), v)).collect();
        idx.add_or_update(&batch(records)).unwrap();

        let hits = idx.search(&query, top_k, &none()).unwrap();
        prop_assert_eq!(hits.len(), top_k.min(n));
        for w in hits.windows(2) {
            prop_assert!(w[0].similarity_score >= w[1].similarity_score);
        }
    }
}
