use std::sync::Arc;

use lexdb_core::error::{ConfigError, EmbeddingError, Error};
use lexdb_core::ingest::IngestRecord;
use lexdb_core::traits::{EmbeddingProvider, VectorIndexBackend};
use lexdb_core::types::{BackendKind, Metadata, SimilarityMetric};
use lexdb_embed::HashEmbedder;
use lexdb_retrieval::Indexer;
use lexdb_vector::FlatIndex;

const DIM: usize = 32;

fn records() -> Vec<IngestRecord> {
    [
        "Section 14 of the Limitation Act",
        "Article 21 right to life",
        "Delay condoned in second appeal",
        "Penalty under section 271(1)(c) deleted",
        "Order dated 5 May set aside by the tribunal",
    ]
    .iter()
    .map(|t| IngestRecord::from_content("doc", *t, Metadata::new().with_year("2020")))
    .collect()
}

fn setup(batch: usize) -> (Arc<FlatIndex>, Indexer) {
    let store = Arc::new(FlatIndex::new(DIM, SimilarityMetric::Cosine));
    let indexer = Indexer::new(
        Arc::new(HashEmbedder::new(DIM)),
        vec![Arc::clone(&store) as Arc<dyn VectorIndexBackend>],
        batch,
    )
    .expect("indexer");
    (store, indexer)
}

#[test]
fn batches_and_progress() {
    let (store, indexer) = setup(2);
    let mut seen = Vec::new();
    let report = indexer.index_with(&records(), |n| seen.push(n)).expect("index");
    assert_eq!(report.records, 5);
    assert_eq!(report.batches, 3);
    assert_eq!(report.backends, vec![BackendKind::Flat]);
    assert_eq!(seen, vec![2, 2, 1]);
    assert_eq!(store.count().expect("count"), 5);
}

#[test]
fn reindexing_is_idempotent() {
    let (store, indexer) = setup(4);
    indexer.index(&records()).expect("first");
    let ids = store.ids();
    indexer.index(&records()).expect("second");
    assert_eq!(store.count().expect("count"), 5);
    assert_eq!(store.ids(), ids);
    assert!(ids.iter().all(|id| id.starts_with("doc:")));
}

#[test]
fn delete_reports_per_backend() {
    let (store, indexer) = setup(8);
    let recs = records();
    indexer.index(&recs).expect("index");
    let removed = indexer.delete(&[recs[0].id.clone(), recs[3].id.clone(), "missing".into()]).expect("delete");
    assert_eq!(removed.get(&BackendKind::Flat), Some(&2));
    assert_eq!(store.count().expect("count"), 3);
}

#[test]
fn empty_input_touches_nothing() {
    let (store, indexer) = setup(2);
    let report = indexer.index(&[]).expect("index");
    assert_eq!((report.records, report.batches), (0, 0));
    assert_eq!(store.count().expect("count"), 0);
}

#[test]
fn construction_rejects_bad_arguments() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(DIM));
    assert!(matches!(
        Indexer::new(Arc::clone(&embedder), Vec::new(), 4),
        Err(Error::Config(ConfigError::NoBackendsEnabled))
    ));
    let store: Arc<dyn VectorIndexBackend> = Arc::new(FlatIndex::new(DIM, SimilarityMetric::Cosine));
    assert!(matches!(Indexer::new(embedder, vec![store], 0), Err(Error::Config(ConfigError::InvalidValue { .. }))));
}

struct ShortEmbedder;

impl EmbeddingProvider for ShortEmbedder {
    fn dim(&self) -> usize { DIM }
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().skip(1).map(|_| vec![0.5; DIM]).collect())
    }
    fn embed_query(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> { Ok(vec![0.5; DIM]) }
}

#[test]
fn embedder_count_mismatch_is_an_error() {
    let store = Arc::new(FlatIndex::new(DIM, SimilarityMetric::Cosine));
    let indexer = Indexer::new(Arc::new(ShortEmbedder), vec![Arc::clone(&store) as Arc<dyn VectorIndexBackend>], 3).expect("indexer");
    let err = indexer.index(&records()).unwrap_err();
    assert!(matches!(err, Error::Embedding(EmbeddingError::CountMismatch { expected: 3, actual: 2 })));
    assert_eq!(store.count().expect("count"), 0);
}
