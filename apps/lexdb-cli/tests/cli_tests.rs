use std::fs;

use serde_json::{json, Value};
use tempfile::TempDir;

use lexdb_cli::input::{collect_files, load_records, read_records};
use lexdb_cli::output::{format_human, format_json, truncate_text};
use lexdb_cli::{filters_from, open_engine, parse_filter};
use lexdb_core::config::EngineConfig;
use lexdb_core::ingest::content_id;
use lexdb_core::traits::VectorIndexBackend;
use lexdb_core::types::{BackendKind, Metadata, RerankedResult, Signals, UpsertBatch};

#[test]
fn filters_parse_scalars_and_plain_strings() {
    assert_eq!(parse_filter("year=2020").unwrap(), ("year".to_string(), json!(2020)));
    assert_eq!(parse_filter("court = SC").unwrap(), ("court".to_string(), json!("SC")));
    assert_eq!(parse_filter("title=\"Limitation Act\"").unwrap(), ("title".to_string(), json!("Limitation Act")));
    assert_eq!(parse_filter("tags=[1,2]").unwrap().1, Value::String("[1,2]".into()));
    assert!(parse_filter("year").is_err());
    assert!(parse_filter("=2020").is_err());

    let filters = filters_from(vec![parse_filter("year=2020").unwrap()]);
    assert!(Metadata::new().with_year("2020").matches(&filters));
}

#[test]
fn jsonl_and_txt_inputs() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("acts");
    fs::create_dir_all(&nested).unwrap();
    fs::write(
        nested.join("limitation.jsonl"),
        concat!(
            "{\"id\": \"lim-14\", \"text\": \"Section 14 excludes time\", \"metadata\": {\"year\": 1963}}\n",
            "\n",
            "{\"source_id\": \"lim\", \"text\": \"Section 5 allows condonation\"}\n",
        ),
    )
    .unwrap();
    fs::write(tmp.path().join("notes.txt"), "First paragraph.\n\n\n  Second paragraph.  \n").unwrap();
    fs::write(tmp.path().join("ignored.md"), "# nope").unwrap();

    let files = collect_files(&[tmp.path().to_path_buf()]);
    assert_eq!(files.len(), 2);

    let records = load_records(&files).unwrap();
    assert_eq!(records.len(), 4);
    let first = &records[0];
    assert_eq!(first.id, "lim-14");
    assert_eq!(first.metadata.year.as_deref(), Some("1963"));
    assert_eq!(first.metadata.source_id.as_deref(), Some("limitation"));
    assert_eq!(records[1].id, content_id("lim", "Section 5 allows condonation"));

    let notes = read_records(&tmp.path().join("notes.txt")).unwrap();
    assert_eq!(notes.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(), vec!["First paragraph.", "Second paragraph."]);
    assert_eq!(notes[1].metadata.chunk_index, Some(1));
    assert_eq!(notes[0].id, content_id("notes", "First paragraph."));
}

#[test]
fn windows_line_endings_still_split_paragraphs() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("order.txt");
    fs::write(&path, "Appeal admitted.\r\n\r\nDelay condoned.\r\nCosts to follow.\r\n").unwrap();
    let records = read_records(&path).unwrap();
    assert_eq!(
        records.iter().map(|r| r.text.as_str()).collect::<Vec<_>>(),
        vec!["Appeal admitted.", "Delay condoned.\nCosts to follow."]
    );
    assert_eq!(records[1].metadata.chunk_index, Some(1));
    assert_eq!(records[0].id, content_id("order", "Appeal admitted."));
}

#[test]
fn malformed_lines_name_the_location() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.jsonl");
    fs::write(&path, "{\"text\": \"ok\"}\n{\"title\": \"no text\"}\n").unwrap();
    let err = read_records(&path).unwrap_err();
    assert!(format!("{err:#}").contains("bad.jsonl:2"));
}

fn result() -> RerankedResult {
    RerankedResult {
        id: "lim-14".into(),
        text: "Section 14 of the Limitation Act\nexcludes time".into(),
        metadata: Metadata::new().with_title("Limitation Act").with_year("1963"),
        similarity_score: 0.8,
        final_score: 0.59,
        signals: Signals { similarity: 0.8, metadata: 0.05, exact_match: 0.05, recency: 0.0 },
        source: BackendKind::Flat,
    }
}

#[test]
fn rendering() {
    let human = format_human("limitation", &[result()]);
    assert!(human.contains("1. Limitation Act"));
    assert!(human.contains("year: 1963"));
    assert!(human.contains("Section 14 of the Limitation Act excludes time"));
    assert!(format_human("nothing", &[]).contains("No results"));

    let parsed: Value = serde_json::from_str(&format_json("limitation", &[result()])).unwrap();
    assert_eq!(parsed["query"], "limitation");
    assert_eq!(parsed["results"][0]["id"], "lim-14");

    assert_eq!(truncate_text("a  b\nc", 10), "a b c");
    assert_eq!(truncate_text("abcdef", 3), "abc…");
}

#[test]
fn stats_and_delete_work_without_an_embedding_model() {
    let tmp = TempDir::new().unwrap();
    // No model produces 7-dim vectors; only the stores are touched here.
    let mut config = EngineConfig::new(7);
    config.base_path = tmp.path().join("stores");
    let engine = open_engine(config).unwrap();

    let flat = engine.manager.flat_store().unwrap().unwrap();
    flat.add_or_update(&UpsertBatch::new(
        vec!["a".into(), "b".into()],
        vec!["first".into(), "second".into()],
        vec![vec![1.0; 7], vec![0.5; 7]],
        vec![Metadata::new(), Metadata::new()],
    ))
    .unwrap();

    assert_eq!(engine.manager.counts().unwrap().get(&BackendKind::Flat), Some(&2));
    let removed = engine.manager.delete(&["a".to_string(), "zzz".to_string()]).unwrap();
    assert_eq!(removed.get(&BackendKind::Flat), Some(&1));
    engine.manager.persist_all().unwrap();
    assert_eq!(engine.manager.counts().unwrap().get(&BackendKind::Flat), Some(&1));
}
