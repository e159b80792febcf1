//! `lexdb-indexer` - embed records from `.jsonl`/`.txt` files into every enabled backend.

use std::path::PathBuf;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use lexdb_cli::input::{collect_files, load_records};
use lexdb_cli::{init_tracing, load_engine_config, open_engine};
use lexdb_retrieval::Indexer;

#[derive(Parser)]
#[command(name = "lexdb-indexer", version, about = "Index legal records for retrieval")]
struct Cli {
    /// Files or directories to ingest
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Override `engine.base_path`
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// Override `engine.ingest_batch_size`
    #[arg(long)]
    batch_size: Option<usize>,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<usize>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_engine_config(cli.base_path)?;
    if let Some(n) = cli.batch_size {
        config.ingest_batch_size = n;
    }
    let engine = open_engine(config)?;

    let files = collect_files(&cli.paths);
    info!(files = files.len(), "collected input files");
    let mut records = load_records(&files)?;
    if let Some(limit) = cli.limit {
        records.truncate(limit);
    }
    if records.is_empty() {
        println!("Nothing to index under {} path(s)", cli.paths.len());
        return Ok(());
    }

    let indexer = Indexer::from_manager(&engine.manager, engine.embedder()?)?;
    let bar = ProgressBar::new(records.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} records ({eta})")?.progress_chars("=> "),
    );
    let report = indexer.index_with(&records, |n| bar.inc(n as u64))?;
    bar.finish_and_clear();
    engine.manager.persist_all()?;

    println!("✅ Indexed {} records in {} batches from {} files", report.records, report.batches, files.len());
    for kind in &report.backends {
        println!("   → {kind} at {}", engine.config.base_path.display());
    }
    Ok(())
}
