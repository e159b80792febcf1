//! `lexdb` - query and inspect the legal retrieval index.
//!
//! ```bash
//! lexdb query "condonation of delay in appeal" -k 5
//! lexdb query "penalty" --filter year=2021 --json
//! lexdb stats
//! lexdb delete doc:1a2b3c4d5e6f7a8b
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::info;

use lexdb_cli::output::{format_human, format_json};
use lexdb_cli::{filters_from, init_tracing, load_engine_config, open_engine, parse_filter};
use lexdb_retrieval::Retriever;

#[derive(Parser)]
#[command(name = "lexdb", version, about = "Hybrid retrieval over legal research records")]
struct Cli {
    /// Override `engine.base_path`
    #[arg(long, global = true)]
    base_path: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Expand, search every enabled backend and rerank
    Query {
        text: String,
        /// Results to return (default: engine.top_k_default)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Metadata equality filter, repeatable
        #[arg(short, long = "filter", value_parser = parse_filter)]
        filters: Vec<(String, Value)>,
        #[arg(long)]
        json: bool,
    },
    /// Record count per enabled backend
    Stats,
    /// Remove records by id from every enabled backend
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let engine = open_engine(load_engine_config(cli.base_path)?)?;

    match cli.command {
        Command::Query { text, top_k, filters, json } => {
            let retriever = Retriever::from_manager(&engine.manager, engine.embedder()?)?;
            let results = retriever.retrieve(&text, top_k, &filters_from(filters))?;
            let rendered = if json { format_json(&text, &results) } else { format_human(&text, &results) };
            println!("{rendered}");
        }
        Command::Stats => {
            println!("📊 {} (dim {}, {})", engine.config.base_path.display(), engine.config.embedding_dim, engine.config.similarity_metric);
            for (kind, n) in engine.manager.counts()? {
                println!("  {kind}: {n} records");
            }
        }
        Command::Delete { ids } => {
            let removed = engine.manager.delete(&ids)?;
            engine.manager.persist_all()?;
            for (kind, n) in &removed {
                println!("🗑️  {kind}: removed {n} of {}", ids.len());
            }
            info!(?removed, "delete persisted");
        }
    }
    Ok(())
}
