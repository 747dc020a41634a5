use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use wikidex_core::config::DEFAULT_EXCLUDE;
use wikidex_core::persist::{publish, publish_flat, IndexPaths};
use wikidex_core::{build_from_corpus, create_provider, CorpusConfig, IndexLayout, SearchConfig, SearchMode};

#[derive(Parser)]
#[command(name = "wikidex-indexer")]
#[command(about = "Build and query the sharded BM25 index of a static HTML corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rebuild the index from scratch and publish it
    Build {
        /// Corpus root directory
        #[arg(long, env = "WIKI_DIR", default_value = "../wiki")]
        wiki: PathBuf,
        /// Output index directory
        #[arg(long, env = "INDEX_DIR", default_value = "./public/search-index")]
        out: PathBuf,
        /// Comma-separated top-level directories to skip
        #[arg(long, env = "WIKI_EXCLUDE", default_value = DEFAULT_EXCLUDE)]
        exclude: String,
        /// `generations` (atomic swap) or `flat` (files served directly by a static host)
        #[arg(long, env = "INDEX_LAYOUT", default_value = "generations")]
        layout: IndexLayout,
    },
    /// Run a query against a published index and print the hits as JSON
    Query {
        #[arg(long, env = "INDEX_DIR", default_value = "./public/search-index")]
        index: PathBuf,
        /// Corpus root, scanned if the index cannot be opened
        #[arg(long, env = "WIKI_DIR", default_value = "../wiki")]
        wiki: PathBuf,
        #[arg(long, env = "WIKI_EXCLUDE", default_value = DEFAULT_EXCLUDE)]
        exclude: String,
        #[arg(long, env = "RUNTIME_MODE", default_value = "index")]
        mode: SearchMode,
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { wiki, out, exclude, layout } => {
            let corpus = CorpusConfig::new(wiki).with_exclude(CorpusConfig::parse_exclude(&exclude));
            build(&corpus, &out, layout)
        }
        Commands::Query { index, wiki, exclude, mode, query } => {
            let corpus = CorpusConfig::new(wiki).with_exclude(CorpusConfig::parse_exclude(&exclude));
            let provider = create_provider(&SearchConfig { corpus, index_dir: index, mode });
            let results = provider.search(&query);
            tracing::info!(source = ?results.source, hits = results.hits.len(), "query complete");
            println!("{}", serde_json::to_string_pretty(&results.hits)?);
            Ok(())
        }
    }
}

fn build(corpus: &CorpusConfig, out: &Path, layout: IndexLayout) -> Result<()> {
    if !corpus.root.is_dir() {
        println!("WIKI_DIR not found: {}. Writing empty index.", corpus.root.display());
    }
    let mut index = build_from_corpus(corpus);
    index.manifest.created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .ok();

    let paths = IndexPaths::new(out);
    let snapshot = match layout {
        IndexLayout::Generations => publish(&paths, &index)?,
        IndexLayout::Flat => publish_flat(&paths, &index)?,
    };
    println!("Indexed {} docs, {} terms", index.manifest.num_docs, index.num_terms());
    tracing::info!(output = %snapshot.dir.display(), %layout, "index build complete");
    Ok(())
}
