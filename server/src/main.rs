use anyhow::Result;
use axum::Router;
use clap::Parser;
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};
use wikidex_core::config::DEFAULT_EXCLUDE;
use wikidex_core::{CorpusConfig, SearchConfig, SearchMode};

#[derive(Parser)]
struct Args {
    /// Corpus root directory
    #[arg(long, env = "WIKI_DIR", default_value = "../wiki")]
    wiki: PathBuf,
    /// Comma-separated top-level directories to skip
    #[arg(long, env = "WIKI_EXCLUDE", default_value = DEFAULT_EXCLUDE)]
    exclude: String,
    /// Index directory path
    #[arg(long, env = "INDEX_DIR", default_value = "./public/search-index")]
    index: PathBuf,
    /// `index` (sharded index with live-scan failover) or `live` (live scan only)
    #[arg(long, env = "RUNTIME_MODE", default_value = "index")]
    mode: SearchMode,
    /// Token required by admin endpoints
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = SearchConfig {
        corpus: CorpusConfig::new(args.wiki).with_exclude(CorpusConfig::parse_exclude(&args.exclude)),
        index_dir: args.index,
        mode: args.mode,
    };
    let app: Router = build_app(config, args.admin_token)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
