use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// BM25 term frequency saturation.
pub const BM25_K1: f64 = 1.2;
/// BM25 length normalization.
pub const BM25_B: f64 = 0.75;

/// Maximum number of hits returned by any search path.
pub const MAX_HITS: usize = 50;
/// Characters of extracted text kept as the stored snippet.
pub const SNIPPET_CHARS: usize = 240;
/// Characters of extracted text (after the title) that get tokenized.
pub const INDEXED_TEXT_CHARS: usize = 1200;
/// Half-width of the window the linear scanner cuts around a match.
pub const FALLBACK_WINDOW_CHARS: usize = 100;
/// Snippet length used by the linear scanner when the term is not found verbatim.
pub const FALLBACK_SNIPPET_CHARS: usize = 200;

/// Schema version written into every manifest.
pub const SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_EXCLUDE: &str = "common";

/// Where the corpus lives and which top-level directories to skip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl CorpusConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into(), exclude: Vec::new() }
    }

    pub fn with_exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a comma-separated exclusion list such as `WIKI_EXCLUDE=common,assets`.
    pub fn parse_exclude(raw: &str) -> Vec<String> {
        raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
    }
}

/// Which search strategy a deployment runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Precomputed sharded index, failing over to a live scan when it is unavailable.
    #[default]
    Index,
    /// Live scan of the corpus only.
    Live,
}

impl FromStr for SearchMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" | "static" | "serverless" => Ok(SearchMode::Index),
            "live" | "fs" | "server" => Ok(SearchMode::Live),
            other => Err(anyhow::anyhow!("unknown search mode: {other}")),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Index => f.write_str("index"),
            SearchMode::Live => f.write_str("live"),
        }
    }
}

/// How a build is laid out under the index directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexLayout {
    /// `CURRENT` plus `generations/gen-NNNNNN/`, swapped atomically.
    #[default]
    Generations,
    /// `manifest.json`, `docs.json` and `shards/` directly in the index directory.
    Flat,
}

impl FromStr for IndexLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generations" | "versioned" => Ok(IndexLayout::Generations),
            "flat" => Ok(IndexLayout::Flat),
            other => Err(anyhow::anyhow!("unknown index layout: {other}")),
        }
    }
}

impl fmt::Display for IndexLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexLayout::Generations => f.write_str("generations"),
            IndexLayout::Flat => f.write_str("flat"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub corpus: CorpusConfig,
    pub index_dir: PathBuf,
    #[serde(default)]
    pub mode: SearchMode,
}
