//! Search strategies selectable at startup.

use crate::builder::BuiltIndex;
use crate::config::{SearchConfig, SearchMode};
use crate::fallback::LinearScanner;
use crate::persist::{IndexPaths, LoadError};
use crate::query::IndexSnapshot;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
}

/// Which path answered a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    Index,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub source: SearchSource,
}

pub trait SearchProvider: Send + Sync {
    /// Never fails: every failure mode degrades to fewer or no hits.
    fn search(&self, query: &str) -> SearchResults;

    /// Drop cached state and pick up the latest published data.
    fn refresh(&self) -> anyhow::Result<()>;

    fn mode(&self) -> SearchMode;
}

/// Sharded index, opened on first use and cached until a newer generation is published.
pub struct IndexedSearch {
    paths: Option<IndexPaths>,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl IndexedSearch {
    pub fn new(paths: IndexPaths) -> Self {
        Self { paths: Some(paths), current: RwLock::new(None) }
    }

    /// Serve a build held in memory.
    pub fn in_memory(index: BuiltIndex) -> Self {
        Self { paths: None, current: RwLock::new(Some(Arc::new(IndexSnapshot::from_built(index)))) }
    }

    pub fn snapshot(&self) -> Result<Arc<IndexSnapshot>, LoadError> {
        if let Some(snap) = self.current.read().as_ref() {
            if snap.is_available() && self.is_latest(snap) {
                return Ok(snap.clone());
            }
        }
        self.reload()
    }

    fn is_latest(&self, snap: &IndexSnapshot) -> bool {
        match &self.paths {
            Some(paths) => paths.current_generation().as_deref() == snap.generation(),
            None => true,
        }
    }

    /// Open the currently published snapshot and swap it in.
    pub fn reload(&self) -> Result<Arc<IndexSnapshot>, LoadError> {
        let Some(paths) = &self.paths else {
            return self.current.read().clone().ok_or_else(|| LoadError::NotFound("<memory>".into()));
        };
        let fresh = Arc::new(IndexSnapshot::open(paths)?);
        *self.current.write() = Some(fresh.clone());
        Ok(fresh)
    }

    pub fn try_search(&self, query: &str) -> Result<Vec<SearchHit>, LoadError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.snapshot()?.search(query))
    }
}

/// Index first; linear scan of the corpus when no snapshot can be opened.
pub struct FailoverSearch {
    primary: IndexedSearch,
    fallback: LinearScanner,
}

impl FailoverSearch {
    pub fn new(primary: IndexedSearch, fallback: LinearScanner) -> Self {
        Self { primary, fallback }
    }
}

impl SearchProvider for FailoverSearch {
    fn search(&self, query: &str) -> SearchResults {
        match self.primary.try_search(query) {
            Ok(hits) => SearchResults { hits, source: SearchSource::Index },
            Err(err) => {
                tracing::warn!(error = %err, "index unavailable, using linear scan");
                SearchResults { hits: self.fallback.search(query), source: SearchSource::Fallback }
            }
        }
    }

    fn refresh(&self) -> anyhow::Result<()> {
        self.fallback.refresh_if_loaded();
        self.primary.reload()?;
        Ok(())
    }

    fn mode(&self) -> SearchMode {
        SearchMode::Index
    }
}

impl SearchProvider for LinearScanner {
    fn search(&self, query: &str) -> SearchResults {
        SearchResults { hits: LinearScanner::search(self, query), source: SearchSource::Fallback }
    }

    fn refresh(&self) -> anyhow::Result<()> {
        LinearScanner::refresh(self);
        Ok(())
    }

    fn mode(&self) -> SearchMode {
        SearchMode::Live
    }
}

pub fn create_provider(config: &SearchConfig) -> Arc<dyn SearchProvider> {
    tracing::info!(mode = %config.mode, corpus = %config.corpus.root.display(), index = %config.index_dir.display(), "search provider");
    match config.mode {
        SearchMode::Index => Arc::new(FailoverSearch::new(
            IndexedSearch::new(IndexPaths::new(&config.index_dir)),
            LinearScanner::new(config.corpus.clone()),
        )),
        SearchMode::Live => Arc::new(LinearScanner::new(config.corpus.clone())),
    }
}
