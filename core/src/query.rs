//! Query engine over a sharded index snapshot.

use crate::builder::BuiltIndex;
use crate::config::MAX_HITS;
use crate::index::{shard_bucket, BucketKey, DocEntry, DocId, Manifest, Shard};
use crate::persist::{load_docs, load_manifest, load_shard, IndexPaths, LoadError, SnapshotPaths};
use crate::provider::SearchHit;
use crate::scorer::{idf, term_score};
use crate::tokenizer::tokenize;
use rayon::prelude::*;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Where shards of a snapshot are fetched from.
pub trait ShardStore: Send + Sync {
    fn load(&self, bucket: &str) -> Result<Shard, LoadError>;

    /// False once the backing storage has gone away (e.g. a pruned generation).
    fn is_available(&self) -> bool {
        true
    }
}

/// Shards read lazily from a snapshot directory.
pub struct DirShards {
    paths: SnapshotPaths,
}

impl ShardStore for DirShards {
    fn load(&self, bucket: &str) -> Result<Shard, LoadError> {
        load_shard(&self.paths, bucket)
    }

    fn is_available(&self) -> bool {
        self.paths.shards_dir().is_dir()
    }
}

/// Shards held in process, e.g. straight out of the builder.
pub struct MemoryShards {
    shards: BTreeMap<BucketKey, Shard>,
}

impl ShardStore for MemoryShards {
    fn load(&self, bucket: &str) -> Result<Shard, LoadError> {
        self.shards.get(bucket).cloned().ok_or_else(|| LoadError::NotFound(PathBuf::from(bucket)))
    }
}

/// Manifest and document table loaded once, shards fetched per query.
pub struct IndexSnapshot {
    manifest: Manifest,
    docs: Vec<DocEntry>,
    shards: Box<dyn ShardStore>,
    generation: Option<String>,
}

impl IndexSnapshot {
    pub fn open(paths: &IndexPaths) -> Result<Self, LoadError> {
        // Read before resolving: a swap in between only costs one extra reload.
        let generation = paths.current_generation();
        let snap = paths.resolve_snapshot()?;
        let manifest = load_manifest(&snap)?;
        let docs = load_docs(&snap)?;
        tracing::debug!(dir = %snap.dir.display(), num_docs = manifest.num_docs, "opened index snapshot");
        Ok(Self { manifest, docs, shards: Box::new(DirShards { paths: snap }), generation })
    }

    pub fn from_built(index: BuiltIndex) -> Self {
        Self {
            manifest: index.manifest,
            docs: index.docs,
            shards: Box::new(MemoryShards { shards: index.shards }),
            generation: None,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn docs(&self) -> &[DocEntry] {
        &self.docs
    }

    pub fn is_available(&self) -> bool {
        self.shards.is_available()
    }

    /// Generation this snapshot was opened from; `None` for flat or in-memory indexes.
    pub fn generation(&self) -> Option<&str> {
        self.generation.as_deref()
    }

    /// Rank documents for `query`, best first, at most [`MAX_HITS`].
    ///
    /// Shards that are missing or unreadable only remove the terms they hold.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let terms = tokenize(query);
        let mut buckets: Vec<BucketKey> = terms.iter().map(|t| shard_bucket(t)).collect();
        buckets.sort();
        buckets.dedup();

        let loaded: HashMap<BucketKey, Shard> = buckets
            .par_iter()
            .filter_map(|b| match self.shards.load(b) {
                Ok(shard) => Some((b.clone(), shard)),
                Err(LoadError::NotFound(_)) => None,
                Err(err) => {
                    tracing::warn!(bucket = %b, error = %err, "ignoring unreadable shard");
                    None
                }
            })
            .collect();

        let mut scored = self.score(&terms, &loaded);
        scored.retain(|(id, _)| (*id as usize) < self.docs.len());
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(MAX_HITS);

        tracing::debug!(terms = terms.len(), buckets = buckets.len(), loaded = loaded.len(), hits = scored.len(), "index search");
        scored
            .into_iter()
            .map(|(id, score)| {
                let doc = &self.docs[id as usize];
                SearchHit { path: doc.path.clone(), title: doc.title.clone(), snippet: doc.snippet.clone(), score }
            })
            .collect()
    }

    /// BM25 totals per document, in first-seen order.
    fn score(&self, terms: &[String], shards: &HashMap<BucketKey, Shard>) -> Vec<(DocId, f64)> {
        let mut totals: Vec<(DocId, f64)> = Vec::new();
        let mut slots: HashMap<DocId, usize> = HashMap::new();
        for term in terms {
            let Some(plist) = shards.get(&shard_bucket(term)).and_then(|s| s.get(term)) else { continue };
            let w = idf(self.manifest.num_docs, plist.len());
            for p in plist {
                let len = self.docs.get(p.doc_id as usize).map_or(0, |d| d.length);
                let add = term_score(w, p.tf, len, self.manifest.avg_len);
                match slots.entry(p.doc_id) {
                    Entry::Occupied(e) => totals[*e.get()].1 += add,
                    Entry::Vacant(e) => {
                        e.insert(totals.len());
                        totals.push((p.doc_id, add));
                    }
                }
            }
        }
        totals
    }
}
