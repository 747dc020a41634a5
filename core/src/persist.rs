//! On-disk layout of an index snapshot.
//!
//! ```text
//! <root>/CURRENT                      name of the live generation
//! <root>/generations/gen-000007/
//!     manifest.json
//!     docs.json
//!     shards/<bucket>.json
//! ```
//!
//! A root without `CURRENT` but with a `manifest.json` is read as a flat,
//! single-snapshot layout. [`publish_flat`] writes that layout for static
//! hosts that serve `<root>/manifest.json` directly.

use crate::builder::BuiltIndex;
use crate::config::SCHEMA_VERSION;
use crate::index::{DocEntry, Manifest, Shard};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, create_dir_all, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const GENERATION_PREFIX: &str = "gen-";
const STAGING_PREFIX: &str = ".staging-";

/// Why a snapshot artifact could not be used.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("I/O error reading {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("malformed {path}: {source}")]
    Json { path: PathBuf, source: serde_json::Error },

    #[error("unsupported schema version {found} (supported up to {supported})")]
    Schema { found: u32, supported: u32 },
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn current(&self) -> PathBuf { self.root.join("CURRENT") }
    fn generations(&self) -> PathBuf { self.root.join("generations") }

    /// Generation named by `CURRENT`, or `None` for a flat or empty root.
    pub fn current_generation(&self) -> Option<String> {
        fs::read_to_string(self.current()).ok().map(|s| s.trim().to_string())
    }

    /// Directory of the snapshot queries should read right now.
    pub fn resolve_snapshot(&self) -> Result<SnapshotPaths, LoadError> {
        match fs::read_to_string(self.current()) {
            Ok(name) => {
                let dir = self.generations().join(name.trim());
                return if dir.is_dir() { Ok(SnapshotPaths::new(dir)) } else { Err(LoadError::NotFound(dir)) };
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => return Err(LoadError::Io { path: self.current(), source }),
        }
        let flat = SnapshotPaths::new(&self.root);
        if flat.manifest().is_file() {
            Ok(flat)
        } else {
            Err(LoadError::NotFound(flat.manifest()))
        }
    }

    fn generation_numbers(&self) -> Vec<u64> {
        let Ok(entries) = fs::read_dir(self.generations()) else { return Vec::new() };
        entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().and_then(|n| n.strip_prefix(GENERATION_PREFIX)).and_then(|n| n.parse().ok()))
            .collect()
    }
}

/// Files of one immutable snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    pub dir: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }
    /// Last path component, e.g. `gen-000007`.
    pub fn name(&self) -> String {
        self.dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
    pub fn manifest(&self) -> PathBuf { self.dir.join("manifest.json") }
    pub fn docs(&self) -> PathBuf { self.dir.join("docs.json") }
    pub fn shards_dir(&self) -> PathBuf { self.dir.join("shards") }
    pub fn shard(&self, bucket: &str) -> PathBuf { self.shards_dir().join(format!("{bucket}.json")) }
}

fn is_bucket_key(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(LoadError::NotFound(path.to_path_buf())),
        Err(source) => return Err(LoadError::Io { path: path.to_path_buf(), source }),
    };
    serde_json::from_slice(&bytes).map_err(|source| LoadError::Json { path: path.to_path_buf(), source })
}

pub fn load_manifest(paths: &SnapshotPaths) -> Result<Manifest, LoadError> {
    let manifest: Manifest = read_json(&paths.manifest())?;
    if manifest.version > SCHEMA_VERSION {
        return Err(LoadError::Schema { found: manifest.version, supported: SCHEMA_VERSION });
    }
    Ok(manifest)
}

pub fn load_docs(paths: &SnapshotPaths) -> Result<Vec<DocEntry>, LoadError> {
    read_json(&paths.docs())
}

pub fn load_shard(paths: &SnapshotPaths, bucket: &str) -> Result<Shard, LoadError> {
    if !is_bucket_key(bucket) {
        return Err(LoadError::NotFound(paths.shard(bucket)));
    }
    read_json(&paths.shard(bucket))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, value)?;
    w.flush()?;
    Ok(())
}

/// Write manifest, document table and shards into `paths.dir`.
pub fn write_snapshot(paths: &SnapshotPaths, index: &BuiltIndex) -> Result<()> {
    create_dir_all(paths.shards_dir()).with_context(|| format!("creating {}", paths.shards_dir().display()))?;
    for (bucket, shard) in &index.shards {
        write_json(&paths.shard(bucket), shard)?;
    }
    write_json(&paths.docs(), &index.docs)?;
    write_json(&paths.manifest(), &index.manifest)?;
    Ok(())
}

/// Write `index` as a new generation and atomically make it the live one.
///
/// The generation that was live before stays on disk for readers still using
/// it; anything older is removed.
pub fn publish(paths: &IndexPaths, index: &BuiltIndex) -> Result<SnapshotPaths> {
    let generations = paths.generations();
    create_dir_all(&generations).with_context(|| format!("creating {}", generations.display()))?;

    let previous = paths.current_generation();
    let next = paths.generation_numbers().into_iter().max().map_or(1, |n| n + 1);
    let name = format!("{GENERATION_PREFIX}{next:06}");

    let staging = generations.join(format!("{STAGING_PREFIX}{next:06}"));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    write_snapshot(&SnapshotPaths::new(&staging), index)?;
    let live = generations.join(&name);
    fs::rename(&staging, &live).with_context(|| format!("publishing {}", live.display()))?;

    let tmp = paths.root.join("CURRENT.tmp");
    fs::write(&tmp, &name)?;
    fs::rename(&tmp, paths.current()).context("swapping CURRENT")?;
    tracing::info!(generation = %name, num_docs = index.manifest.num_docs, "published index snapshot");

    for n in paths.generation_numbers() {
        let old = format!("{GENERATION_PREFIX}{n:06}");
        if old == name || previous.as_deref() == Some(old.as_str()) {
            continue;
        }
        if let Err(err) = fs::remove_dir_all(generations.join(&old)) {
            tracing::warn!(generation = %old, error = %err, "failed to prune old generation");
        }
    }
    Ok(SnapshotPaths::new(live))
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    let res = if path.is_dir() { fs::remove_dir_all(path) } else { fs::remove_file(path) };
    match res {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Write `index` directly into the root, replacing whatever was there.
///
/// Shards are staged beside the live directory and swapped in by rename, the
/// manifest goes last. A generation layout under the root is removed, since
/// `CURRENT` would otherwise shadow the flat files.
pub fn publish_flat(paths: &IndexPaths, index: &BuiltIndex) -> Result<SnapshotPaths> {
    create_dir_all(&paths.root).with_context(|| format!("creating {}", paths.root.display()))?;
    let flat = SnapshotPaths::new(&paths.root);
    let staging = SnapshotPaths::new(paths.root.join(format!("{STAGING_PREFIX}flat")));
    let retired = paths.root.join(format!("{STAGING_PREFIX}retired-shards"));
    remove_if_present(&staging.dir)?;
    remove_if_present(&retired)?;
    write_snapshot(&staging, index)?;

    if flat.shards_dir().is_dir() {
        fs::rename(flat.shards_dir(), &retired)?;
    }
    fs::rename(staging.shards_dir(), flat.shards_dir()).context("swapping shards")?;
    fs::rename(staging.docs(), flat.docs())?;
    fs::rename(staging.manifest(), flat.manifest())?;
    remove_if_present(&staging.dir)?;
    remove_if_present(&retired)?;

    remove_if_present(&paths.current())?;
    remove_if_present(&paths.generations())?;
    tracing::info!(root = %paths.root.display(), num_docs = index.manifest.num_docs, "published flat index");
    Ok(flat)
}
