use crate::config::CorpusConfig;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Name ends in `.htm` or `.html`, any case. A bare `.html` counts.
pub fn is_html(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .map(|n| n.ends_with(".html") || n.ends_with(".htm"))
        .unwrap_or(false)
}

fn is_excluded_top_level(entry: &DirEntry, exclude: &[String]) -> bool {
    entry.depth() == 1
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| exclude.iter().any(|x| x.eq_ignore_ascii_case(name)))
            .unwrap_or(false)
}

/// Every HTML file under the corpus root, in sorted walk order.
///
/// A missing root is an empty corpus. Unreadable directories are skipped.
pub fn scan_corpus(corpus: &CorpusConfig) -> Vec<PathBuf> {
    if !corpus.root.is_dir() {
        tracing::warn!(root = %corpus.root.display(), "corpus root not found");
        return Vec::new();
    }
    WalkDir::new(&corpus.root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded_top_level(e, &corpus.exclude))
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_html(e.path()))
        .map(DirEntry::into_path)
        .collect()
}

/// Corpus-relative, '/'-separated path of `file`.
pub fn relative_path(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
