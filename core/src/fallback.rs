//! Naive substring ranking over raw page text, used when no index snapshot
//! can be opened.

use crate::builder::SourceDoc;
use crate::config::{CorpusConfig, FALLBACK_SNIPPET_CHARS, FALLBACK_WINDOW_CHARS, MAX_HITS};
use crate::extract::{html_to_text, prefix_chars, title_or_basename};
use crate::provider::SearchHit;
use crate::scan::{relative_path, scan_corpus};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CorpusDoc {
    pub path: String,
    pub title: String,
    pub text: String,
    lowered: String,
}

impl CorpusDoc {
    fn from_source(doc: &SourceDoc) -> Self {
        let html = String::from_utf8_lossy(&doc.html);
        let text = html_to_text(&html);
        let lowered = text.to_lowercase();
        Self { path: doc.path.clone(), title: title_or_basename(&html, Path::new(&doc.path)), text, lowered }
    }

    fn score(&self, terms: &[&str]) -> usize {
        terms.iter().map(|t| self.lowered.matches(t).count()).sum()
    }

    /// Window of text around the first occurrence of `term`.
    fn snippet(&self, term: Option<&str>) -> String {
        let found = term.and_then(|t| self.lowered.find(t));
        let Some(byte_idx) = found else {
            return prefix_chars(&self.text, FALLBACK_SNIPPET_CHARS).to_string();
        };
        let chars: Vec<char> = self.text.chars().collect();
        // Lowercasing can change lengths, so the position is clamped to `text`.
        let idx = self.lowered[..byte_idx].chars().count().min(chars.len());
        let start = idx.saturating_sub(FALLBACK_WINDOW_CHARS);
        let end = (idx + FALLBACK_WINDOW_CHARS).min(chars.len());
        let mut out = String::new();
        if start > 0 {
            out.push('…');
        }
        out.extend(&chars[start..end]);
        if end < chars.len() {
            out.push('…');
        }
        out
    }
}

/// Extracted text of every document, scanned once.
#[derive(Debug, Clone, Default)]
pub struct CorpusTable {
    docs: Vec<CorpusDoc>,
}

impl CorpusTable {
    pub fn scan(corpus: &CorpusConfig) -> Self {
        let docs: Vec<CorpusDoc> = scan_corpus(corpus)
            .par_iter()
            .filter_map(|file| match fs::read(file) {
                Ok(bytes) => Some(CorpusDoc::from_source(&SourceDoc::new(relative_path(&corpus.root, file), bytes))),
                Err(err) => {
                    tracing::warn!(path = %file.display(), error = %err, "skipping unreadable document");
                    None
                }
            })
            .collect();
        tracing::info!(num_docs = docs.len(), root = %corpus.root.display(), "scanned corpus for linear search");
        Self { docs }
    }

    pub fn from_docs(docs: &[SourceDoc]) -> Self {
        Self { docs: docs.iter().map(CorpusDoc::from_source).collect() }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let q = query.to_lowercase();
        let terms: Vec<&str> = q.split_whitespace().collect();

        let mut scored: Vec<(usize, usize)> = self
            .docs
            .par_iter()
            .enumerate()
            .map(|(i, d)| (i, d.score(&terms)))
            .filter(|(_, s)| *s > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(MAX_HITS);

        let first = terms.first().copied();
        scored
            .into_iter()
            .map(|(i, score)| {
                let d = &self.docs[i];
                SearchHit { path: d.path.clone(), title: d.title.clone(), snippet: d.snippet(first), score: score as f64 }
            })
            .collect()
    }
}

/// Linear scanner holding an immutable [`CorpusTable`] that can be rebuilt and swapped.
pub struct LinearScanner {
    corpus: Option<CorpusConfig>,
    table: RwLock<Option<Arc<CorpusTable>>>,
}

impl LinearScanner {
    /// Scanner that reads the corpus on first use.
    pub fn new(corpus: CorpusConfig) -> Self {
        Self { corpus: Some(corpus), table: RwLock::new(None) }
    }

    /// Scanner over a fixed table; `refresh` keeps it as is.
    pub fn with_table(table: CorpusTable) -> Self {
        Self { corpus: None, table: RwLock::new(Some(Arc::new(table))) }
    }

    pub fn table(&self) -> Arc<CorpusTable> {
        if let Some(t) = self.table.read().as_ref() {
            return t.clone();
        }
        let mut slot = self.table.write();
        if let Some(t) = slot.as_ref() {
            return t.clone();
        }
        let fresh = Arc::new(self.corpus.as_ref().map(CorpusTable::scan).unwrap_or_default());
        *slot = Some(fresh.clone());
        fresh
    }

    /// Rescan the corpus and replace the table in one step.
    pub fn refresh(&self) {
        if let Some(corpus) = &self.corpus {
            let fresh = Arc::new(CorpusTable::scan(corpus));
            *self.table.write() = Some(fresh);
        }
    }

    /// Like [`refresh`](Self::refresh), but only if a table was ever built.
    pub fn refresh_if_loaded(&self) {
        if self.table.read().is_some() {
            self.refresh();
        }
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        self.table().search(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn table() -> CorpusTable {
        CorpusTable::from_docs(&[
            SourceDoc::new("a.html", "<title>A</title><p>Rust rust RUST and more</p>"),
            SourceDoc::new("b.html", "<p>only one rust here</p>"),
            SourceDoc::new("c.html", "<p>nothing</p>"),
        ])
    }

    #[test]
    fn counts_substring_occurrences() {
        let hits = table().search("rust");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, "a.html");
        assert_eq!(hits[0].score, 3.0);
        assert_eq!(hits[1].title, "b.html");
        assert_eq!(hits[1].score, 1.0);
    }

    #[test]
    fn sums_over_terms_and_ignores_empty_query() {
        let t = table();
        assert_eq!(t.search("rust more")[0].score, 4.0);
        assert!(t.search("  ").is_empty());
        assert!(t.search("zebra").is_empty());
    }

    #[test]
    fn snippet_windows_around_first_term() {
        let body = format!("{}needle{}", "x ".repeat(150), " y".repeat(150));
        let t = CorpusTable::from_docs(&[SourceDoc::new("n.html", format!("<p>{body}</p>"))]);
        let hit = &t.search("needle")[0];
        assert!(hit.snippet.starts_with('…'));
        assert!(hit.snippet.ends_with('…'));
        assert!(hit.snippet.contains("needle"));
        assert_eq!(hit.snippet.chars().count(), 202);

        let short = CorpusTable::from_docs(&[SourceDoc::new("s.html", "<p>short needle text</p>")]);
        assert_eq!(short.search("needle")[0].snippet, "short needle text");
    }

    #[test]
    fn snippet_falls_back_to_prefix() {
        let body = "a".repeat(300);
        let d = CorpusDoc::from_source(&SourceDoc::new("p.html", body));
        assert_eq!(d.snippet(Some("zzz")), "a".repeat(200));
    }

    #[test]
    fn caps_results() {
        let docs: Vec<SourceDoc> = (0..120).map(|i| SourceDoc::new(format!("{i}.html"), "<p>term</p>")).collect();
        assert_eq!(CorpusTable::from_docs(&docs).search("term").len(), MAX_HITS);
    }

    #[test]
    fn refresh_swaps_table() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one.html"), "<p>alpha</p>").unwrap();
        let scanner = LinearScanner::new(CorpusConfig::new(dir.path()));
        assert_eq!(scanner.search("alpha").len(), 1);

        fs::write(dir.path().join("two.html"), "<p>alpha</p>").unwrap();
        let before = scanner.table();
        assert_eq!(scanner.search("alpha").len(), 1);
        scanner.refresh();
        assert_eq!(scanner.search("alpha").len(), 2);
        assert_eq!(before.len(), 1);
    }
}
