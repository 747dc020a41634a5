//! Offline index construction: per-document analysis in parallel, then a
//! single ordered reduction into postings, shards and the manifest.

use crate::config::{CorpusConfig, INDEXED_TEXT_CHARS, SNIPPET_CHARS};
use crate::extract::{html_to_text, prefix_chars, title_or_basename};
use crate::index::{shard_bucket, BucketKey, DocEntry, DocId, Manifest, Posting, Shard};
use crate::scan::{relative_path, scan_corpus};
use crate::tokenizer::tokenize;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;

/// A raw document handed to the builder.
#[derive(Debug, Clone)]
pub struct SourceDoc {
    /// Corpus-relative, '/'-separated.
    pub path: String,
    pub html: Vec<u8>,
}

impl SourceDoc {
    pub fn new<P: Into<String>, B: Into<Vec<u8>>>(path: P, html: B) -> Self {
        Self { path: path.into(), html: html.into() }
    }
}

/// Result of one document's analysis, before an id is assigned.
#[derive(Debug, Clone)]
struct AnalyzedDoc {
    path: String,
    title: String,
    snippet: String,
    length: u32,
    term_freqs: HashMap<String, u32>,
}

fn analyze(doc: &SourceDoc) -> AnalyzedDoc {
    let html = String::from_utf8_lossy(&doc.html);
    let text = html_to_text(&html);
    let title = title_or_basename(&html, Path::new(&doc.path));
    let snippet = prefix_chars(&text, SNIPPET_CHARS).to_string();
    let tokens = tokenize(&format!("{} {}", title, prefix_chars(&text, INDEXED_TEXT_CHARS)));

    let mut term_freqs: HashMap<String, u32> = HashMap::new();
    for t in &tokens {
        *term_freqs.entry(t.clone()).or_insert(0) += 1;
    }
    AnalyzedDoc { path: doc.path.clone(), title, snippet, length: tokens.len() as u32, term_freqs }
}

/// Everything one build produces. Treated as a single snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltIndex {
    pub manifest: Manifest,
    pub docs: Vec<DocEntry>,
    pub shards: BTreeMap<BucketKey, Shard>,
}

impl BuiltIndex {
    pub fn empty() -> Self {
        Self { manifest: Manifest::empty(), docs: Vec::new(), shards: BTreeMap::new() }
    }

    pub fn num_terms(&self) -> usize {
        self.shards.values().map(|s| s.len()).sum()
    }
}

/// Build an index from in-memory documents. Ids follow the input order.
pub fn build_index(docs: Vec<SourceDoc>) -> BuiltIndex {
    let analyzed: Vec<AnalyzedDoc> = docs.par_iter().map(analyze).collect();
    assemble(analyzed)
}

/// Scan the corpus and build an index from every readable HTML file.
///
/// A missing root produces the empty index. Files that cannot be read are
/// skipped and do not consume a document id.
pub fn build_from_corpus(corpus: &CorpusConfig) -> BuiltIndex {
    build_from_corpus_with(corpus, |path| fs::read(path))
}

/// [`build_from_corpus`] with a caller-supplied file reader.
pub fn build_from_corpus_with<F>(corpus: &CorpusConfig, read: F) -> BuiltIndex
where
    F: Fn(&Path) -> io::Result<Vec<u8>> + Sync,
{
    let files = scan_corpus(corpus);
    tracing::debug!(files = files.len(), root = %corpus.root.display(), "scanned corpus");
    let analyzed: Vec<AnalyzedDoc> = files
        .par_iter()
        .filter_map(|file| match read(file) {
            Ok(bytes) => Some(analyze(&SourceDoc::new(relative_path(&corpus.root, file), bytes))),
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "skipping unreadable document");
                None
            }
        })
        .collect();
    assemble(analyzed)
}

fn assemble(analyzed: Vec<AnalyzedDoc>) -> BuiltIndex {
    let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
    let mut docs = Vec::with_capacity(analyzed.len());
    let mut total_len: u64 = 0;

    for (idx, doc) in analyzed.into_iter().enumerate() {
        let id = idx as DocId;
        total_len += doc.length as u64;
        for (term, tf) in doc.term_freqs {
            postings.entry(term).or_default().push(Posting { doc_id: id, tf });
        }
        docs.push(DocEntry { id, path: doc.path, title: doc.title, length: doc.length, snippet: doc.snippet });
    }

    let num_docs = docs.len() as u32;
    let avg_len = if num_docs == 0 { 0.0 } else { total_len as f64 / num_docs as f64 };

    let mut shards: BTreeMap<BucketKey, Shard> = BTreeMap::new();
    for (term, plist) in postings {
        shards.entry(shard_bucket(&term)).or_default().insert(term, plist);
    }

    let mut manifest = Manifest::empty();
    manifest.num_docs = num_docs;
    manifest.avg_len = avg_len;
    manifest.shards = shards.iter().map(|(k, s)| (k.clone(), s.len() as u32)).collect();

    tracing::info!(num_docs, num_terms = manifest.total_terms(), num_shards = shards.len(), "assembled index");
    BuiltIndex { manifest, docs, shards }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn page(title: &str, body: &str) -> Vec<u8> {
        format!("<html><head><title>{title}</title></head><body>{body}</body></html>").into_bytes()
    }

    #[test]
    fn single_document() {
        let idx = build_index(vec![SourceDoc::new("a/one.html", page("Example", "example example"))]);
        assert_eq!(idx.manifest.num_docs, 1);
        // Title is tokenized once on its own and once as part of the page text.
        assert_eq!(idx.docs[0].length, 4);
        assert_eq!(idx.manifest.avg_len, 4.0);
        assert_eq!(idx.docs[0].snippet, "Example example example");
        let shard = &idx.shards[&shard_bucket("example")];
        assert_eq!(shard["example"], vec![Posting { doc_id: 0, tf: 4 }]);
    }

    #[test]
    fn manifest_counts_match_terms() {
        let idx = build_index(vec![
            SourceDoc::new("a.html", page("Alpha", "rust search engine 中文分词")),
            SourceDoc::new("b.html", page("Beta", "rust index shards bm25")),
            SourceDoc::new("c.html", b"no title here at all".to_vec()),
        ]);
        let distinct: HashSet<&String> = idx.shards.values().flat_map(|s| s.keys()).collect();
        assert_eq!(idx.manifest.total_terms() as usize, distinct.len());
        assert_eq!(idx.num_terms(), distinct.len());
        for (bucket, shard) in &idx.shards {
            assert_eq!(idx.manifest.shards[bucket] as usize, shard.len());
            for (term, plist) in shard {
                assert_eq!(&shard_bucket(term), bucket);
                assert!(plist.iter().all(|p| p.tf >= 1 && p.doc_id < idx.manifest.num_docs));
                assert!(plist.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
            }
        }
        assert_eq!(idx.docs[2].title, "c.html");
        assert_eq!(idx.shards[&shard_bucket("rust")]["rust"].len(), 2);
    }

    #[test]
    fn length_counts_only_indexed_window() {
        let body = "word ".repeat(1000);
        let idx = build_index(vec![SourceDoc::new("long.html", page("T1", &body))]);
        // Text window is "T1 " + 239 full "word " + "wo": t1, t1, 239 x word, wo.
        assert_eq!(idx.docs[0].length, 242);
        assert_eq!(idx.docs[0].snippet.chars().count(), 240);
    }

    #[test]
    fn unreadable_document_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.html", "b.html", "c.html"] {
            fs::write(dir.path().join(name), page(name, "shared words")).unwrap();
        }
        let idx = build_from_corpus_with(&CorpusConfig::new(dir.path()), |path| {
            if path.ends_with("b.html") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                fs::read(path)
            }
        });
        assert_eq!(idx.manifest.num_docs, 2);
        let docs: Vec<(DocId, &str)> = idx.docs.iter().map(|d| (d.id, d.path.as_str())).collect();
        assert_eq!(docs, vec![(0, "a.html"), (1, "c.html")]);
        let ids: Vec<DocId> = idx.shards[&shard_bucket("shared")]["shared"].iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn empty_input_is_empty_index() {
        let idx = build_index(Vec::new());
        assert_eq!(idx, BuiltIndex::empty());
        assert_eq!(idx.manifest.avg_len, 0.0);
    }
}
