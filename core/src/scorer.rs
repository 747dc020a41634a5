//! BM25 Okapi scoring shared by every search path over the sharded index.

use crate::config::{BM25_B, BM25_K1};

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`
pub fn idf(num_docs: u32, df: usize) -> f64 {
    let n = num_docs as f64;
    let df = df as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Contribution of one term to one document.
///
/// `doc_len` of zero means "unknown" and is replaced by `avg_len`; an average
/// length of zero is treated as one.
pub fn term_score(idf: f64, tf: u32, doc_len: u32, avg_len: f64) -> f64 {
    let tf = tf as f64;
    let len = if doc_len == 0 { avg_len } else { doc_len as f64 };
    let avg = if avg_len == 0.0 { 1.0 } else { avg_len };
    let denom = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * (len / avg));
    let denom = if denom == 0.0 { 1.0 } else { denom };
    idf * (tf * (BM25_K1 + 1.0)) / denom
}
