use crate::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DocId = u32;

/// Bucket key of a shard: two lowercase hex digits, `00`..=`ff`.
pub type BucketKey = String;

/// Term -> postings for every term hashed into one bucket.
pub type Shard = BTreeMap<String, Vec<Posting>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocEntry {
    pub id: DocId,
    /// Corpus-relative, '/'-separated.
    pub path: String,
    pub title: String,
    /// Number of tokens in the indexed text window.
    #[serde(rename = "len")]
    pub length: u32,
    pub snippet: String,
}

/// One (document, term frequency) pair. Stored on disk as `[docId, tf]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(DocId, u32)", into = "(DocId, u32)")]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

impl From<(DocId, u32)> for Posting {
    fn from((doc_id, tf): (DocId, u32)) -> Self {
        Self { doc_id, tf }
    }
}

impl From<Posting> for (DocId, u32) {
    fn from(p: Posting) -> Self {
        (p.doc_id, p.tf)
    }
}

fn legacy_version() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "N")]
    pub num_docs: u32,
    #[serde(rename = "avgLen")]
    pub avg_len: f64,
    /// Bucket key -> number of distinct terms in that shard.
    pub shards: BTreeMap<BucketKey, u32>,
    /// Manifests written before versioning carry no field and read as version 1.
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Manifest {
    pub fn empty() -> Self {
        Self { num_docs: 0, avg_len: 0.0, shards: BTreeMap::new(), version: SCHEMA_VERSION, created_at: None }
    }

    pub fn total_terms(&self) -> u64 {
        self.shards.values().map(|&n| n as u64).sum()
    }
}

const FNV_OFFSET: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-16 code units of `term`.
pub fn fnv1a32(term: &str) -> u32 {
    term.encode_utf16().fold(FNV_OFFSET, |h, unit| (h ^ unit as u32).wrapping_mul(FNV_PRIME))
}

/// Shard bucket of a term: the top byte of its FNV-1a hash as two hex digits.
pub fn shard_bucket(term: &str) -> BucketKey {
    format!("{:02x}", (fnv1a32(term) >> 24) & 0xff)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv_matches_reference_vectors() {
        assert_eq!(fnv1a32(""), 0x811c_9dc5);
        assert_eq!(fnv1a32("a"), 0xe40c_292c);
        assert_eq!(fnv1a32("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn bucket_is_two_lowercase_hex_digits() {
        for term in ["a", "example", "中文", "rust", "0123456789", "\u{20000}\u{20001}"] {
            let b = shard_bucket(term);
            assert_eq!(b.len(), 2);
            assert!(b.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)), "{b}");
            assert_eq!(b, shard_bucket(term));
        }
        assert_eq!(shard_bucket("foobar"), "bf");
    }

    #[test]
    fn posting_serializes_as_pair() {
        let json = serde_json::to_string(&Posting { doc_id: 3, tf: 2 }).unwrap();
        assert_eq!(json, "[3,2]");
        let back: Posting = serde_json::from_str("[7,1]").unwrap();
        assert_eq!(back, Posting { doc_id: 7, tf: 1 });
    }

    #[test]
    fn manifest_without_version_reads_as_legacy() {
        let m: Manifest = serde_json::from_str(r#"{"N":0,"avgLen":0,"shards":{}}"#).unwrap();
        assert_eq!(m.version, 1);
        assert_eq!(m.created_at, None);
        let json = serde_json::to_value(Manifest::empty()).unwrap();
        assert_eq!(json["N"], 0);
        assert!(json.get("createdAt").is_none());
    }
}
