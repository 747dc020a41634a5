pub mod builder;
pub mod config;
pub mod extract;
pub mod fallback;
pub mod index;
pub mod persist;
pub mod provider;
pub mod query;
pub mod scan;
pub mod scorer;
pub mod tokenizer;

pub use builder::{build_from_corpus, build_from_corpus_with, build_index, BuiltIndex, SourceDoc};
pub use config::{CorpusConfig, IndexLayout, SearchConfig, SearchMode};
pub use index::{shard_bucket, DocEntry, DocId, Manifest, Posting, Shard};
pub use provider::{create_provider, SearchHit, SearchProvider, SearchResults, SearchSource};
