//! # handbook: lexical search over font-editor handbook articles
//!
//! Markdown articles are loaded into a [`DocumentStore`], tokenized, and
//! indexed into an [`InvertedIndex`]. Queries are ranked with BM25, preferring
//! documents that match more of the query, and returned with snippets.
//! The pair (store, index) lives in an immutable [`Snapshot`]; reloads build a
//! new one and swap it in through a [`SnapshotHandle`].
//!
//! ## Library usage
//!
//! The crate ships as a CLI / MCP server, but the engine is exposed as a
//! library for embedding, benchmarking and integration testing.
//!
//! ```
//! use handbook::{EngineConfig, MemoryCorpus, SearchOptions, Snapshot};
//!
//! let corpus = MemoryCorpus::default()
//!     .with("anchors", "Anchors", "Mark to base positioning uses anchors.")
//!     .with("kerning", "Kerning", "Kerning groups reduce the number of pairs.");
//! let snapshot = Snapshot::from_source(&corpus, EngineConfig::default()).unwrap();
//! let hits = snapshot.search("anchors", &SearchOptions::default()).unwrap();
//! assert_eq!(hits[0].id, "anchors");
//! ```

use std::path::Path;

pub mod config;
pub mod corpus;
pub mod error;
pub mod format;
pub mod index;
pub mod markdown;
pub mod persist;
pub mod query;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tokenizer;

pub use config::{EngineConfig, ScoringConfig, TokenizerConfig};
pub use corpus::{CorpusSource, DirectoryCorpus, MemoryCorpus};
pub use error::{InvariantViolation, LoadError, PersistError, QueryInputError};
pub use format::{extract_snippet, format_results, DisplayResult};
pub use index::{InvertedIndex, Posting};
pub use query::{parse_query, Clause, MatchMode, Query};
pub use search::{search, search_detailed, ScoredResult, SearchOptions, SearchOutcome};
pub use snapshot::{Snapshot, SnapshotHandle, SnapshotStats};
pub use store::{DocId, Document, DocumentStore};
pub use tokenizer::{tokenize, Tokenizer};

// ─── Stable hashing ─────────────────────────────────────────────────

/// Stable FNV-1a hash (deterministic across Rust versions, unlike `DefaultHasher`).
///
/// Parts are fed in sequence, so callers can combine a root path with a
/// file listing and so on.
#[must_use]
pub fn stable_hash(parts: &[&[u8]]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
    let mut hash = FNV_OFFSET;
    for part in parts {
        for &byte in *part {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

// ─── Paths and files ────────────────────────────────────────────────

/// Strip the `\\?\` extended-length path prefix that Windows canonicalize adds.
#[must_use]
pub fn clean_path(p: &str) -> String {
    p.strip_prefix(r"\\?\").unwrap_or(p).to_string()
}

/// Readable file-name prefix for a corpus root: its last path component,
/// restricted to `[a-z0-9_-]`, or `root` when nothing usable is left.
#[must_use]
pub fn corpus_prefix(root: &Path) -> String {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(32)
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() { "root".to_string() } else { trimmed.to_string() }
}

/// Read a file as a String, converting invalid UTF-8 lossily.
/// Returns `(content, was_lossy)`; handbook exports occasionally carry
/// Windows-1252 smart quotes.
pub fn read_file_lossy(path: &Path) -> std::io::Result<(String, bool)> {
    let raw = std::fs::read(path)?;
    match String::from_utf8(raw) {
        Ok(s) => Ok((s, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}
