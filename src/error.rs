//! Error taxonomy for the handbook engine.
//!
//! Load errors are fatal to startup, query input errors are returned to the
//! caller and turned into "no results" by the serving layer, invariant
//! violations mean the index itself is corrupt.

use thiserror::Error;

/// Failure to load the corpus into a [`DocumentStore`](crate::DocumentStore).
#[derive(Error, Debug)]
pub enum LoadError {
    /// The corpus source produced zero documents
    #[error("Corpus is empty: no documents found in {source_desc}")]
    Empty { source_desc: String },

    /// An article could not be split into title and body
    #[error("Malformed article '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// Two articles resolved to the same id
    #[error("Duplicate document id '{id}'")]
    DuplicateId { id: String },

    /// Corpus directory does not exist
    #[error("Corpus directory does not exist: {path}")]
    NotFound { path: String },

    /// I/O error while reading the corpus
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid query input. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryInputError {
    /// `limit` must be at least 1
    #[error("Invalid limit {limit}: must be a positive integer")]
    InvalidLimit { limit: i64 },

    /// A `"` opened a phrase that was never closed
    #[error("Unbalanced quote in query '{query}': phrases must be closed with '\"'")]
    UnbalancedQuote { query: String },
}

/// Index corruption detected by [`InvertedIndex::verify`](crate::InvertedIndex::verify).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Term '{term}' has no postings")]
    EmptyPostings { term: String },

    #[error("Postings for '{term}' are not strictly ascending at doc {doc_id}")]
    UnorderedPostings { term: String, doc_id: u32 },

    #[error("Posting for '{term}' refers to unknown doc {doc_id} (doc count {doc_count})")]
    DanglingDocId { term: String, doc_id: u32, doc_count: u32 },

    #[error("Positions for '{term}' in doc {doc_id} are inconsistent")]
    BadPositions { term: String, doc_id: u32 },

    #[error("Document length table has {actual} entries, expected {expected}")]
    LengthTableMismatch { expected: usize, actual: usize },
}

/// Snapshot cache save/load failure.
#[derive(Error, Debug)]
pub enum PersistError {
    /// I/O error (file read/write, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error (bincode)
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// No snapshot file at the expected path
    #[error("No snapshot at {path}")]
    Missing { path: String },

    /// File exists but could not be decoded
    #[error("Failed to load snapshot from {path}: {message}")]
    Format { path: String, message: String },

    /// Cache was written by an incompatible build
    #[error("Snapshot format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    /// Cache decoded fine but no longer matches the corpus or tokenizer settings
    #[error("Snapshot is stale: {reason}")]
    Stale { reason: String },

    /// Cache decoded fine but its index is structurally broken
    #[error("Snapshot failed verification: {0}")]
    Corrupt(#[from] InvariantViolation),
}
