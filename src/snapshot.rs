//! Immutable store + index pairs, and the handle that swaps them.
//!
//! A [`Snapshot`] is never mutated once built. Readers clone the current
//! `Arc<Snapshot>` and keep using it for the whole query, so a reload that
//! publishes a new snapshot mid-query does not affect them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::info;

use crate::config::EngineConfig;
use crate::corpus::CorpusSource;
use crate::error::{InvariantViolation, LoadError, QueryInputError};
use crate::format::{format_results, DisplayResult};
use crate::index::InvertedIndex;
use crate::search::{search_detailed, SearchOptions, SearchOutcome};
use crate::store::DocumentStore;
use crate::tokenizer::Tokenizer;

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug)]
pub struct Snapshot {
    store: DocumentStore,
    index: InvertedIndex,
    config: EngineConfig,
    tokenizer: Tokenizer,
    /// Unix seconds when the index was built (not when it was loaded).
    built_at: u64,
    /// Corpus fingerprint observed before loading, if the source has one.
    fingerprint: Option<u64>,
    generation: u64,
}

/// Summary numbers for `info` output.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub documents: usize,
    pub terms: usize,
    pub tokens: u64,
    pub avg_doc_len: f64,
    pub built_at: u64,
    pub generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl Snapshot {
    /// Index `store` under `config`.
    pub fn build(store: DocumentStore, config: EngineConfig) -> Self {
        let tokenizer = Tokenizer::new(config.tokenizer.clone());
        let index = InvertedIndex::build(&store, &tokenizer);
        Self { store, index, config, tokenizer, built_at: unix_now(), fingerprint: None, generation: 0 }
    }

    /// Load the corpus from `source` and index it.
    pub fn from_source(source: &dyn CorpusSource, config: EngineConfig) -> Result<Self, LoadError> {
        let start = Instant::now();
        // Taken first so edits during the load make the cache stale, not silently current.
        let fingerprint = source.fingerprint()?;
        let store = DocumentStore::load(source)?;
        let mut snapshot = Self::build(store, config);
        snapshot.fingerprint = fingerprint;
        info!(
            source = %source.describe(),
            documents = snapshot.store.len(),
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Snapshot built"
        );
        Ok(snapshot)
    }

    /// Reassemble a snapshot from persisted parts, re-checking index invariants.
    pub fn from_parts(
        store: DocumentStore,
        index: InvertedIndex,
        config: EngineConfig,
        built_at: u64,
        fingerprint: Option<u64>,
    ) -> Result<Self, InvariantViolation> {
        index.verify()?;
        if index.doc_count as usize != store.len() {
            return Err(InvariantViolation::LengthTableMismatch {
                expected: store.len(),
                actual: index.doc_count as usize,
            });
        }
        let tokenizer = Tokenizer::new(config.tokenizer.clone());
        Ok(Self { store, index, config, tokenizer, built_at, fingerprint, generation: 0 })
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn built_at(&self) -> u64 {
        self.built_at
    }

    pub fn fingerprint(&self) -> Option<u64> {
        self.fingerprint
    }

    /// 0 until published through a [`SnapshotHandle`].
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Run a query and return ranked, formatted results.
    pub fn search(&self, text: &str, options: &SearchOptions) -> Result<Vec<DisplayResult>, QueryInputError> {
        let outcome = self.search_detailed(text, options)?;
        Ok(self.format(&outcome))
    }

    pub fn search_detailed(&self, text: &str, options: &SearchOptions) -> Result<SearchOutcome, QueryInputError> {
        search_detailed(self, text, options)
    }

    pub fn format(&self, outcome: &SearchOutcome) -> Vec<DisplayResult> {
        format_results(&outcome.results, &self.store, &self.tokenizer, self.config.snippet_chars)
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            documents: self.store.len(),
            terms: self.index.term_count(),
            tokens: self.index.total_tokens,
            avg_doc_len: self.index.avg_doc_len,
            built_at: self.built_at,
            generation: self.generation,
            fingerprint: self.fingerprint.map(|f| format!("{:016x}", f)),
        }
    }
}

// ─── Handle ─────────────────────────────────────────────────────────

/// Shared pointer to the live snapshot.
///
/// `current()` never blocks on a rebuild: builds happen outside the lock and
/// only the pointer swap takes the write lock.
#[derive(Debug)]
pub struct SnapshotHandle {
    current: RwLock<Arc<Snapshot>>,
    generation: AtomicU64,
}

impl SnapshotHandle {
    /// Wrap the first snapshot as generation 1.
    pub fn new(mut snapshot: Snapshot) -> Self {
        snapshot.generation = 1;
        Self { current: RwLock::new(Arc::new(snapshot)), generation: AtomicU64::new(1) }
    }

    pub fn current(&self) -> Arc<Snapshot> {
        // A panicking writer can only have poisoned the lock between swaps;
        // the Arc inside is always a complete snapshot.
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the live snapshot. Returns the previous one; it is dropped
    /// once the last in-flight reader releases it.
    pub fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        snapshot.generation = generation;
        let previous = std::mem::replace(&mut *guard, Arc::new(snapshot));
        drop(guard);
        info!(generation, documents = previous.store.len(), "Snapshot published");
        previous
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
