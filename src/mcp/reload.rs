//! Rebuild-and-publish, shared by `handbook_reload` and the file watcher.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use handbook::persist::save_snapshot;
use handbook::{CorpusSource, EngineConfig, LoadError, Snapshot, SnapshotHandle};

#[derive(Error, Debug)]
pub enum ReloadError {
    #[error("A reload is already in progress. Please wait for it to finish.")]
    InProgress,

    #[error("Reload failed, keeping the previous snapshot: {0}")]
    Load(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReloadOutcome {
    pub generation: u64,
    pub documents: usize,
    pub terms: usize,
    pub elapsed_ms: f64,
}

/// Everything needed to rebuild the live snapshot from its source.
pub struct Reloader {
    pub snapshots: Arc<SnapshotHandle>,
    pub source: Arc<dyn CorpusSource>,
    /// Cache key for the snapshot file (the corpus directory as given).
    pub root: String,
    pub config: EngineConfig,
    pub index_base: PathBuf,
    /// Write rebuilt snapshots to the cache.
    pub persist: bool,
    in_progress: AtomicBool,
}

/// Clears the in-progress flag even if the build panics.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Reloader {
    pub fn new(
        snapshots: Arc<SnapshotHandle>,
        source: Arc<dyn CorpusSource>,
        root: String,
        config: EngineConfig,
        index_base: PathBuf,
        persist: bool,
    ) -> Self {
        Self { snapshots, source, root, config, index_base, persist, in_progress: AtomicBool::new(false) }
    }

    pub fn is_reloading(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Build a fresh snapshot from the source and publish it.
    ///
    /// Concurrent calls are rejected rather than queued. On failure the
    /// previous snapshot stays live.
    pub fn reload(&self) -> Result<ReloadOutcome, ReloadError> {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            return Err(ReloadError::InProgress);
        }
        let _guard = InProgressGuard(&self.in_progress);

        let start = Instant::now();
        info!(source = %self.source.describe(), "Rebuilding snapshot");
        let snapshot = match Snapshot::from_source(self.source.as_ref(), self.config.clone()) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Reload failed, previous snapshot stays live");
                return Err(e.into());
            }
        };

        if self.persist
            && let Err(e) = save_snapshot(&snapshot, &self.root, &self.index_base)
        {
            warn!(error = %e, "Failed to save rebuilt snapshot");
        }

        let documents = snapshot.store().len();
        let terms = snapshot.index().term_count();
        self.snapshots.publish(snapshot);
        Ok(ReloadOutcome {
            generation: self.snapshots.generation(),
            documents,
            terms,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }
}
