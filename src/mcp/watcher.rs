//! Debounced file watcher that rebuilds the snapshot when articles change.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use handbook::clean_path;

use crate::mcp::reload::{ReloadError, Reloader};

/// A busy batch is rebuilt after this many debounce windows even if events keep arriving.
const MAX_BATCH_AGE_WINDOWS: u32 = 10;

/// Article paths touched since the last rebuild.
#[derive(Debug, Default)]
pub(crate) struct ChangeBatch {
    paths: BTreeSet<PathBuf>,
    first_change: Option<Instant>,
}

impl ChangeBatch {
    /// Record the article paths of one notify event. Returns true when
    /// anything relevant was recorded.
    pub(crate) fn record(&mut self, event: &Event, extensions: &[String]) -> bool {
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)) {
            return false;
        }
        let mut recorded = false;
        for path in event.paths.iter().filter(|p| matches_extensions(p, extensions)) {
            recorded |= self.paths.insert(path.clone());
        }
        if recorded && self.first_change.is_none() {
            self.first_change = Some(Instant::now());
        }
        recorded
    }

    /// True once the oldest pending change is at least `max_age` old.
    pub(crate) fn is_overdue(&self, now: Instant, max_age: Duration) -> bool {
        self.first_change.is_some_and(|first| now.saturating_duration_since(first) >= max_age)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.paths.len()
    }

    pub(crate) fn clear(&mut self) {
        self.paths.clear();
        self.first_change = None;
    }
}

/// Start the watcher thread for `dir`. Changes to matching articles are
/// collected until `debounce_ms` pass without a new event, then the whole
/// snapshot is rebuilt through `reloader`. A steady stream of events still
/// triggers a rebuild once the batch is `MAX_BATCH_AGE_WINDOWS` windows old.
pub fn start_watcher(
    reloader: Arc<Reloader>,
    dir: PathBuf,
    extensions: Vec<String>,
    debounce_ms: u64,
) -> notify::Result<()> {
    let (tx, rx) = std::sync::mpsc::channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(&dir, RecursiveMode::Recursive)?;

    let dir_str = clean_path(&dir.to_string_lossy());
    info!(dir = %dir_str, debounce_ms, "File watcher started");

    std::thread::spawn(move || {
        let _watcher = watcher; // keep the watcher alive for the thread's lifetime
        let mut batch = ChangeBatch::default();

        let debounce = Duration::from_millis(debounce_ms);
        let max_age = debounce.saturating_mul(MAX_BATCH_AGE_WINDOWS);

        loop {
            match rx.recv_timeout(debounce) {
                Ok(Ok(event)) => {
                    if batch.record(&event, &extensions) {
                        debug!(paths = ?event.paths, kind = ?event.kind, "Article change");
                    }
                    if batch.is_overdue(Instant::now(), max_age) {
                        rebuild(&reloader, &mut batch);
                    }
                }
                Ok(Err(e)) => warn!(error = %e, "File watcher error"),
                Err(RecvTimeoutError::Timeout) => {
                    if !batch.is_empty() {
                        rebuild(&reloader, &mut batch);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!("File watcher channel closed, stopping");
                    break;
                }
            }
        }
    });

    Ok(())
}

fn rebuild(reloader: &Reloader, batch: &mut ChangeBatch) {
    info!(changes = batch.len(), "Articles changed, rebuilding snapshot");
    match reloader.reload() {
        Ok(outcome) => {
            info!(
                generation = outcome.generation,
                documents = outcome.documents,
                elapsed_ms = outcome.elapsed_ms,
                "Snapshot rebuilt after file changes"
            );
            batch.clear();
        }
        // Another reload is running; keep the batch and retry later.
        Err(ReloadError::InProgress) => debug!("Reload already running, deferring"),
        Err(e) => {
            warn!(error = %e, "Rebuild after file changes failed");
            batch.clear();
        }
    }
}

fn matches_extensions(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
