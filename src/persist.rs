//! Snapshot cache: LZ4-compressed bincode files under the local data dir.
//!
//! A cache file is only trusted when its format version, tokenizer settings
//! and corpus fingerprint all match, and its index passes `verify()`.
//! Anything else is a rebuild, never an error surfaced to queries.

use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::corpus::CorpusSource;
use crate::error::{LoadError, PersistError};
use crate::index::InvertedIndex;
use crate::snapshot::Snapshot;
use crate::store::{Document, DocumentStore};
use crate::{clean_path, corpus_prefix, stable_hash};

/// Magic bytes identifying compressed snapshot files.
pub const LZ4_MAGIC: &[u8; 4] = b"LZ4S";

/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 2;

pub const SNAPSHOT_EXTENSION: &str = "handbook-index";

/// On-disk form of a [`Snapshot`]. `root` must stay the first field:
/// [`read_root_from_snapshot_file`] reads it without decoding the rest.
#[derive(Serialize, Deserialize, Debug)]
pub struct PersistedSnapshot {
    pub root: String,
    pub format_version: u32,
    pub created_at: u64,
    pub fingerprint: Option<u64>,
    pub config: EngineConfig,
    pub documents: Vec<Document>,
    pub index: InvertedIndex,
}

impl PersistedSnapshot {
    pub fn from_snapshot(snapshot: &Snapshot, root: &str) -> Self {
        Self {
            root: root.to_string(),
            format_version: FORMAT_VERSION,
            created_at: snapshot.built_at(),
            fingerprint: snapshot.fingerprint(),
            config: snapshot.config().clone(),
            documents: snapshot.store().documents().to_vec(),
            index: snapshot.index().clone(),
        }
    }

    /// Validate against the live corpus and settings, then rebuild the snapshot.
    ///
    /// `config` is the caller's runtime configuration: scoring and snippet
    /// settings come from it, so only tokenizer changes invalidate a cache.
    pub fn into_snapshot(self, config: &EngineConfig, current_fingerprint: Option<u64>) -> Result<Snapshot, PersistError> {
        if self.format_version != FORMAT_VERSION {
            return Err(PersistError::VersionMismatch { found: self.format_version, expected: FORMAT_VERSION });
        }
        if !config.index_compatible(&self.config) {
            return Err(PersistError::Stale { reason: "tokenizer settings changed".to_string() });
        }
        match (self.fingerprint, current_fingerprint) {
            (Some(saved), Some(now)) if saved == now => {}
            (Some(_), Some(_)) => return Err(PersistError::Stale { reason: "corpus changed".to_string() }),
            _ => return Err(PersistError::Stale { reason: "corpus has no fingerprint".to_string() }),
        }

        let store = DocumentStore::from_documents(self.documents).map_err(|e| PersistError::Format {
            path: self.root.clone(),
            message: e.to_string(),
        })?;
        Ok(Snapshot::from_parts(store, self.index, config.clone(), self.created_at, self.fingerprint)?)
    }
}

// ─── LZ4 compression helpers ────────────────────────────────────────

/// Write magic bytes then LZ4-framed bincode.
pub fn save_compressed<T: Serialize>(path: &Path, data: &T) -> Result<(), PersistError> {
    let file = fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(LZ4_MAGIC)?;
    let mut encoder = lz4_flex::frame::FrameEncoder::new(writer);
    bincode::serialize_into(&mut encoder, data)?;
    let mut writer = encoder.finish().map_err(std::io::Error::other)?;
    writer.flush()?;
    Ok(())
}

pub fn load_compressed<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let path_str = path.display().to_string();
    let file = fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PersistError::Missing { path: path_str.clone() },
        _ => PersistError::Format { path: path_str.clone(), message: format!("cannot open file: {}", e) },
    })?;
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(|e| PersistError::Format {
        path: path_str.clone(),
        message: format!("read error (magic bytes): {}", e),
    })?;
    if &magic != LZ4_MAGIC {
        return Err(PersistError::Format { path: path_str, message: "not a snapshot file".to_string() });
    }

    let decoder = lz4_flex::frame::FrameDecoder::new(reader);
    bincode::deserialize_from(decoder).map_err(|e| PersistError::Format {
        path: path_str,
        message: format!("deserialization failed: {}", e),
    })
}

// ─── Snapshot files ─────────────────────────────────────────────────

/// Default cache directory: `<local data dir>/handbook-search`.
/// Tests pass their own directory instead.
pub fn index_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("handbook-search")
}

fn canonical_root(root: &str) -> String {
    fs::canonicalize(root)
        .map(|p| clean_path(&p.to_string_lossy()))
        .unwrap_or_else(|_| clean_path(root))
}

/// `<prefix>_<hash>.handbook-index` for a corpus root.
pub fn snapshot_path_for(root: &str, index_base: &Path) -> PathBuf {
    let canonical = canonical_root(root);
    let hash = stable_hash(&[canonical.as_bytes()]);
    let prefix = corpus_prefix(Path::new(&canonical));
    index_base.join(format!("{}_{:08x}.{}", prefix, hash as u32, SNAPSHOT_EXTENSION))
}

/// Persist `snapshot` for `root`. Writes a temp file and renames it into place
/// so a reader never sees a half-written cache.
pub fn save_snapshot(snapshot: &Snapshot, root: &str, index_base: &Path) -> Result<PathBuf, PersistError> {
    let start = Instant::now();
    fs::create_dir_all(index_base)?;
    let path = snapshot_path_for(root, index_base);
    let tmp = path.with_extension("tmp");

    let persisted = PersistedSnapshot::from_snapshot(snapshot, &canonical_root(root));
    save_compressed(&tmp, &persisted)?;
    fs::rename(&tmp, &path)?;

    let size = fs::metadata(&path)?.len();
    info!(
        path = %path.display(),
        size_mb = format_args!("{:.2}", size as f64 / 1_048_576.0),
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Snapshot saved"
    );
    Ok(path)
}

/// Decode the cache file for `root` without validating it.
pub fn load_persisted(root: &str, index_base: &Path) -> Result<PersistedSnapshot, PersistError> {
    load_compressed(&snapshot_path_for(root, index_base))
}

/// Load a validated snapshot for `root`, or explain why the cache is unusable.
pub fn load_snapshot(
    root: &str,
    index_base: &Path,
    config: &EngineConfig,
    current_fingerprint: Option<u64>,
) -> Result<Snapshot, PersistError> {
    let start = Instant::now();
    let snapshot = load_persisted(root, index_base)?.into_snapshot(config, current_fingerprint)?;
    info!(
        documents = snapshot.store().len(),
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Snapshot loaded from cache"
    );
    Ok(snapshot)
}

/// Use the cache when valid, otherwise build from `source` and refresh the cache.
///
/// Cache problems are logged and never fail the call; only corpus load
/// errors do. Returns the snapshot and whether it came from the cache.
pub fn load_or_build(
    source: &dyn CorpusSource,
    root: &str,
    config: &EngineConfig,
    index_base: &Path,
    use_cache: bool,
) -> Result<(Snapshot, bool), LoadError> {
    if use_cache {
        let fingerprint = source.fingerprint()?;
        match load_snapshot(root, index_base, config, fingerprint) {
            Ok(snapshot) => return Ok((snapshot, true)),
            Err(PersistError::Missing { .. }) => {
                debug!(root, "No cached snapshot");
            }
            Err(e) => warn!(root, error = %e, "Cached snapshot unusable, rebuilding"),
        }
    }

    let snapshot = Snapshot::from_source(source, config.clone())?;
    if use_cache && let Err(e) = save_snapshot(&snapshot, root, index_base) {
        warn!(root, error = %e, "Failed to save snapshot");
    }
    Ok((snapshot, false))
}

/// Read just the `root` field of a snapshot file.
/// Bincode stores a `String` as a u64 length followed by its bytes.
fn read_root_from_snapshot_file(path: &Path) -> Option<String> {
    let mut file = fs::File::open(path).ok()?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).ok()?;
    if &magic != LZ4_MAGIC {
        return None;
    }
    let mut reader = lz4_flex::frame::FrameDecoder::new(BufReader::new(file));

    let mut len_buf = [0u8; 8];
    reader.read_exact(&mut len_buf).ok()?;
    let len = u64::from_le_bytes(len_buf) as usize;
    if len > 4096 {
        return None;
    }
    let mut str_buf = vec![0u8; len];
    reader.read_exact(&mut str_buf).ok()?;
    String::from_utf8(str_buf).ok()
}

/// One cache file on disk.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFileInfo {
    pub path: String,
    pub root: Option<String>,
    pub size_bytes: u64,
}

fn snapshot_files(index_base: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(index_base) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION))
        .collect();
    files.sort();
    files
}

pub fn list_snapshots(index_base: &Path) -> Vec<SnapshotFileInfo> {
    snapshot_files(index_base)
        .into_iter()
        .map(|path| SnapshotFileInfo {
            root: read_root_from_snapshot_file(&path),
            size_bytes: fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
            path: path.display().to_string(),
        })
        .collect()
}

/// Remove cache files whose corpus root no longer exists. Returns the count removed.
pub fn cleanup_orphaned_snapshots(index_base: &Path) -> usize {
    let mut removed = 0;
    for path in snapshot_files(index_base) {
        if let Some(root) = read_root_from_snapshot_file(&path)
            && !Path::new(&root).exists()
            && fs::remove_file(&path).is_ok()
        {
            removed += 1;
            info!(path = %path.display(), root = %root, "Removed orphaned snapshot");
        }
    }
    removed
}
