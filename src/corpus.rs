//! Corpus sources: where handbook articles come from.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Instant, UNIX_EPOCH};

use ignore::WalkBuilder;
use tracing::{debug, info};

use crate::error::LoadError;
use crate::markdown::parse_article;
use crate::store::Document;
use crate::{clean_path, read_file_lossy, stable_hash};

/// Default article extensions for directory corpora.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Anything that can produce the full set of documents for one snapshot.
pub trait CorpusSource: Send + Sync {
    /// Read every article. Order does not matter; the store sorts by id.
    fn load_documents(&self) -> Result<Vec<Document>, LoadError>;

    /// Short human-readable description for logs and errors.
    fn describe(&self) -> String;

    /// Cheap change detector used to validate cached snapshots.
    /// `None` means "always rebuild".
    fn fingerprint(&self) -> Result<Option<u64>, LoadError> {
        Ok(None)
    }
}

// ─── Directory corpus ───────────────────────────────────────────────

/// Markdown files under a directory (the handbook cache).
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
    extensions: Vec<String>,
    hidden: bool,
    no_ignore: bool,
}

impl DirectoryCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            hidden: false,
            no_ignore: false,
        }
    }

    /// Replace the accepted extensions (case-insensitive, without dot).
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    /// Also read hidden files and files excluded by `.gitignore`.
    pub fn with_walk_options(mut self, hidden: bool, no_ignore: bool) -> Self {
        self.hidden = hidden;
        self.no_ignore = no_ignore;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// All matching article paths, sorted.
    fn article_paths(&self) -> Result<Vec<PathBuf>, LoadError> {
        if !self.root.is_dir() {
            return Err(LoadError::NotFound { path: self.root.display().to_string() });
        }

        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(!self.hidden);
        builder.git_ignore(!self.no_ignore);
        builder.git_global(!self.no_ignore);
        builder.git_exclude(!self.no_ignore);

        let paths: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
        builder.build_parallel().run(|| {
            let paths = &paths;
            Box::new(move |result| {
                if let Ok(entry) = result
                    && entry.file_type().is_some_and(|ft| ft.is_file())
                    && self.matches_extension(entry.path())
                {
                    paths.lock().unwrap_or_else(|e| e.into_inner()).push(entry.into_path());
                }
                ignore::WalkState::Continue
            })
        });

        let mut paths = paths.into_inner().unwrap_or_else(|e| e.into_inner());
        paths.sort();
        Ok(paths)
    }

    /// Path relative to the corpus root with `/` separators.
    fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        clean_path(&rel.to_string_lossy()).replace('\\', "/")
    }
}

/// Stable id for an article: relative path without extension.
#[must_use]
pub fn document_id_for(relative_path: &str) -> String {
    let name_start = relative_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match relative_path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => relative_path[..name_start + dot].to_string(),
        _ => relative_path.to_string(),
    }
}

impl CorpusSource for DirectoryCorpus {
    fn load_documents(&self) -> Result<Vec<Document>, LoadError> {
        let start = Instant::now();
        let paths = self.article_paths()?;

        let mut documents = Vec::with_capacity(paths.len());
        let mut lossy = 0usize;
        for path in &paths {
            let rel = self.relative(path);
            let (text, was_lossy) = read_file_lossy(path)?;
            if was_lossy {
                lossy += 1;
                debug!(path = %rel, "Article is not valid UTF-8, read lossily");
            }
            let parsed = parse_article(&rel, &text)?;
            documents.push(Document {
                id: document_id_for(&rel),
                title: parsed.title,
                body: parsed.body,
                source_path: rel,
            });
        }

        info!(
            root = %self.root.display(),
            documents = documents.len(),
            lossy_utf8 = lossy,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Corpus loaded"
        );
        Ok(documents)
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn fingerprint(&self) -> Result<Option<u64>, LoadError> {
        let mut parts: Vec<String> = Vec::new();
        for path in self.article_paths()? {
            let meta = std::fs::metadata(&path)?;
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            parts.push(format!("{}\0{}\0{}\n", self.relative(&path), meta.len(), modified));
        }
        let bytes: Vec<&[u8]> = parts.iter().map(|p| p.as_bytes()).collect();
        Ok(Some(stable_hash(&bytes)))
    }
}

// ─── In-memory corpus ───────────────────────────────────────────────

/// Pre-parsed documents, for tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    documents: Vec<Document>,
}

impl MemoryCorpus {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Add a document built from id/title/body; `source_path` becomes `<id>.md`.
    pub fn with(mut self, id: &str, title: &str, body: &str) -> Self {
        self.documents.push(Document {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            source_path: format!("{}.md", id),
        });
        self
    }
}

impl CorpusSource for MemoryCorpus {
    fn load_documents(&self) -> Result<Vec<Document>, LoadError> {
        Ok(self.documents.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory corpus ({} documents)", self.documents.len())
    }
}
