//! Clap argument structs for every subcommand.

use std::path::PathBuf;

use clap::{Args, Parser};

use handbook::config::{DEFAULT_LIMIT, DEFAULT_MAX_LIMIT, DEFAULT_SNIPPET_CHARS};
use handbook::persist::index_dir;
use handbook::{DirectoryCorpus, EngineConfig, ScoringConfig, TokenizerConfig};

/// Where the handbook articles live.
#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    /// Handbook cache directory (markdown articles).
    #[arg(short, long, default_value = ".")]
    pub dir: String,

    /// Article extensions, comma-separated.
    #[arg(short, long, default_value = "md,markdown")]
    pub ext: String,

    /// Include hidden files and directories.
    #[arg(long)]
    pub hidden: bool,

    /// Don't respect .gitignore files.
    #[arg(long)]
    pub no_ignore: bool,
}

impl CorpusArgs {
    pub fn extensions(&self) -> Vec<String> {
        self.ext.split(',').map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()).collect()
    }

    pub fn source(&self) -> DirectoryCorpus {
        DirectoryCorpus::new(&self.dir)
            .with_extensions(&self.extensions())
            .with_walk_options(self.hidden, self.no_ignore)
    }
}

/// Tokenizer, scoring and output tuning.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// BM25 term-frequency saturation.
    #[arg(long, default_value_t = 1.2)]
    pub k1: f64,

    /// BM25 length normalization (0 = none, 1 = full).
    #[arg(long, default_value_t = 0.75)]
    pub b: f64,

    /// Multiplier for term occurrences in the article title.
    #[arg(long, default_value_t = 2.0)]
    pub title_weight: f64,

    /// Fold diacritics (é → e) when indexing and querying. Changes the index.
    #[arg(long)]
    pub fold_diacritics: bool,

    /// Minimum token length in characters. Changes the index.
    #[arg(long, default_value_t = 1)]
    pub min_token_len: usize,

    /// Maximum snippet length in characters.
    #[arg(long, default_value_t = DEFAULT_SNIPPET_CHARS)]
    pub snippet_chars: usize,

    /// Upper bound for a requested result limit.
    #[arg(long, default_value_t = DEFAULT_MAX_LIMIT)]
    pub max_limit: usize,
}

impl EngineArgs {
    pub fn to_config(&self) -> EngineConfig {
        EngineConfig {
            tokenizer: TokenizerConfig {
                min_token_len: self.min_token_len.max(1),
                fold_diacritics: self.fold_diacritics,
            },
            scoring: ScoringConfig { k1: self.k1, b: self.b, title_weight: self.title_weight },
            snippet_chars: self.snippet_chars,
            default_limit: DEFAULT_LIMIT.min(self.max_limit.max(1)),
            max_limit: self.max_limit.max(1),
        }
    }
}

/// Snapshot cache location.
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Snapshot cache directory (default: local data dir / handbook-search).
    #[arg(long)]
    pub index_dir: Option<PathBuf>,
}

impl CacheArgs {
    pub fn index_base(&self) -> PathBuf {
        self.index_dir.clone().unwrap_or_else(index_dir)
    }
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  handbook index -d ~/.cache/glyphs-handbook
  handbook index -d ./handbook --fold-diacritics

NOTES:
  - The snapshot is cached under --index-dir and reused by 'search', 'get'
    and 'serve' until an article changes.
  - Tokenizer flags (--fold-diacritics, --min-token-len) are part of the
    cache key: changing them forces a rebuild.
"#)]
pub struct IndexArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  Free terms (OR):   handbook search "kerning groups" -d ./handbook
  All terms:         handbook search "kerning groups" -d ./handbook --all
  Inline AND:        handbook search "kerning AND groups" -d ./handbook
  Exact phrase:      handbook search '"mark to base"' -d ./handbook
  Whole query:       handbook search "mark to base" -d ./handbook --phrase
  JSON output:       handbook search "anchors" -d ./handbook --json

NOTES:
  - Documents matching more query terms always rank first, then BM25.
  - Common English words (the, to, how...) are ignored outside phrases.
"#)]
pub struct SearchArgs {
    /// Query text. Quote a part with "..." for an exact phrase.
    pub query: String,

    /// Maximum results to show.
    #[arg(short = 'n', long, default_value_t = DEFAULT_LIMIT as i64, allow_negative_numbers = true)]
    pub limit: i64,

    /// Require every term (AND).
    #[arg(long)]
    pub all: bool,

    /// Treat the whole query as one phrase.
    #[arg(long)]
    pub phrase: bool,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,

    /// Always rebuild; never read or write the snapshot cache.
    #[arg(long)]
    pub no_cache: bool,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Document id (relative path without extension, e.g. 'glyphs/anchors').
    pub id: String,

    /// Print the article as JSON.
    #[arg(long)]
    pub json: bool,

    /// Always rebuild; never read or write the snapshot cache.
    #[arg(long)]
    pub no_cache: bool,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Print as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Parser, Debug)]
pub struct CleanupArgs {
    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Parser, Debug)]
pub struct GuideArgs {
    /// Print the guide as JSON (same content as the handbook_help tool).
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(after_long_help = r#"EXAMPLES:
  handbook serve -d ~/.cache/glyphs-handbook
  handbook serve -d ./handbook --watch --debounce-ms 1000
  handbook serve -d ./handbook --log-level debug --log-format json

MCP CLIENT CONFIG:
  {
    "mcpServers": {
      "handbook": {
        "command": "handbook",
        "args": ["serve", "--dir", "/path/to/handbook", "--watch"]
      }
    }
  }

TOOLS:
  handbook_search   Ranked search with snippets
  handbook_get      Full article by id
  handbook_info     Live snapshot statistics
  handbook_reload   Rebuild from disk and swap in the new snapshot
  handbook_help     Query syntax guide

HOW IT WORKS:
  1. Loads the cached snapshot, or builds one from the articles
  2. Starts the JSON-RPC loop on stdin/stdout
  3. Queries read the current snapshot; reloads swap it atomically
  4. With --watch: article changes trigger a debounced rebuild
  5. Logging goes to stderr (never pollutes JSON-RPC on stdout)
"#)]
pub struct ServeArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Rebuild the snapshot when articles change.
    #[arg(long)]
    pub watch: bool,

    /// Debounce delay in ms for the file watcher.
    #[arg(long, default_value = "500")]
    pub debounce_ms: u64,

    /// Always rebuild; never read or write the snapshot cache.
    #[arg(long)]
    pub no_cache: bool,

    /// Log level for stderr output (error, warn, info, debug, trace). RUST_LOG overrides.
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log line format.
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub log_format: String,

    /// Maximum response size in KB before trailing results are dropped (0 = no limit).
    #[arg(long, default_value = "16")]
    pub max_response_kb: usize,
}
