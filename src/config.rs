//! Engine configuration. Stored inside every snapshot so a cached index is
//! only reused with the settings it was built with.

use serde::{Deserialize, Serialize};

/// Default maximum snippet length in characters.
pub const DEFAULT_SNIPPET_CHARS: usize = 160;

/// Default number of results returned by a search.
pub const DEFAULT_LIMIT: usize = 10;

/// Hard upper bound on `limit` accepted by the serving layer.
pub const DEFAULT_MAX_LIMIT: usize = 100;

/// Tokenizer settings. Index time and query time always share one instance.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TokenizerConfig {
    /// Tokens shorter than this many characters are dropped.
    pub min_token_len: usize,
    /// Strip diacritics (NFKD + remove combining marks) so "café" matches "cafe".
    pub fold_diacritics: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { min_token_len: 1, fold_diacritics: false }
    }
}

/// BM25 parameters.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub k1: f64,
    pub b: f64,
    /// Multiplier applied to term occurrences inside the title.
    pub title_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, title_weight: 2.0 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tokenizer: TokenizerConfig,
    pub scoring: ScoringConfig,
    pub snippet_chars: usize,
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerConfig::default(),
            scoring: ScoringConfig::default(),
            snippet_chars: DEFAULT_SNIPPET_CHARS,
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl EngineConfig {
    /// True when an index built with `other` can serve queries under `self`.
    /// Only tokenizer settings change the index contents.
    pub fn index_compatible(&self, other: &EngineConfig) -> bool {
        self.tokenizer == other.tokenizer
    }
}
