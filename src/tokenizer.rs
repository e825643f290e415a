//! Tokenizer/normalizer shared by index build and query parsing.
//!
//! Splits on whitespace and punctuation, keeps `-` and `_` inside words
//! (`x-height`, `mark_to_base`), lowercases, optionally folds diacritics.
//! No stemming: feature tags like `smcp` or `liga` must match exactly.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::TokenizerConfig;

/// English function words dropped from free-term queries.
/// Sorted for binary search.
const STOPWORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "but", "by", "can", "do", "does",
    "for", "from", "has", "have", "how", "i", "if", "in", "into", "is", "it", "its", "me",
    "my", "no", "not", "of", "on", "or", "so", "such", "than", "that", "the", "their",
    "then", "there", "these", "this", "those", "to", "was", "we", "what", "when", "where",
    "which", "while", "who", "why", "will", "with", "you", "your",
];

/// Returns true for common English function words.
#[must_use]
pub fn is_stopword(term: &str) -> bool {
    STOPWORDS.binary_search(&term).is_ok()
}

/// A normalized token with its location in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub term: String,
    /// Token offset among kept tokens (0-based).
    pub position: u32,
    pub byte_start: usize,
    pub byte_end: usize,
    pub char_start: usize,
    pub char_end: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c)
}

fn is_joiner(c: char) -> bool {
    c == '-' || c == '_'
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize into `(term, position)` pairs.
    ///
    /// ```
    /// use handbook::Tokenizer;
    ///
    /// let tokens = Tokenizer::default().tokenize("Set the x-height, then SMCP!");
    /// let terms: Vec<&str> = tokens.iter().map(|(t, _)| t.as_str()).collect();
    /// assert_eq!(terms, vec!["set", "the", "x-height", "then", "smcp"]);
    /// ```
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<(String, u32)> {
        self.spans(text)
            .into_iter()
            .map(|s| (s.term, s.position))
            .collect()
    }

    /// Tokenize keeping byte and char ranges of every token in `text`.
    #[must_use]
    pub fn spans(&self, text: &str) -> Vec<TokenSpan> {
        let mut out = Vec::new();
        let mut position = 0u32;

        // (byte_start, char_start) of the run in progress
        let mut run: Option<(usize, usize)> = None;
        let mut char_idx = 0usize;

        for (byte_idx, c) in text.char_indices() {
            if is_word_char(c) || is_joiner(c) {
                if run.is_none() {
                    run = Some((byte_idx, char_idx));
                }
            } else if let Some((bs, cs)) = run.take() {
                self.push_run(text, bs, byte_idx, cs, char_idx, &mut position, &mut out);
            }
            char_idx += 1;
        }
        if let Some((bs, cs)) = run {
            self.push_run(text, bs, text.len(), cs, char_idx, &mut position, &mut out);
        }
        out
    }

    /// Normalize a single raw word the same way tokens are normalized.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        if self.config.fold_diacritics {
            let folded: String = raw.nfkd().filter(|c| !is_combining_mark(*c)).collect();
            folded.to_lowercase()
        } else {
            raw.to_lowercase()
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_run(
        &self,
        text: &str,
        mut byte_start: usize,
        mut byte_end: usize,
        mut char_start: usize,
        mut char_end: usize,
        position: &mut u32,
        out: &mut Vec<TokenSpan>,
    ) {
        // Joiners are ASCII, so one byte == one char while trimming.
        let bytes = text.as_bytes();
        while byte_start < byte_end && is_joiner(bytes[byte_start] as char) {
            byte_start += 1;
            char_start += 1;
        }
        while byte_end > byte_start && is_joiner(bytes[byte_end - 1] as char) {
            byte_end -= 1;
            char_end -= 1;
        }
        if byte_start == byte_end {
            return;
        }

        // Compatibility folding can introduce separators (`½` becomes `1⁄2`).
        // Every piece is its own token sharing the source range of the run.
        let normalized = self.normalize(&text[byte_start..byte_end]);
        for piece in normalized.split(|c: char| !(is_word_char(c) || is_joiner(c))) {
            let term = piece.trim_matches(is_joiner);
            let len = term.chars().count();
            if len == 0 || len < self.config.min_token_len {
                continue;
            }
            out.push(TokenSpan {
                term: term.to_string(),
                position: *position,
                byte_start,
                byte_end,
                char_start,
                char_end,
            });
            *position += 1;
        }
    }
}

/// Tokenize with the default configuration.
#[must_use]
pub fn tokenize(text: &str) -> Vec<(String, u32)> {
    Tokenizer::default().tokenize(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        tokenize(text).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(terms("Mark to Base positioning"), vec!["mark", "to", "base", "positioning"]);
    }

    #[test]
    fn test_tokenize_keeps_intra_word_hyphen_and_underscore() {
        assert_eq!(terms("x-height and cap_height"), vec!["x-height", "and", "cap_height"]);
    }

    #[test]
    fn test_tokenize_trims_edge_joiners() {
        assert_eq!(terms("--flag _private- -"), vec!["flag", "private"]);
    }

    #[test]
    fn test_tokenize_punctuation_splits() {
        assert_eq!(terms("Glyph > Add Anchors (Cmd-U)."), vec!["glyph", "add", "anchors", "cmd-u"]);
    }

    #[test]
    fn test_tokenize_positions_are_consecutive() {
        let tokens = tokenize("one, two... three");
        let positions: Vec<u32> = tokens.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_tokenize_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  ... --- !!").is_empty());
    }

    #[test]
    fn test_tokenize_single_char_tokens_kept() {
        assert_eq!(terms("a b c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_min_token_len_drops_without_consuming_position() {
        let tok = Tokenizer::new(TokenizerConfig { min_token_len: 2, fold_diacritics: false });
        let tokens = tok.tokenize("a bb c dd");
        assert_eq!(tokens, vec![("bb".to_string(), 0), ("dd".to_string(), 1)]);
    }

    #[test]
    fn test_spans_cover_original_text() {
        let text = "Öffne das «Glyph»-Menü";
        let spans = Tokenizer::default().spans(text);
        for s in &spans {
            let slice = &text[s.byte_start..s.byte_end];
            assert_eq!(slice.to_lowercase(), s.term);
            assert_eq!(slice.chars().count(), s.char_end - s.char_start);
        }
        assert_eq!(spans.last().unwrap().term, "menü");
    }

    #[test]
    fn test_fold_diacritics() {
        let tok = Tokenizer::new(TokenizerConfig { min_token_len: 1, fold_diacritics: true });
        let t: Vec<String> = tok.tokenize("Café Crème").into_iter().map(|(t, _)| t).collect();
        assert_eq!(t, vec!["cafe", "creme"]);
    }

    #[test]
    fn test_fold_splits_compatibility_separators() {
        let tok = Tokenizer::new(TokenizerConfig { min_token_len: 1, fold_diacritics: true });
        let tokens = tok.tokenize("use ½ em");
        assert_eq!(
            tokens,
            vec![
                ("use".to_string(), 0),
                ("1".to_string(), 1),
                ("2".to_string(), 2),
                ("em".to_string(), 3)
            ]
        );
        let spans = tok.spans("½");
        assert_eq!(spans.len(), 2);
        assert!(spans.iter().all(|s| s.byte_start == 0 && s.byte_end == "½".len()));
    }

    #[test]
    fn test_fold_lowercases_after_decomposition() {
        let tok = Tokenizer::new(TokenizerConfig { min_token_len: 1, fold_diacritics: true });
        let t: Vec<String> = tok.tokenize("ℌeight İstanbul ﬁnal").into_iter().map(|(t, _)| t).collect();
        assert_eq!(t, vec!["height", "istanbul", "final"]);
    }

    #[test]
    fn test_decomposed_combining_marks_stay_in_token() {
        // "e" + COMBINING ACUTE ACCENT
        let t = terms("caf\u{0065}\u{0301} noir");
        assert_eq!(t.len(), 2);
        assert!(t[0].starts_with("caf"));
    }

    #[test]
    fn test_stopwords() {
        assert!(is_stopword("the"));
        assert!(is_stopword("to"));
        assert!(!is_stopword("kerning"));
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS, "STOPWORDS must stay sorted for binary_search");
    }
}
