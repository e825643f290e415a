//! Result formatting: ranked hits → `{id, title, path, snippet, score}`.

use serde::Serialize;

use crate::search::ScoredResult;
use crate::store::DocumentStore;
use crate::tokenizer::{TokenSpan, Tokenizer};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DisplayResult {
    pub id: String,
    pub title: String,
    pub path: String,
    pub snippet: String,
    pub score: f64,
}

/// Attach title, path and snippet to every result, preserving order.
pub fn format_results(
    results: &[ScoredResult],
    store: &DocumentStore,
    tokenizer: &Tokenizer,
    max_chars: usize,
) -> Vec<DisplayResult> {
    results
        .iter()
        .filter_map(|r| {
            let doc = store.document(r.doc_id)?;
            Some(DisplayResult {
                id: doc.id.clone(),
                title: doc.title.clone(),
                path: doc.source_path.clone(),
                snippet: extract_snippet(&doc.body, tokenizer, &r.matched_terms, max_chars),
                score: r.score,
            })
        })
        .collect()
}

/// Best body window around the query terms, at most `max_chars` characters.
///
/// The window is the cluster of matches covering the most distinct terms in
/// the fewest tokens, widened by whole tokens on both sides while it fits.
/// With no body match (title-only hit) the window starts at the first token.
/// Tokens are never split: when no whole token fits the result is empty.
/// Whitespace inside the window is collapsed to single spaces.
pub fn extract_snippet(body: &str, tokenizer: &Tokenizer, terms: &[String], max_chars: usize) -> String {
    if max_chars == 0 {
        return String::new();
    }
    let spans = tokenizer.spans(body);
    if spans.is_empty() {
        return String::new();
    }

    let (mut lo, mut hi) = best_cluster(&spans, terms).unwrap_or((0, 0));
    let width = |lo: usize, hi: usize| spans[hi].char_end - spans[lo].char_start;

    while hi > lo && width(lo, hi) > max_chars {
        hi -= 1;
    }
    if width(lo, hi) > max_chars {
        // The match itself is longer than the budget; tokens are never cut,
        // so use the nearest token that fits whole.
        match (0..spans.len()).filter(|&i| width(i, i) <= max_chars).min_by_key(|&i| i.abs_diff(lo)) {
            Some(i) => (lo, hi) = (i, i),
            None => return String::new(),
        }
    }

    loop {
        let mut grew = false;
        if lo > 0 && width(lo - 1, hi) <= max_chars {
            lo -= 1;
            grew = true;
        }
        if hi + 1 < spans.len() && width(lo, hi + 1) <= max_chars {
            hi += 1;
            grew = true;
        }
        if !grew {
            break;
        }
    }

    collapse_whitespace(&body[spans[lo].byte_start..spans[hi].byte_end])
}

/// Span index range of the tightest match cluster with the most distinct terms.
fn best_cluster(spans: &[TokenSpan], terms: &[String]) -> Option<(usize, usize)> {
    // (span index, term index)
    let hits: Vec<(usize, usize)> = spans
        .iter()
        .enumerate()
        .filter_map(|(i, s)| terms.iter().position(|t| *t == s.term).map(|t| (i, t)))
        .collect();

    let mut best: Option<(usize, usize, usize)> = None; // (distinct, lo, hi)
    for start in 0..hits.len() {
        let mut seen = vec![false; terms.len()];
        let mut distinct = 0;
        for &(span_idx, term_idx) in &hits[start..] {
            if !seen[term_idx] {
                seen[term_idx] = true;
                distinct += 1;
                let lo = hits[start].0;
                let better = match best {
                    None => true,
                    Some((d, blo, bhi)) => distinct > d || (distinct == d && span_idx - lo < bhi - blo),
                };
                if better {
                    best = Some((distinct, lo, span_idx));
                }
                if distinct == terms.len() {
                    break;
                }
            }
        }
    }
    best.map(|(_, lo, hi)| (lo, hi))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(body: &str, terms: &[&str], max: usize) -> String {
        let terms: Vec<String> = terms.iter().map(|s| s.to_string()).collect();
        extract_snippet(body, &Tokenizer::default(), &terms, max)
    }

    #[test]
    fn test_short_body_returned_whole() {
        assert_eq!(snippet("Kerning groups reduce pairs", &["groups"], 160), "Kerning groups reduce pairs");
    }

    #[test]
    fn test_snippet_contains_match_and_respects_limit() {
        let body = format!("{} anchors are placed on the base glyph. {}", "lorem ".repeat(60), "ipsum ".repeat(60));
        let s = snippet(&body, &["anchors"], 60);
        assert!(s.contains("anchors"), "snippet: {}", s);
        assert!(s.chars().count() <= 60);
    }

    #[test]
    fn test_prefers_cluster_with_more_distinct_terms() {
        let body = format!(
            "mark alone here. {} mark to base anchors together. {}",
            "filler ".repeat(40),
            "filler ".repeat(40)
        );
        let s = snippet(&body, &["mark", "base", "anchors"], 40);
        assert!(s.contains("base anchors"), "snippet: {}", s);
    }

    #[test]
    fn test_title_only_match_uses_leading_text() {
        let s = snippet("This article covers the basics in some detail.", &["kerning"], 20);
        assert!(s.starts_with("This article"));
        assert!(s.chars().count() <= 20);
    }

    #[test]
    fn test_multibyte_text_stays_on_char_boundaries() {
        let body = "Ünïcödé glyph names — ligatures ﬁ and ß need care; diacritics like é stay intact.";
        for max in 1..body.chars().count() {
            let s = snippet(body, &["ligatures"], max);
            assert!(s.chars().count() <= max);
        }
        assert!(snippet(body, &["ligatures"], 30).contains("ligatures"));
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(snippet("alpha\n\n  beta\tgamma", &["beta"], 100), "alpha beta gamma");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(snippet("", &["x"], 100), "");
        assert_eq!(snippet("!!! ???", &["x"], 100), "");
        assert_eq!(snippet("alpha", &["alpha"], 0), "");
    }

    #[test]
    fn test_oversized_match_falls_back_to_nearest_whole_token() {
        let s = snippet("see supercalifragilistic here", &["supercalifragilistic"], 5);
        assert_eq!(s, "see");
        assert_eq!(snippet("see supercalifragilistic here", &["supercalifragilistic"], 9), "see");
    }

    #[test]
    fn test_no_token_fits_gives_empty_snippet() {
        assert_eq!(snippet("supercalifragilistic", &["supercalifragilistic"], 5), "");
        assert_eq!(snippet("ééé", &["ééé"], 1), "");
    }

    #[test]
    fn test_format_results_preserves_order() {
        use crate::corpus::MemoryCorpus;
        use crate::search::{search, SearchOptions};
        use crate::snapshot::Snapshot;

        let corpus = MemoryCorpus::default()
            .with("anchors", "Anchors", "Mark to base positioning uses anchors.")
            .with("kerning", "Kerning", "Kerning groups reduce pairs.");
        let snap = Snapshot::from_source(&corpus, Default::default()).unwrap();
        let results = search(&snap, "anchors kerning", &SearchOptions::default()).unwrap();
        let display = format_results(&results, snap.store(), snap.tokenizer(), 160);
        let ids: Vec<&str> = display.iter().map(|d| d.id.as_str()).collect();
        let expected: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, expected);
        assert_eq!(display[0].path, format!("{}.md", display[0].id));
    }
}
