//! Query execution: postings merge, phrase matching, BM25 scoring, ranking.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ScoringConfig, DEFAULT_LIMIT};
use crate::error::QueryInputError;
use crate::index::{InvertedIndex, Posting};
use crate::query::{parse_query, Clause, MatchMode, Query};
use crate::snapshot::Snapshot;
use crate::store::{DocId, DocumentStore};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    pub mode: MatchMode,
    /// Treat the whole query text as one phrase.
    pub phrase: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { limit: DEFAULT_LIMIT, mode: MatchMode::Any, phrase: false }
    }
}

impl SearchOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self { limit, ..Self::default() }
    }
}

/// One ranked document.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    #[serde(skip)]
    pub doc_id: DocId,
    pub id: String,
    /// Ranking score: `clauses_matched + bm25 / (1 + bm25)`.
    pub score: f64,
    pub bm25: f64,
    pub clauses_matched: usize,
    pub clauses_total: usize,
    /// Query terms that matched this document (drives snippet selection).
    pub matched_terms: Vec<String>,
}

/// Ranked results plus the information a caller needs to explain them.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<ScoredResult>,
    /// Matching documents before `limit` was applied.
    pub total_hits: usize,
    pub query: Query,
}

/// Search a snapshot. See [`search_detailed`].
pub fn search(snapshot: &Snapshot, text: &str, options: &SearchOptions) -> Result<Vec<ScoredResult>, QueryInputError> {
    search_detailed(snapshot, text, options).map(|o| o.results)
}

/// Parse `text` with the snapshot's tokenizer, score, rank and truncate.
///
/// `limit == 0` is an input error. A query with no searchable tokens returns
/// no results.
pub fn search_detailed(
    snapshot: &Snapshot,
    text: &str,
    options: &SearchOptions,
) -> Result<SearchOutcome, QueryInputError> {
    if options.limit == 0 {
        return Err(QueryInputError::InvalidLimit { limit: 0 });
    }
    let query = parse_query(text, snapshot.tokenizer(), options.mode, options.phrase)?;
    let mut results = execute(snapshot.index(), snapshot.store(), &query, &snapshot.config().scoring);
    let total_hits = results.len();
    results.truncate(options.limit);
    Ok(SearchOutcome { results, total_hits, query })
}

// ─── BM25 ───────────────────────────────────────────────────────────

/// `ln((N − df + 0.5) / (df + 0.5) + 1)`; always positive.
pub fn idf(doc_count: u32, doc_freq: usize) -> f64 {
    let n = doc_count as f64;
    let df = doc_freq as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// BM25 contribution of one clause in one document.
pub fn bm25_term(idf: f64, tf: f64, doc_len: u32, avg_doc_len: f64, scoring: &ScoringConfig) -> f64 {
    let len_ratio = if avg_doc_len > 0.0 { doc_len as f64 / avg_doc_len } else { 1.0 };
    let norm = scoring.k1 * (1.0 - scoring.b + scoring.b * len_ratio);
    idf * (tf * (scoring.k1 + 1.0)) / (tf + norm)
}

// ─── Clause matching ────────────────────────────────────────────────

/// (doc, effective term frequency), ascending by doc.
type ClauseHits = Vec<(DocId, f64)>;

fn term_hits(index: &InvertedIndex, term: &str, scoring: &ScoringConfig) -> ClauseHits {
    index
        .postings(term)
        .iter()
        .map(|p| {
            let tf = p.term_frequency as f64 + (scoring.title_weight - 1.0) * p.title_frequency as f64;
            (p.doc_id, tf.max(0.0))
        })
        .collect()
}

/// Merge-intersect two sorted doc id lists.
fn sorted_intersect(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    result
}

fn positions_in<'a>(postings: &'a [Posting], doc_id: DocId) -> &'a [u32] {
    postings
        .binary_search_by_key(&doc_id, |p| p.doc_id)
        .map(|i| postings[i].positions.as_slice())
        .unwrap_or(&[])
}

/// Count starts `p` where term `k` occurs at `p + k` for every `k`.
fn count_phrase_occurrences(position_lists: &[&[u32]]) -> u32 {
    let Some((first, rest)) = position_lists.split_first() else {
        return 0;
    };
    first
        .iter()
        .filter(|&&start| {
            rest.iter()
                .enumerate()
                .all(|(k, list)| list.binary_search(&(start + k as u32 + 1)).is_ok())
        })
        .count() as u32
}

/// Documents containing `terms` as consecutive tokens, with occurrence counts.
pub fn phrase_hits(index: &InvertedIndex, terms: &[String]) -> Vec<(DocId, u32)> {
    let lists: Vec<&[Posting]> = terms.iter().map(|t| index.postings(t)).collect();
    if lists.iter().any(|l| l.is_empty()) {
        return Vec::new();
    }

    let mut candidates: Vec<DocId> = lists[0].iter().map(|p| p.doc_id).collect();
    for list in &lists[1..] {
        let ids: Vec<DocId> = list.iter().map(|p| p.doc_id).collect();
        candidates = sorted_intersect(&candidates, &ids);
        if candidates.is_empty() {
            return Vec::new();
        }
    }

    candidates
        .into_iter()
        .filter_map(|doc_id| {
            let positions: Vec<&[u32]> = lists.iter().map(|l| positions_in(l, doc_id)).collect();
            let count = count_phrase_occurrences(&positions);
            (count > 0).then_some((doc_id, count))
        })
        .collect()
}

fn clause_hits(index: &InvertedIndex, clause: &Clause, scoring: &ScoringConfig) -> ClauseHits {
    match clause {
        Clause::Term(t) => term_hits(index, t, scoring),
        Clause::Phrase(ts) => phrase_hits(index, ts)
            .into_iter()
            .map(|(d, c)| (d, c as f64))
            .collect(),
    }
}

// ─── Execution ──────────────────────────────────────────────────────

#[derive(Default)]
struct Accumulator {
    bm25: f64,
    matched: usize,
    terms: Vec<String>,
}

/// Score every matching document and return them ranked (no limit applied).
pub fn execute(index: &InvertedIndex, store: &DocumentStore, query: &Query, scoring: &ScoringConfig) -> Vec<ScoredResult> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut acc: BTreeMap<DocId, Accumulator> = BTreeMap::new();
    for clause in &query.clauses {
        let hits = clause_hits(index, clause, scoring);
        if hits.is_empty() {
            continue;
        }
        let clause_idf = idf(index.doc_count, hits.len());
        for (doc_id, tf) in hits {
            let entry = acc.entry(doc_id).or_default();
            entry.bm25 += bm25_term(clause_idf, tf, index.doc_len(doc_id), index.avg_doc_len, scoring);
            entry.matched += 1;
            for t in clause.terms() {
                if !entry.terms.contains(t) {
                    entry.terms.push(t.clone());
                }
            }
        }
    }

    let total = query.clauses.len();
    let mut results: Vec<ScoredResult> = acc
        .into_iter()
        .filter(|(_, a)| query.mode == MatchMode::Any || a.matched == total)
        .filter_map(|(doc_id, a)| {
            let doc = store.document(doc_id)?;
            Some(ScoredResult {
                doc_id,
                id: doc.id.clone(),
                score: a.matched as f64 + a.bm25 / (1.0 + a.bm25),
                bm25: a.bm25,
                clauses_matched: a.matched,
                clauses_total: total,
                matched_terms: a.terms,
            })
        })
        .collect();

    // DocIds follow id order, so the doc_id tie-break is the id tie-break.
    results.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
    results
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
