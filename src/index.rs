//! Inverted index: term → postings (doc id, frequencies, positions).
//!
//! Built once per snapshot, never mutated afterwards. Terms live in a
//! `BTreeMap` so two builds over the same corpus serialize byte-for-byte equal.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::InvariantViolation;
use crate::store::{DocId, DocumentStore};
use crate::tokenizer::Tokenizer;

/// Positions skipped between the last title token and the first body token,
/// so a phrase can never match across the title/body seam.
pub const TITLE_GAP: u32 = 16;

/// One (term, document) pair.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    /// Occurrences in title + body. Always `positions.len()`.
    pub term_frequency: u32,
    /// Occurrences in the title alone.
    pub title_frequency: u32,
    /// Ascending token offsets (title first, body after [`TITLE_GAP`]).
    pub positions: Vec<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InvertedIndex {
    /// term → postings sorted by `doc_id` ascending
    pub terms: BTreeMap<String, Vec<Posting>>,
    /// doc_id → token count (title + body)
    pub doc_lengths: Vec<u32>,
    pub doc_count: u32,
    pub avg_doc_len: f64,
    pub total_tokens: u64,
}

/// Append a posting, enforcing ascending doc order.
///
/// # Panics
///
/// A posting for the same or an earlier document means the build visited a
/// document twice or out of order. That is a programming error, not input.
fn push_posting(list: &mut Vec<Posting>, term: &str, posting: Posting) {
    if let Some(last) = list.last() {
        assert!(
            last.doc_id < posting.doc_id,
            "duplicate or out-of-order posting for term '{}': doc {} after doc {}",
            term,
            posting.doc_id,
            last.doc_id
        );
    }
    list.push(posting);
}

impl InvertedIndex {
    /// Build the index over every document in `store`, in `DocId` order.
    pub fn build(store: &DocumentStore, tokenizer: &Tokenizer) -> Self {
        let start = Instant::now();
        let mut terms: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let mut doc_lengths = Vec::with_capacity(store.len());
        let mut total_tokens = 0u64;

        for (doc_id, doc) in store.iter() {
            let title = tokenizer.tokenize(&doc.title);
            let body = tokenizer.tokenize(&doc.body);
            let body_offset = if title.is_empty() { 0 } else { title.len() as u32 + TITLE_GAP };

            // term → (title hits, positions)
            let mut local: BTreeMap<String, (u32, Vec<u32>)> = BTreeMap::new();
            for (term, pos) in title {
                let entry = local.entry(term).or_default();
                entry.0 += 1;
                entry.1.push(pos);
            }
            for (term, pos) in body {
                local.entry(term).or_default().1.push(body_offset + pos);
            }

            let doc_len: u32 = local.values().map(|(_, p)| p.len() as u32).sum();
            doc_lengths.push(doc_len);
            total_tokens += doc_len as u64;

            for (term, (title_frequency, positions)) in local {
                let posting = Posting {
                    doc_id,
                    term_frequency: positions.len() as u32,
                    title_frequency,
                    positions,
                };
                match terms.get_mut(&term) {
                    Some(list) => push_posting(list, &term, posting),
                    None => {
                        terms.insert(term, vec![posting]);
                    }
                }
            }
        }

        let doc_count = doc_lengths.len() as u32;
        let avg_doc_len = if doc_count == 0 { 0.0 } else { total_tokens as f64 / doc_count as f64 };

        let index = Self { terms, doc_lengths, doc_count, avg_doc_len, total_tokens };
        info!(
            documents = doc_count,
            terms = index.terms.len(),
            tokens = total_tokens,
            elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
            "Inverted index built"
        );
        index
    }

    /// Postings for `term` (already normalized); empty if absent.
    pub fn postings(&self, term: &str) -> &[Posting] {
        self.terms.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn doc_freq(&self, term: &str) -> usize {
        self.postings(term).len()
    }

    pub fn doc_len(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(doc_id as usize).copied().unwrap_or(0)
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Check every structural invariant. Used on indexes loaded from disk.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        if self.doc_lengths.len() != self.doc_count as usize {
            return Err(InvariantViolation::LengthTableMismatch {
                expected: self.doc_count as usize,
                actual: self.doc_lengths.len(),
            });
        }
        for (term, postings) in &self.terms {
            if postings.is_empty() {
                return Err(InvariantViolation::EmptyPostings { term: term.clone() });
            }
            let mut prev: Option<DocId> = None;
            for p in postings {
                if p.doc_id >= self.doc_count {
                    return Err(InvariantViolation::DanglingDocId {
                        term: term.clone(),
                        doc_id: p.doc_id,
                        doc_count: self.doc_count,
                    });
                }
                if prev.is_some_and(|d| d >= p.doc_id) {
                    return Err(InvariantViolation::UnorderedPostings { term: term.clone(), doc_id: p.doc_id });
                }
                let ascending = p.positions.windows(2).all(|w| w[0] < w[1]);
                if !ascending
                    || p.positions.is_empty()
                    || p.term_frequency as usize != p.positions.len()
                    || p.title_frequency > p.term_frequency
                {
                    return Err(InvariantViolation::BadPositions { term: term.clone(), doc_id: p.doc_id });
                }
                prev = Some(p.doc_id);
            }
        }
        Ok(())
    }
}
