//! Query planner: query text → clauses.
//!
//! Syntax: free words are OR-ed terms, `"..."` is an exact phrase, a bare
//! `AND` requires every clause, a bare `OR` is accepted and ignored (it is the
//! default). Query text goes through the same [`Tokenizer`] as the index.

use serde::{Deserialize, Serialize};

use crate::error::QueryInputError;
use crate::tokenizer::{is_stopword, Tokenizer};

/// How clauses combine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// OR retrieval; documents matching more clauses rank first.
    #[default]
    Any,
    /// Every clause must match.
    All,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Any => "any",
            MatchMode::All => "all",
        }
    }

    /// Accepts `any`/`or` and `all`/`and`, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "any" | "or" => Some(MatchMode::Any),
            "all" | "and" => Some(MatchMode::All),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Term(String),
    /// Two or more tokens that must appear consecutively.
    Phrase(Vec<String>),
}

impl Clause {
    pub fn terms(&self) -> &[String] {
        match self {
            Clause::Term(t) => std::slice::from_ref(t),
            Clause::Phrase(ts) => ts,
        }
    }

    /// Display form: `term` or `"a b c"`.
    pub fn label(&self) -> String {
        match self {
            Clause::Term(t) => t.clone(),
            Clause::Phrase(ts) => format!("\"{}\"", ts.join(" ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub clauses: Vec<Clause>,
    pub mode: MatchMode,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Every distinct term mentioned by any clause, in first-seen order.
    pub fn distinct_terms(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for t in self.clauses.iter().flat_map(|c| c.terms()) {
            if !out.contains(t) {
                out.push(t.clone());
            }
        }
        out
    }
}

fn phrase_clause(tokens: Vec<String>) -> Option<Clause> {
    match tokens.len() {
        0 => None,
        1 => tokens.into_iter().next().map(Clause::Term),
        _ => Some(Clause::Phrase(tokens)),
    }
}

fn token_texts(tokenizer: &Tokenizer, text: &str) -> Vec<String> {
    tokenizer.tokenize(text).into_iter().map(|(t, _)| t).collect()
}

/// Parse `text` into a [`Query`].
///
/// `force_phrase` treats the whole text (quotes removed) as one phrase.
/// An odd number of `"` is [`QueryInputError::UnbalancedQuote`]. A query with
/// no indexable tokens parses to an empty query, not an error.
pub fn parse_query(
    text: &str,
    tokenizer: &Tokenizer,
    mode: MatchMode,
    force_phrase: bool,
) -> Result<Query, QueryInputError> {
    if force_phrase {
        let stripped = text.replace('"', " ");
        let clauses = phrase_clause(token_texts(tokenizer, &stripped)).into_iter().collect();
        return Ok(Query { clauses, mode });
    }

    if text.matches('"').count() % 2 == 1 {
        return Err(QueryInputError::UnbalancedQuote { query: text.to_string() });
    }

    let mut mode = mode;
    let mut phrases: Vec<Clause> = Vec::new();
    let mut terms: Vec<String> = Vec::new();
    // Single words written in quotes; exempt from stopword removal.
    let mut quoted: Vec<String> = Vec::new();

    for (i, segment) in text.split('"').enumerate() {
        if i % 2 == 1 {
            match phrase_clause(token_texts(tokenizer, segment)) {
                Some(Clause::Term(t)) => {
                    if !quoted.contains(&t) {
                        quoted.push(t.clone());
                    }
                    if !terms.contains(&t) {
                        terms.push(t);
                    }
                }
                Some(phrase) if !phrases.contains(&phrase) => phrases.push(phrase),
                _ => {}
            }
            continue;
        }
        for word in segment.split_whitespace() {
            match word {
                "AND" => mode = MatchMode::All,
                "OR" => {}
                _ => {
                    for t in token_texts(tokenizer, word) {
                        if !terms.contains(&t) {
                            terms.push(t);
                        }
                    }
                }
            }
        }
    }

    // Stopwords only survive when nothing else would be left to search for.
    let has_content = !phrases.is_empty() || !quoted.is_empty() || terms.iter().any(|t| !is_stopword(t));
    if has_content {
        terms.retain(|t| quoted.contains(t) || !is_stopword(t));
    }

    let mut clauses: Vec<Clause> = terms.into_iter().map(Clause::Term).collect();
    clauses.extend(phrases);
    Ok(Query { clauses, mode })
}
