//! Criterion benchmarks for the search engine core.
//!
//! Run with: `cargo bench`
//!
//! All inputs are synthetic so numbers are comparable across machines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use handbook::persist::{load_persisted, save_snapshot};
use handbook::{
    extract_snippet, tokenize, DocumentStore, EngineConfig, InvertedIndex, MatchMode, MemoryCorpus, SearchOptions,
    Snapshot, Tokenizer,
};

// ─── Helpers ─────────────────────────────────────────────────────────

const VOCAB: &[&str] = &[
    "glyph", "anchor", "kerning", "group", "component", "smart", "layer", "master", "instance", "export",
    "feature", "ligature", "outline", "node", "path", "metric", "sidebearing", "width", "font", "unicode",
    "mark", "base", "cursive", "interpolation", "axis", "variable", "hinting", "ttfautohint", "color", "palette",
];

/// Deterministic pseudo-random article text.
fn article_body(seed: usize, words: usize) -> String {
    let mut state = (seed as u64).wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut out = String::with_capacity(words * 8);
    for i in 0..words {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        if i > 0 {
            out.push(if i % 12 == 0 { '.' } else { ' ' });
            if i % 12 == 0 {
                out.push(' ');
            }
        }
        out.push_str(VOCAB[(state >> 33) as usize % VOCAB.len()]);
    }
    out
}

fn synthetic_corpus(docs: usize, words: usize) -> MemoryCorpus {
    let mut corpus = MemoryCorpus::default();
    for i in 0..docs {
        let title = format!("{} {}", VOCAB[i % VOCAB.len()], VOCAB[(i * 7) % VOCAB.len()]);
        corpus = corpus.with(&format!("section{}/article{:04}", i % 10, i), &title, &article_body(i, words));
    }
    corpus
}

fn synthetic_snapshot(docs: usize, words: usize) -> Snapshot {
    Snapshot::from_source(&synthetic_corpus(docs, words), EngineConfig::default()).expect("non-empty corpus")
}

// ─── Benchmarks ──────────────────────────────────────────────────────

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("tokenize");

    let short = "Use mark to base anchors for diacritics.";
    let long = article_body(1, 400);
    let accented = "Café, naïve, Ångström and x-height: the œ ligature in façade.";

    group.bench_function("short_sentence", |b| b.iter(|| tokenize(black_box(short))));
    group.bench_function("article_400_words", |b| b.iter(|| tokenize(black_box(&long))));

    let folding = Tokenizer::new(handbook::TokenizerConfig { min_token_len: 1, fold_diacritics: true });
    group.bench_function("fold_diacritics", |b| b.iter(|| folding.tokenize(black_box(accented))));

    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    group.sample_size(10);

    for &docs in &[100usize, 1_000] {
        let corpus = synthetic_corpus(docs, 300);
        let store = DocumentStore::load(&corpus).expect("non-empty corpus");
        let tokenizer = Tokenizer::default();
        group.bench_with_input(BenchmarkId::new("documents", docs), &store, |b, store| {
            b.iter(|| InvertedIndex::build(black_box(store), &tokenizer))
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    let snapshot = synthetic_snapshot(1_000, 300);

    let cases: &[(&str, &str, MatchMode)] = &[
        ("single_term", "kerning", MatchMode::Any),
        ("three_terms_any", "kerning group smart", MatchMode::Any),
        ("three_terms_all", "kerning group smart", MatchMode::All),
        ("phrase", "\"mark base\"", MatchMode::Any),
        ("unknown_term", "zzqxv", MatchMode::Any),
    ];
    for &(name, query, mode) in cases {
        let options = SearchOptions { mode, ..SearchOptions::default() };
        group.bench_with_input(BenchmarkId::new("query", name), &query, |b, query| {
            b.iter(|| snapshot.search(black_box(query), &options))
        });
    }
    group.finish();
}

fn bench_snippet(c: &mut Criterion) {
    let mut group = c.benchmark_group("snippet");
    let tokenizer = Tokenizer::default();
    let body = article_body(7, 2_000);
    let terms = vec!["ttfautohint".to_string(), "palette".to_string()];

    group.bench_function("two_terms_2000_words", |b| {
        b.iter(|| extract_snippet(black_box(&body), &tokenizer, &terms, 160))
    });
    group.finish();
}

fn bench_persistence(c: &mut Criterion) {
    let mut group = c.benchmark_group("persistence");
    group.sample_size(10);

    let snapshot = synthetic_snapshot(1_000, 300);
    let dir = tempfile::tempdir().expect("temp dir");
    let root = "bench-handbook";

    group.bench_function("save_1k_documents", |b| {
        b.iter(|| save_snapshot(black_box(&snapshot), root, dir.path()).expect("save"))
    });
    save_snapshot(&snapshot, root, dir.path()).expect("save");
    group.bench_function("load_1k_documents", |b| {
        b.iter(|| load_persisted(black_box(root), dir.path()).expect("load"))
    });
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_index_build, bench_search, bench_snippet, bench_persistence);
criterion_main!(benches);
