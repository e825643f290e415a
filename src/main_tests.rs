use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;

use handbook::persist::save_snapshot;
use handbook::{CorpusSource, EngineConfig, Snapshot, SnapshotHandle};

use crate::cli::{self, Cli, Commands};
use crate::mcp::{self, handlers::HandlerContext};
use crate::mcp::reload::Reloader;

fn write(dir: &Path, rel: &str, content: &str) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn sample_handbook(dir: &Path) {
    write(dir, "glyphs/anchors.md", "# Anchors\n\nAnchors position marks. Use mark to base attachment.");
    write(dir, "spacing/kerning.md", "# Kerning\n\nKerning groups let you kern many glyphs at once.");
    write(dir, "fonts/exporting.md", "# Exporting Fonts\n\nExport OpenType fonts with **features** compiled.");
}

// ─── Argument parsing ───────────────────────────────────────────────

#[test]
fn test_parse_search_defaults() {
    let cli = Cli::try_parse_from(["handbook", "search", "kerning groups"]).unwrap();
    let Commands::Search(args) = cli.command else { panic!("expected search") };
    assert_eq!(args.query, "kerning groups");
    assert_eq!(args.limit, 10);
    assert!(!args.all && !args.phrase && !args.json && !args.no_cache);
    assert_eq!(args.corpus.dir, ".");
    assert_eq!(args.corpus.extensions(), vec!["md", "markdown"]);
}

#[test]
fn test_parse_search_negative_limit_is_accepted_by_parser() {
    let cli = Cli::try_parse_from(["handbook", "search", "anchors", "-n", "-2"]).unwrap();
    let Commands::Search(args) = cli.command else { panic!("expected search") };
    assert_eq!(args.limit, -2);
}

#[test]
fn test_parse_serve_flags() {
    let cli = Cli::try_parse_from([
        "handbook", "serve", "-d", "/tmp/hb", "--watch", "--debounce-ms", "250",
        "--log-format", "json", "--max-response-kb", "0",
    ])
    .unwrap();
    let Commands::Serve(args) = cli.command else { panic!("expected serve") };
    assert_eq!(args.corpus.dir, "/tmp/hb");
    assert!(args.watch);
    assert_eq!(args.debounce_ms, 250);
    assert_eq!(args.log_format, "json");
    assert_eq!(args.log_level, "info");
    assert_eq!(args.max_response_kb, 0);
}

#[test]
fn test_parse_rejects_unknown_log_format() {
    assert!(Cli::try_parse_from(["handbook", "serve", "--log-format", "xml"]).is_err());
}

#[test]
fn test_engine_args_to_config() {
    let cli = Cli::try_parse_from([
        "handbook", "index", "--k1", "1.5", "--b", "0.5", "--title-weight", "3",
        "--fold-diacritics", "--min-token-len", "0", "--max-limit", "5",
    ])
    .unwrap();
    let Commands::Index(args) = cli.command else { panic!("expected index") };
    let config = args.engine.to_config();
    assert_eq!(config.scoring.k1, 1.5);
    assert_eq!(config.scoring.b, 0.5);
    assert_eq!(config.scoring.title_weight, 3.0);
    assert!(config.tokenizer.fold_diacritics);
    assert_eq!(config.tokenizer.min_token_len, 1, "zero is raised to one");
    assert_eq!(config.max_limit, 5);
    assert_eq!(config.default_limit, 5, "default limit never exceeds the cap");
}

#[test]
fn test_default_engine_args_match_library_defaults() {
    let cli = Cli::try_parse_from(["handbook", "index"]).unwrap();
    let Commands::Index(args) = cli.command else { panic!("expected index") };
    assert_eq!(args.engine.to_config(), EngineConfig::default());
}

#[test]
fn test_index_dir_override() {
    let cli = Cli::try_parse_from(["handbook", "info", "--index-dir", "/tmp/cache"]).unwrap();
    let Commands::Info(args) = cli.command else { panic!("expected info") };
    assert_eq!(args.cache.index_base(), std::path::PathBuf::from("/tmp/cache"));
}

// ─── info JSON ──────────────────────────────────────────────────────

#[test]
fn test_info_json_lists_saved_snapshot() {
    let corpus_dir = tempfile::tempdir().unwrap();
    let cache_dir = tempfile::tempdir().unwrap();
    sample_handbook(corpus_dir.path());
    let root = corpus_dir.path().to_string_lossy().to_string();

    let source = handbook::DirectoryCorpus::new(corpus_dir.path());
    let snapshot = Snapshot::from_source(&source, EngineConfig::default()).unwrap();
    save_snapshot(&snapshot, &root, cache_dir.path()).unwrap();

    let info = cli::cmd_info_json(cache_dir.path());
    let entries = info["snapshots"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["documents"], 3);
    assert_eq!(entries[0]["orphaned"], false);
}

// ─── End to end over the JSON-RPC loop ──────────────────────────────

#[test]
fn test_serve_lines_end_to_end_with_reload() {
    let corpus_dir = tempfile::tempdir().unwrap();
    sample_handbook(corpus_dir.path());
    let source = handbook::DirectoryCorpus::new(corpus_dir.path());
    let snapshot = Snapshot::from_source(&source, EngineConfig::default()).unwrap();
    let source: Arc<dyn CorpusSource> = Arc::new(source);
    let reloader = Arc::new(Reloader::new(
        Arc::new(SnapshotHandle::new(snapshot)),
        source,
        corpus_dir.path().to_string_lossy().to_string(),
        EngineConfig::default(),
        corpus_dir.path().join("unused-cache"),
        false,
    ));
    let ctx = HandlerContext::new(reloader, corpus_dir.path().join("unused-cache"), 16 * 1024);

    let run = |input: &str| -> Vec<Value> {
        let mut out = Vec::new();
        mcp::server::serve_lines(&ctx, input.as_bytes(), &mut out);
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    };
    let search = |id: u32, query: &str| -> String {
        format!(
            r#"{{"jsonrpc":"2.0","id":{},"method":"tools/call","params":{{"name":"handbook_search","arguments":{{"query":"{}"}}}}}}"#,
            id, query
        )
    };
    let results = |response: &Value| -> Value {
        serde_json::from_str(response["result"]["content"][0]["text"].as_str().unwrap()).unwrap()
    };

    let responses = run(&format!("{}\n{}\n", search(1, "ligatures"), search(2, "kerning")));
    assert_eq!(responses.len(), 2);
    assert!(results(&responses[0])["results"].as_array().unwrap().is_empty());
    assert_eq!(results(&responses[1])["results"][0]["id"], "spacing/kerning");

    write(corpus_dir.path(), "features/ligatures.md", "# Ligatures\n\nLigatures are substituted by the liga feature.");
    let reload = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"handbook_reload","arguments":{}}}"#;
    let responses = run(&format!("{}\n{}\n", reload, search(4, "ligatures")));
    assert_eq!(results(&responses[0])["generation"], 2);
    let after = results(&responses[1]);
    assert_eq!(after["results"][0]["id"], "features/ligatures");
    assert_eq!(after["summary"]["generation"], 2);
}

#[test]
fn test_markdown_markup_not_searchable() {
    let corpus_dir = tempfile::tempdir().unwrap();
    sample_handbook(corpus_dir.path());
    let source = handbook::DirectoryCorpus::new(corpus_dir.path());
    let snapshot = Snapshot::from_source(&source, EngineConfig::default()).unwrap();
    let hits = snapshot.search("features", &handbook::SearchOptions::default()).unwrap();
    assert_eq!(hits[0].id, "fonts/exporting");
    assert!(!hits[0].snippet.contains("**"));
}
