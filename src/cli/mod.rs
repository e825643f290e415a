//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;
mod info;
mod serve;

pub use args::*;
pub use info::cmd_info_json;

use clap::{Parser, Subcommand};
use serde_json::json;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use handbook::persist::{cleanup_orphaned_snapshots, load_or_build, save_snapshot};
use handbook::{LoadError, MatchMode, PersistError, QueryInputError, SearchOptions, Snapshot};

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error(transparent)]
    Query(#[from] QueryInputError),

    #[error("Document '{0}' not found")]
    DocumentNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ─── CLI ─────────────────────────────────────────────────────────────

/// Lexical search over font-editor handbook articles, with an MCP server
#[derive(Parser, Debug)]
#[command(
    name = "handbook",
    version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATETIME"), ")"),
    about,
    after_help = "\
Run 'handbook <COMMAND> --help' for detailed options and examples.\n\
Common options: -d <DIR> (handbook directory), -n <N> (result limit), --json"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Build the snapshot for a handbook directory and cache it
    Index(IndexArgs),

    /// Search the handbook (uses the cached snapshot when current)
    Search(SearchArgs),

    /// Print one article by id
    Get(GetArgs),

    /// List cached snapshots
    Info(InfoArgs),

    /// Start MCP (Model Context Protocol) server over stdio.
    Serve(ServeArgs),

    /// Remove cached snapshots whose handbook directory no longer exists.
    Cleanup(CleanupArgs),

    /// Show the query syntax guide.
    Guide(GuideArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Index(args) => cmd_index(args),
        Commands::Search(args) => cmd_search(args),
        Commands::Get(args) => cmd_get(args),
        Commands::Info(args) => info::cmd_info(&args),
        Commands::Serve(args) => serve::cmd_serve(args),
        Commands::Cleanup(args) => {
            init_logging("info", "text");
            let idx_base = args.cache.index_base();
            eprintln!("Scanning for orphaned snapshots in {}...", idx_base.display());
            let removed = cleanup_orphaned_snapshots(&idx_base);
            if removed == 0 {
                eprintln!("No orphaned snapshots found.");
            } else {
                eprintln!("Removed {} orphaned snapshot file(s).", removed);
            }
            Ok(())
        }
        Commands::Guide(args) => cmd_guide(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `level`.
/// Safe to call more than once: later calls are ignored.
pub(crate) fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let _ = if format == "json" { builder.json().try_init() } else { builder.try_init() };
}

/// Load the snapshot for a one-shot command.
fn load_for_command(
    corpus: &CorpusArgs,
    engine: &EngineArgs,
    cache: &CacheArgs,
    no_cache: bool,
) -> Result<Snapshot, CliError> {
    let source = corpus.source();
    let (snapshot, _) = load_or_build(&source, &corpus.dir, &engine.to_config(), &cache.index_base(), !no_cache)?;
    Ok(snapshot)
}

// ─── Commands ───────────────────────────────────────────────────────

fn cmd_index(args: IndexArgs) -> Result<(), CliError> {
    init_logging("info", "text");
    let source = args.corpus.source();
    let snapshot = Snapshot::from_source(&source, args.engine.to_config())?;
    let path = save_snapshot(&snapshot, &args.corpus.dir, &args.cache.index_base())?;
    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    let stats = snapshot.stats();
    eprintln!(
        "Snapshot saved to {} ({} documents, {} terms, {:.1} MB)",
        path.display(),
        stats.documents,
        stats.terms,
        size as f64 / 1_048_576.0
    );
    Ok(())
}

fn cmd_search(args: SearchArgs) -> Result<(), CliError> {
    init_logging("warn", "text");
    if args.limit < 1 {
        return Err(QueryInputError::InvalidLimit { limit: args.limit }.into());
    }
    let snapshot = load_for_command(&args.corpus, &args.engine, &args.cache, args.no_cache)?;
    let options = SearchOptions {
        limit: (args.limit as usize).min(snapshot.config().max_limit),
        mode: if args.all { MatchMode::All } else { MatchMode::Any },
        phrase: args.phrase,
    };
    let outcome = snapshot.search_detailed(&args.query, &options)?;
    let results = snapshot.format(&outcome);

    if args.json {
        let output = json!({
            "results": results,
            "summary": {
                "query": args.query,
                "clauses": outcome.query.clauses.iter().map(|c| c.label()).collect::<Vec<_>>(),
                "mode": outcome.query.mode.as_str(),
                "totalMatches": outcome.total_hits,
                "returned": results.len(),
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if results.is_empty() {
        eprintln!("No matches for '{}'.", args.query);
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        println!("{:2}. {}  [{}]  score {:.3}", i + 1, r.title, r.id, r.score);
        println!("    {}", r.path);
        if !r.snippet.is_empty() {
            println!("    {}", r.snippet);
        }
        println!();
    }
    eprintln!("{} of {} matching documents shown", results.len(), outcome.total_hits);
    Ok(())
}

fn cmd_get(args: GetArgs) -> Result<(), CliError> {
    init_logging("warn", "text");
    let snapshot = load_for_command(&args.corpus, &args.engine, &args.cache, args.no_cache)?;
    let doc = snapshot
        .store()
        .get(&args.id)
        .ok_or_else(|| CliError::DocumentNotFound(args.id.clone()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(doc)?);
    } else {
        println!("# {}", doc.title);
        println!("({})", doc.source_path);
        println!();
        println!("{}", doc.body);
    }
    Ok(())
}

fn cmd_guide(args: &GuideArgs) -> Result<(), CliError> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&crate::guide::render_json())?);
    } else {
        print!("{}", crate::guide::render_cli());
    }
    Ok(())
}
