//! MCP server startup and configuration.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use handbook::persist::load_or_build;
use handbook::{CorpusSource, SnapshotHandle};

use crate::mcp;
use crate::mcp::handlers::HandlerContext;
use crate::mcp::reload::Reloader;

use super::{init_logging, CliError, ServeArgs};

pub fn cmd_serve(args: ServeArgs) -> Result<(), CliError> {
    init_logging(&args.log_level, &args.log_format);

    let config = args.engine.to_config();
    let index_base = args.cache.index_base();
    let source = args.corpus.source();
    info!(
        dir = %args.corpus.dir,
        ext = %args.corpus.ext,
        index_dir = %index_base.display(),
        watch = args.watch,
        "Starting MCP server"
    );

    // Startup is synchronous: a handbook is small enough that serving
    // before the first snapshot exists buys nothing.
    let start = Instant::now();
    let (snapshot, from_cache) = load_or_build(&source, &args.corpus.dir, &config, &index_base, !args.no_cache)?;
    let stats = snapshot.stats();
    info!(
        documents = stats.documents,
        terms = stats.terms,
        from_cache,
        elapsed_ms = format_args!("{:.1}", start.elapsed().as_secs_f64() * 1000.0),
        "Snapshot ready"
    );

    let source: Arc<dyn CorpusSource> = Arc::new(source);
    let reloader = Arc::new(Reloader::new(
        Arc::new(SnapshotHandle::new(snapshot)),
        source,
        args.corpus.dir.clone(),
        config,
        index_base.clone(),
        !args.no_cache,
    ));

    if args.watch {
        let dir = std::fs::canonicalize(&args.corpus.dir).unwrap_or_else(|_| args.corpus.dir.clone().into());
        if let Err(e) = mcp::watcher::start_watcher(Arc::clone(&reloader), dir, args.corpus.extensions(), args.debounce_ms) {
            warn!(error = %e, "Failed to start file watcher, continuing without --watch");
        }
    }

    let max_response_bytes = args.max_response_kb.saturating_mul(1024);
    let ctx = HandlerContext::new(reloader, index_base, max_response_bytes);
    mcp::server::run_server(ctx);
    Ok(())
}
