//! `handbook_search` handler.

use std::time::Instant;

use serde_json::{json, Value};
use tracing::debug;

use handbook::{MatchMode, QueryInputError, SearchOptions};

use super::utils::{arg_bool, arg_i64, arg_str, json_result};
use super::HandlerContext;
use crate::mcp::protocol::ToolCallResult;

/// Malformed query input is a normal, empty answer with a status, so the
/// client can correct itself; only a missing `query` is a tool error.
fn invalid_query(message: String) -> ToolCallResult {
    json_result(&json!({
        "results": [],
        "status": "invalid_query",
        "message": message,
    }))
}

pub(crate) fn handle_handbook_search(ctx: &HandlerContext, args: &Value) -> ToolCallResult {
    let start = Instant::now();
    let query = match arg_str(args, "query") {
        Ok(Some(q)) => q,
        Ok(None) => return ToolCallResult::error("Missing required parameter: query".to_string()),
        Err(e) => return ToolCallResult::error(e),
    };

    let snapshot = ctx.reloader.snapshots.current();
    let config = snapshot.config();

    let limit = match arg_i64(args, "limit") {
        Ok(Some(n)) if n < 1 => return invalid_query(QueryInputError::InvalidLimit { limit: n }.to_string()),
        Ok(Some(n)) => (n as u64).min(config.max_limit as u64) as usize,
        Ok(None) => config.default_limit,
        Err(e) => return invalid_query(e),
    };
    let mode = match arg_str(args, "mode") {
        Ok(None) => MatchMode::Any,
        Ok(Some(m)) => match MatchMode::parse(m) {
            Some(mode) => mode,
            None => return invalid_query(format!("Unknown mode '{}': expected 'any' or 'all'", m)),
        },
        Err(e) => return invalid_query(e),
    };
    let phrase = match arg_bool(args, "phrase") {
        Ok(p) => p.unwrap_or(false),
        Err(e) => return invalid_query(e),
    };

    let options = SearchOptions { limit, mode, phrase };
    let outcome = match snapshot.search_detailed(query, &options) {
        Ok(o) => o,
        Err(e) => return invalid_query(e.to_string()),
    };
    let results = snapshot.format(&outcome);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    debug!(query = %query, hits = outcome.total_hits, returned = results.len(), elapsed_ms, "Search");

    json_result(&json!({
        "results": results,
        "summary": {
            "query": query,
            "clauses": outcome.query.clauses.iter().map(|c| c.label()).collect::<Vec<_>>(),
            "mode": outcome.query.mode.as_str(),
            "totalMatches": outcome.total_hits,
            "returned": results.len(),
            "generation": snapshot.generation(),
            "searchTimeMs": (elapsed_ms * 100.0).round() / 100.0,
        },
    }))
}
