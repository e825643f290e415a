//! MCP tool handlers: tool definitions and dispatch.

mod document;
mod search;
pub(crate) mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use tracing::info;

use crate::mcp::protocol::{ToolCallResult, ToolDefinition};
use crate::mcp::reload::Reloader;

/// Return all tool definitions for tools/list
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "handbook_search".to_string(),
            description: "Search the font-editor handbook. Lexical BM25 ranking over article titles and bodies; \
                articles matching more query clauses always rank first. Free words are OR-ed, \"quoted text\" is an \
                exact phrase, and a bare AND between words requires every clause. Common English words are ignored \
                outside phrases. Returns id, title, path, a snippet around the best match, and a score per result. \
                Use handbook_get with a result id to read the full article."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Query text, e.g. 'kerning groups', '\"mark to base\" anchors', 'smart AND components'"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of results (default: 10, capped by the server's --max-limit)"
                    },
                    "mode": {
                        "type": "string",
                        "enum": ["any", "all"],
                        "description": "'any' = documents matching any clause, more clauses rank first (default). 'all' = every clause must match."
                    },
                    "phrase": {
                        "type": "boolean",
                        "description": "Treat the whole query as one exact phrase (default: false)"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: "handbook_get".to_string(),
            description: "Return one full handbook article (title, path, body) by its id as returned from handbook_search."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": {
                        "type": "string",
                        "description": "Article id, e.g. 'glyphs/anchors'"
                    }
                },
                "required": ["id"]
            }),
        },
        ToolDefinition {
            name: "handbook_info".to_string(),
            description: "Statistics for the live snapshot (documents, terms, generation, age) and the on-disk snapshot cache."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "handbook_reload".to_string(),
            description: "Rebuild the index from the handbook directory and swap it in. Searches in flight finish on the \
                previous snapshot. Use after articles were added or edited when the server runs without --watch."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
        ToolDefinition {
            name: "handbook_help".to_string(),
            description: "Query syntax guide with examples. Call this once before composing complex queries."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        },
    ]
}

/// State shared by every tool call.
pub struct HandlerContext {
    pub reloader: Arc<Reloader>,
    /// Snapshot cache directory (reported by `handbook_info`).
    pub index_base: PathBuf,
    /// Responses above this many bytes lose trailing results (0 = no limit).
    pub max_response_bytes: usize,
    pub started_at: Instant,
}

impl HandlerContext {
    pub fn new(reloader: Arc<Reloader>, index_base: PathBuf, max_response_bytes: usize) -> Self {
        Self { reloader, index_base, max_response_bytes, started_at: Instant::now() }
    }
}

/// Dispatch a tool call to the right handler.
pub fn dispatch_tool(ctx: &HandlerContext, tool_name: &str, arguments: &Value) -> ToolCallResult {
    let result = match tool_name {
        "handbook_search" => search::handle_handbook_search(ctx, arguments),
        "handbook_get" => document::handle_handbook_get(ctx, arguments),
        "handbook_info" => handle_handbook_info(ctx),
        "handbook_reload" => handle_handbook_reload(ctx),
        "handbook_help" => utils::json_result(&crate::guide::render_json()),
        _ => return ToolCallResult::error(format!("Unknown tool: {}", tool_name)),
    };

    if result.is_error {
        return result;
    }
    utils::truncate_response_if_needed(result, ctx.max_response_bytes)
}

// ─── Small inline handlers ──────────────────────────────────────────

fn handle_handbook_info(ctx: &HandlerContext) -> ToolCallResult {
    let snapshot = ctx.reloader.snapshots.current();
    let stats = snapshot.stats();
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);

    let output = json!({
        "corpus": ctx.reloader.source.describe(),
        "snapshot": stats,
        "ageSeconds": now.saturating_sub(stats.built_at),
        "reloading": ctx.reloader.is_reloading(),
        "uptimeSeconds": ctx.started_at.elapsed().as_secs(),
        "config": snapshot.config(),
        "cache": crate::cli::cmd_info_json(&ctx.index_base),
    });
    utils::json_result(&output)
}

fn handle_handbook_reload(ctx: &HandlerContext) -> ToolCallResult {
    match ctx.reloader.reload() {
        Ok(outcome) => {
            info!(generation = outcome.generation, documents = outcome.documents, "Snapshot reloaded via MCP");
            utils::json_result(&json!({
                "status": "ok",
                "generation": outcome.generation,
                "documents": outcome.documents,
                "terms": outcome.terms,
                "rebuildTimeMs": (outcome.elapsed_ms * 100.0).round() / 100.0,
            }))
        }
        Err(e) => ToolCallResult::error(e.to_string()),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod handlers_test_utils;

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
