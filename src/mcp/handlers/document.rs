//! `handbook_get` handler.

use serde_json::{json, Value};

use super::utils::{arg_str, json_result};
use super::HandlerContext;
use crate::mcp::protocol::ToolCallResult;

pub(crate) fn handle_handbook_get(ctx: &HandlerContext, args: &Value) -> ToolCallResult {
    let id = match arg_str(args, "id") {
        Ok(Some(id)) => id,
        Ok(None) => return ToolCallResult::error("Missing required parameter: id".to_string()),
        Err(e) => return ToolCallResult::error(e),
    };

    let snapshot = ctx.reloader.snapshots.current();
    match snapshot.store().get(id) {
        Some(doc) => json_result(&json!({
            "id": doc.id,
            "title": doc.title,
            "path": doc.source_path,
            "body": doc.body,
            "generation": snapshot.generation(),
        })),
        None => ToolCallResult::error(format!(
            "Article '{}' not found. Use handbook_search to find valid ids.",
            id
        )),
    }
}
