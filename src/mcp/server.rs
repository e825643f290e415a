//! JSON-RPC loop over line-delimited stdio.

use std::io::{self, BufRead, Write};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::mcp::handlers::{self, HandlerContext};
use crate::mcp::protocol::*;

/// Run the MCP server on stdin/stdout until stdin closes.
pub fn run_server(ctx: HandlerContext) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    info!(
        generation = ctx.reloader.snapshots.generation(),
        "MCP server ready, waiting for JSON-RPC requests on stdin"
    );
    serve_lines(&ctx, stdin.lock(), stdout.lock());
    info!("stdin closed, shutting down");
}

/// One request per line in, one response per line out.
pub fn serve_lines<R: BufRead, W: Write>(ctx: &HandlerContext, reader: R, mut writer: W) {
    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!(error = %e, "Error reading stdin");
                break;
            }
        };

        let Some(response) = handle_line(ctx, &line) else {
            continue;
        };
        debug!(response_bytes = response.len(), "Outgoing JSON-RPC");
        if writeln!(writer, "{}", response).and_then(|_| writer.flush()).is_err() {
            error!("stdout closed, shutting down");
            break;
        }
    }
}

/// Handle one raw input line. `None` means nothing to send back
/// (blank line or notification).
pub(crate) fn handle_line(ctx: &HandlerContext, line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    debug!(request = %line, "Incoming JSON-RPC");

    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "Failed to parse JSON-RPC request");
            let err = JsonRpcErrorResponse::new(Value::Null, PARSE_ERROR, format!("Parse error: {}", e));
            return Some(encode(&err));
        }
    };

    // Notifications carry no id and get no response.
    let Some(id) = request.id else {
        debug!(method = %request.method, "Received notification");
        return None;
    };

    let response = handle_request(ctx, &request.method, request.params.as_ref(), id);
    Some(response.to_string())
}

fn encode<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode response");
        String::from(r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error"}}"#)
    })
}

fn to_json<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        error!(error = %e, "Failed to encode result");
        Value::Null
    })
}

fn respond<T: Serialize>(id: Value, result: &T) -> Value {
    to_json(&JsonRpcResponse::new(id, to_json(result)))
}

pub(crate) fn handle_request(ctx: &HandlerContext, method: &str, params: Option<&Value>, id: Value) -> Value {
    match method {
        "initialize" => respond(id, &InitializeResult::new()),
        "tools/list" => respond(id, &ToolsListResult { tools: handlers::tool_definitions() }),
        "tools/call" => {
            let Some(params) = params else {
                return respond(id, &ToolCallResult::error("Missing params".to_string()));
            };
            let tool_name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            debug!(tool = tool_name, "Tool call");
            respond(id, &handlers::dispatch_tool(ctx, tool_name, &arguments))
        }
        "ping" => respond(id, &json!({})),
        _ => to_json(&JsonRpcErrorResponse::new(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::handlers::handlers_test_utils::make_ctx;

    #[test]
    fn test_handle_initialize() {
        let ctx = make_ctx();
        let result = handle_request(&ctx, "initialize", None, json!(1));
        assert_eq!(result["jsonrpc"], "2.0");
        assert_eq!(result["id"], 1);
        assert_eq!(result["result"]["protocolVersion"], "2025-03-26");
        assert_eq!(result["result"]["serverInfo"]["name"], "handbook-search");
    }

    #[test]
    fn test_handle_tools_list() {
        let ctx = make_ctx();
        let result = handle_request(&ctx, "tools/list", None, json!(2));
        let tools = result["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(
            names,
            vec!["handbook_search", "handbook_get", "handbook_info", "handbook_reload", "handbook_help"]
        );
    }

    #[test]
    fn test_handle_tools_call_search() {
        let ctx = make_ctx();
        let params = json!({ "name": "handbook_search", "arguments": { "query": "anchors" } });
        let result = handle_request(&ctx, "tools/call", Some(&params), json!(3));
        assert_eq!(result["id"], 3);
        let content = result["result"]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        let body: Value = serde_json::from_str(content[0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(body["results"][0]["id"], "glyphs/anchors");
    }

    #[test]
    fn test_handle_unknown_method() {
        let ctx = make_ctx();
        let result = handle_request(&ctx, "unknown/method", None, json!(99));
        assert_eq!(result["id"], 99);
        assert_eq!(result["error"]["code"], -32601);
        assert!(result["error"]["message"].as_str().unwrap().contains("unknown/method"));
    }

    #[test]
    fn test_handle_ping() {
        let ctx = make_ctx();
        let result = handle_request(&ctx, "ping", None, json!(42));
        assert_eq!(result["id"], 42);
        assert!(result["result"].is_object());
    }

    #[test]
    fn test_handle_tools_call_missing_params() {
        let ctx = make_ctx();
        let result = handle_request(&ctx, "tools/call", None, json!(5));
        assert_eq!(result["result"]["isError"], true);
        assert!(result["result"]["content"][0]["text"].as_str().unwrap().contains("Missing params"));
    }

    #[test]
    fn test_parse_error_line() {
        let ctx = make_ctx();
        let out = handle_line(&ctx, "{not json").unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["error"]["code"], -32700);
        assert!(v["id"].is_null());
    }

    #[test]
    fn test_notification_and_blank_lines_are_silent() {
        let ctx = make_ctx();
        assert!(handle_line(&ctx, "   ").is_none());
        assert!(handle_line(&ctx, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).is_none());
    }

    #[test]
    fn test_serve_lines_one_response_per_request() {
        let ctx = make_ctx();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let mut out = Vec::new();
        serve_lines(&ctx, input.as_bytes(), &mut out);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: Value = serde_json::from_str(lines[0]).unwrap();
        let second: Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
    }
}
