//! Shared helpers for tool handlers: argument access, JSON output, and
//! response size limiting.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::mcp::protocol::ToolCallResult;

// ─── Arguments ──────────────────────────────────────────────────────

/// Optional string argument. Wrong types are reported, not ignored.
pub(crate) fn arg_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(format!("'{}' must be a string, got {}", key, other)),
    }
}

pub(crate) fn arg_bool(args: &Value, key: &str) -> Result<Option<bool>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(format!("'{}' must be a boolean, got {}", key, other)),
    }
}

/// Integer argument. Floats with no fractional part (`5.0`) are accepted;
/// anything else that is not an integer is an error.
pub(crate) fn arg_i64(args: &Value, key: &str) -> Result<Option<i64>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64()
                && f.fract() == 0.0
                && f.abs() < i64::MAX as f64
            {
                Ok(Some(f as i64))
            } else {
                Err(format!("'{}' must be an integer, got {}", key, n))
            }
        }
        Some(other) => Err(format!("'{}' must be an integer, got {}", key, other)),
    }
}

// ─── Output ─────────────────────────────────────────────────────────

/// Serialize `value` as the text content of a successful tool result.
pub(crate) fn json_result<T: Serialize>(value: &T) -> ToolCallResult {
    match serde_json::to_string(value) {
        Ok(text) => ToolCallResult::success(text),
        Err(e) => {
            error!(error = %e, "Failed to encode tool result");
            ToolCallResult::error(format!("Failed to encode result: {}", e))
        }
    }
}

// ─── Response size limiting ─────────────────────────────────────────

/// Keep a successful JSON response under `max_bytes` by dropping trailing
/// entries of its `results` array. Sets `summary.truncated`,
/// `summary.returned` and `summary.responseBytes`. Responses without a
/// `results` array, or with `max_bytes == 0`, pass through unchanged.
pub(crate) fn truncate_response_if_needed(result: ToolCallResult, max_bytes: usize) -> ToolCallResult {
    if max_bytes == 0 || result.is_error {
        return result;
    }
    let Some(text) = result.content.first().map(|c| c.text.as_str()) else {
        return result;
    };
    if text.len() <= max_bytes {
        return result;
    }
    let Ok(mut output) = serde_json::from_str::<Value>(text) else {
        return result;
    };
    let Some(total) = output.get("results").and_then(|r| r.as_array()).map(|r| r.len()) else {
        return result;
    };

    let mut kept = total;
    let mut encoded = text.len();
    while kept > 0 && encoded > max_bytes {
        kept -= 1;
        if let Some(results) = output.get_mut("results").and_then(|r| r.as_array_mut()) {
            results.truncate(kept);
        }
        mark_truncated(&mut output, kept, encoded);
        encoded = output.to_string().len();
    }
    mark_truncated(&mut output, kept, encoded);
    debug!(original_bytes = text.len(), bytes = encoded, dropped = total - kept, "Response truncated");
    json_result(&output)
}

fn mark_truncated(output: &mut Value, returned: usize, bytes: usize) {
    if let Some(summary) = output.get_mut("summary").and_then(|s| s.as_object_mut()) {
        summary.insert("truncated".to_string(), json!(true));
        summary.insert("returned".to_string(), json!(returned));
        summary.insert("responseBytes".to_string(), json!(bytes));
    } else if let Some(obj) = output.as_object_mut() {
        obj.insert("truncated".to_string(), json!(true));
    }
}
