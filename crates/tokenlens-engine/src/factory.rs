use serde_json::Value;

use tokenlens_core::Record;
use tokenlens_types::{Allocation, Content, OpTool, Operation, estimate_tokens, snippet, truncate};

/// Gap beyond which a tool call is flagged as having lost its prompt cache.
const CACHE_EXPIRY_SECONDS: f64 = 300.0;

/// Display snippet length for user prompts and tool results.
const DETAIL_SNIPPET_CHARS: usize = 50;

/// Command truncation width in bash details.
const COMMAND_DETAIL_CHARS: usize = 30;

/// Summarize a tool invocation's arguments for display: file tools show the
/// basename, bash the truncated command, search tools the pattern; anything
/// else falls back to the tool name.
pub fn summarize_tool(name: &str, input: &Value) -> String {
    match name.to_lowercase().as_str() {
        "read" | "write" | "edit" => input
            .get("file_path")
            .and_then(Value::as_str)
            .map(basename)
            .unwrap_or_else(|| name.to_string()),
        "bash" => input
            .get("command")
            .and_then(Value::as_str)
            .map(|cmd| truncate(cmd, COMMAND_DETAIL_CHARS))
            .unwrap_or_else(|| name.to_string()),
        "glob" | "grep" => input
            .get("pattern")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| name.to_string()),
        _ => name.to_string(),
    }
}

fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Full tool-call detail line, decorated when the gap since the previous
/// message exceeds the cache TTL.
fn format_tool_call(name: &str, input: &Value, time_gap_seconds: f64) -> String {
    let summary = summarize_tool(name, input);
    let base = if summary == name {
        name.to_string()
    } else {
        format!("{name}: {summary}")
    };
    if time_gap_seconds > CACHE_EXPIRY_SECONDS {
        format!("⚠️ {base} (cache expired)")
    } else {
        base
    }
}

fn serialized_len(value: &Value) -> usize {
    match value {
        Value::Null => 0,
        Value::String(s) => s.len(),
        other => serde_json::to_string(other).map(|s| s.len()).unwrap_or(0),
    }
}

fn base_operation(tool: OpTool, record: &Record, session_id: &str, time_gap: f64) -> Operation {
    let message_id = record.id().unwrap_or_default().to_string();
    let mut op = Operation::new(
        tool,
        message_id,
        session_id.to_string(),
        record.timestamp_ms(),
    );
    op.time_gap_seconds = time_gap;
    op.is_sidechain = record.is_sidechain();
    op
}

/// System context record: estimated from the serialized content length.
pub(crate) fn build_system(record: &Record, session_id: &str, time_gap: f64) -> Operation {
    let mut op = base_operation(OpTool::System, record, session_id, time_gap);
    let content = record.content_value().cloned().unwrap_or(Value::Null);
    op.response_size = serialized_len(&content);
    op.tokens = estimate_tokens(op.response_size);
    op.allocation = Allocation::Estimated;
    op.tool_use_id = record.tool_use_id_hint().map(str::to_string);

    let text = record.content().plain_text();
    op.details = if text.is_empty() {
        "system".to_string()
    } else {
        snippet(&text, DETAIL_SNIPPET_CHARS)
    };
    op.response = content;
    op
}

/// Plain user prompt (no tool_result parts at the front).
pub(crate) fn build_user(record: &Record, session_id: &str, time_gap: f64) -> Operation {
    let mut op = base_operation(OpTool::User, record, session_id, time_gap);
    let text = record.content().plain_text();
    op.tokens = estimate_tokens(text.len());
    op.allocation = Allocation::Estimated;
    op.details = snippet(&text, DETAIL_SNIPPET_CHARS);
    op.response_size = text.len();
    op.response = Value::String(text);
    op
}

/// User-role record whose first content part is a `tool_result`.
pub(crate) fn build_tool_response(record: &Record, session_id: &str, time_gap: f64) -> Operation {
    let mut op = base_operation(OpTool::ToolResponse, record, session_id, time_gap);

    let (tool_use_id, payload) = match record.content().first_tool_result() {
        Some((id, payload)) => (Some(id.to_string()), payload.clone()),
        None => (None, Value::Null),
    };

    op.tool_use_id = tool_use_id;
    op.response_size = serialized_len(&payload);
    op.tokens = estimate_tokens(op.response_size);
    op.allocation = Allocation::Estimated;
    op.details = snippet(&payload_text(&payload), DETAIL_SNIPPET_CHARS);
    op.response = payload;
    op
}

fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => Content::from_value(other).plain_text(),
    }
}

/// Assistant turn with a usage object: exact token attribution.
pub(crate) fn build_assistant(
    record: &Record,
    session_id: &str,
    time_gap: f64,
    content_part_index: Option<usize>,
) -> Operation {
    let mut op = base_operation(OpTool::Assistant, record, session_id, time_gap);
    let usage = record.usage().unwrap_or_default();

    op.context_growth = usage.context_growth();
    op.generation_cost = usage.generation_cost();
    op.tokens = if op.context_growth > 0 {
        op.context_growth
    } else {
        op.generation_cost
    };
    op.cache_efficiency = usage.cache_efficiency();
    op.ephemeral_5m = usage.ephemeral_5m();
    op.ephemeral_1h = usage.ephemeral_1h();
    op.allocation = Allocation::Exact;
    op.content_part_index = content_part_index;

    let content = record.content();
    op.details = match content.first_tool_use() {
        Some((id, name, input)) => {
            op.tool_use_id = Some(id.to_string());
            format_tool_call(name, input, time_gap)
        }
        None => "message".to_string(),
    };

    let raw_content = record.content_value().cloned().unwrap_or(Value::Null);
    op.response_size = serialized_len(&raw_content);
    op.response = raw_content;
    op
}
