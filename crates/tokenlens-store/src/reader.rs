use serde::{Deserialize, Serialize};
use serde_json::Value;

use tokenlens_types::Usage;

use crate::kv::KvRead;

/// Record written by the pre-invocation hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookRequest {
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Record written by the post-invocation hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookResponse {
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub response: Value,
    #[serde(default)]
    pub response_size: Option<usize>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub sequence: Option<u64>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A joined request/response pair (either side may be missing).
#[derive(Debug, Clone)]
pub struct HookOperation {
    pub session_id: String,
    pub tool: String,
    /// Epoch milliseconds taken from the store key.
    pub timestamp: i64,
    pub sequence: Option<u64>,
    pub params: Value,
    pub response: Value,
    pub response_size: usize,
    pub message_id: Option<String>,
    pub usage: Option<Usage>,
}

/// Read and join every hook operation recorded for a session. A missing or
/// unreachable store yields an empty list, never an error. An 8-character
/// session id that matches nothing retries as a prefix.
pub fn session_operations(kv: &dyn KvRead, session_id: &str) -> Vec<HookOperation> {
    let mut keys = kv.scan_keys(&format!("session:{session_id}:operations:*"));
    if keys.is_empty() && session_id.len() == 8 {
        keys = kv.scan_keys(&format!("session:{session_id}*:operations:*"));
    }

    let mut requests: Vec<(String, i64, HookRequest)> = Vec::new();
    let mut responses: Vec<(String, i64, HookResponse)> = Vec::new();

    for key in keys {
        let Some((sid, timestamp, kind)) = parse_operation_key(&key) else {
            continue;
        };
        let Some(raw) = kv.get_string(&key) else {
            continue;
        };
        match kind {
            "request" => {
                if let Ok(request) = serde_json::from_str::<HookRequest>(&raw) {
                    requests.push((sid.to_string(), timestamp, request));
                }
            }
            "response" => {
                if let Ok(mut response) = serde_json::from_str::<HookResponse>(&raw) {
                    response.response = resolve_spillover(response.response);
                    responses.push((sid.to_string(), timestamp, response));
                }
            }
            _ => {}
        }
    }

    join_operations(requests, responses)
}

/// Split `session:{id}:operations:{epoch_ms}:{kind}` into its parts.
fn parse_operation_key(key: &str) -> Option<(&str, i64, &str)> {
    let rest = key.strip_prefix("session:")?;
    let (sid, rest) = rest.split_once(":operations:")?;
    let (timestamp, kind) = rest.split_once(':')?;
    Some((sid, timestamp.parse().ok()?, kind))
}

/// Join requests and responses. The `sequence` key is authoritative; the
/// key timestamp is the legacy fallback for records lacking one. Unpaired
/// records still surface as operations.
fn join_operations(
    requests: Vec<(String, i64, HookRequest)>,
    mut responses: Vec<(String, i64, HookResponse)>,
) -> Vec<HookOperation> {
    let mut operations = Vec::new();

    for (sid, timestamp, request) in requests {
        let matched = responses
            .iter()
            .position(|(rsid, _, r)| {
                *rsid == sid
                    && r.sequence.is_some()
                    && request.sequence.is_some()
                    && r.sequence == request.sequence
            })
            .or_else(|| {
                responses
                    .iter()
                    .position(|(rsid, rts, r)| *rsid == sid && *rts == timestamp && r.sequence.is_none())
            });

        let response = matched.map(|i| responses.remove(i));
        let (response_value, response_size, message_id, usage, response_tool) = match response {
            Some((_, _, r)) => {
                let size = r
                    .response_size
                    .unwrap_or_else(|| serialized_len(&r.response));
                (r.response, size, r.message_id, r.usage, r.tool)
            }
            None => (Value::Null, 0, None, None, None),
        };

        operations.push(HookOperation {
            session_id: sid,
            tool: request
                .tool
                .or(response_tool)
                .unwrap_or_else(|| "unknown".to_string()),
            timestamp: request.timestamp.unwrap_or(timestamp),
            sequence: request.sequence,
            params: request.params,
            response: response_value,
            response_size,
            message_id,
            usage,
        });
    }

    // Orphaned responses (request key expired or never written).
    for (sid, timestamp, r) in responses {
        let size = r
            .response_size
            .unwrap_or_else(|| serialized_len(&r.response));
        operations.push(HookOperation {
            session_id: sid,
            tool: r.tool.unwrap_or_else(|| "unknown".to_string()),
            timestamp,
            sequence: r.sequence,
            params: Value::Null,
            response: r.response,
            response_size: size,
            message_id: r.message_id,
            usage: r.usage,
        });
    }

    operations.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.sequence.cmp(&b.sequence))
    });
    operations
}

fn serialized_len(value: &Value) -> usize {
    if value.is_null() {
        0
    } else {
        serde_json::to_string(value).map(|s| s.len()).unwrap_or(0)
    }
}

/// Responses too large for the store are spilled to a companion file and
/// referenced by a `file://` URL. Dereference lazily; an unreadable file
/// leaves a sentinel in place of the payload.
fn resolve_spillover(response: Value) -> Value {
    let Value::String(ref s) = response else {
        return response;
    };
    let Some(path) = s.strip_prefix("file://") else {
        return response;
    };

    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text),
        },
        Err(_) => Value::String(format!("[response stored in file: {path} (unreadable)]")),
    }
}
