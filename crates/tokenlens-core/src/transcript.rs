use chrono::DateTime;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tokenlens_types::{Content, Usage};

use crate::path::resolve;
use crate::tail;

/// How many tail lines `last_matching` scans before falling back to a full
/// forward pass.
const FAST_PATH_LINES: usize = 100;

/// One transcript line, held raw for fidelity. Accessors project the shapes
/// the pipeline needs and tolerate drift across runtime versions.
#[derive(Debug, Clone)]
pub struct Record {
    raw: Value,
}

impl Record {
    /// Parse a single JSONL line. Only JSON objects qualify; anything else
    /// is a malformed record.
    pub fn parse(line: &str) -> Option<Record> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let raw: Value = serde_json::from_str(trimmed).ok()?;
        raw.is_object().then_some(Record { raw })
    }

    pub fn from_value(raw: Value) -> Option<Record> {
        raw.is_object().then_some(Record { raw })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// First non-null of `message.id`, `id`, `uuid`.
    pub fn id(&self) -> Option<&str> {
        self.message_id()
            .or_else(|| self.raw.get("id").and_then(Value::as_str))
            .or_else(|| self.uuid())
    }

    pub fn uuid(&self) -> Option<&str> {
        self.raw.get("uuid").and_then(Value::as_str)
    }

    pub fn parent_uuid(&self) -> Option<&str> {
        self.raw.get("parentUuid").and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.raw.get("sessionId").and_then(Value::as_str)
    }

    /// Epoch milliseconds parsed from the ISO 8601 `timestamp`, or 0.
    pub fn timestamp_ms(&self) -> i64 {
        self.raw
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0)
    }

    /// First non-null of top-level `usage` or `message.usage`.
    pub fn usage(&self) -> Option<Usage> {
        let value = self
            .raw
            .get("usage")
            .filter(|v| !v.is_null())
            .or_else(|| self.raw.get("message").and_then(|m| m.get("usage")))
            .filter(|v| !v.is_null())?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_sidechain(&self) -> bool {
        self.raw
            .get("isSidechain")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Top-level `type` discriminator.
    pub fn record_type(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }

    pub fn message_role(&self) -> Option<&str> {
        self.raw
            .get("message")
            .and_then(|m| m.get("role"))
            .and_then(Value::as_str)
    }

    pub fn message_id(&self) -> Option<&str> {
        self.raw
            .get("message")
            .and_then(|m| m.get("id"))
            .and_then(Value::as_str)
    }

    /// Raw `message.content`, falling back to top-level `content` for system
    /// records that carry it there.
    pub fn content_value(&self) -> Option<&Value> {
        self.raw
            .get("message")
            .and_then(|m| m.get("content"))
            .or_else(|| self.raw.get("content"))
    }

    /// Normalized content view.
    pub fn content(&self) -> Content {
        self.content_value()
            .map(Content::from_value)
            .unwrap_or(Content::Parts(Vec::new()))
    }

    /// `toolUseID` hint carried by system records.
    pub fn tool_use_id_hint(&self) -> Option<&str> {
        self.raw.get("toolUseID").and_then(Value::as_str)
    }
}

/// Load a whole transcript. Malformed lines are discarded silently; a
/// missing or unreadable file yields an empty vector. Intended for small
/// files; use `stream` for anything larger.
pub fn parse_all(path: &Path) -> Vec<Record> {
    let path = resolve(path);
    let Ok(text) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    text.lines().filter_map(Record::parse).collect()
}

/// Stream a transcript line by line without materializing the file. The
/// visitor's `Some` results are collected; `None` skips the record.
pub fn stream<T>(path: &Path, mut visitor: impl FnMut(Record) -> Option<T>) -> Vec<T> {
    let path = resolve(path);
    let Ok(file) = File::open(&path) else {
        return Vec::new();
    };
    let reader = BufReader::new(file);
    let mut out = Vec::new();
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if let Some(record) = Record::parse(&line)
            && let Some(value) = visitor(record)
        {
            out.push(value);
        }
    }
    out
}

/// Find the most recent record matching `predicate`. The fast path scans up
/// to 100 tail lines via the reverse reader; if nothing matches there (or
/// the fast path fails), a full forward scan keeps the last match.
pub fn last_matching(path: &Path, predicate: impl Fn(&Record) -> bool) -> Option<Record> {
    let resolved = resolve(path);

    for line in tail::last_lines(&resolved, FAST_PATH_LINES) {
        if let Some(record) = Record::parse(&line)
            && predicate(&record)
        {
            return Some(record);
        }
    }

    stream(&resolved, |record| predicate(&record).then_some(record))
        .into_iter()
        .next_back()
}
