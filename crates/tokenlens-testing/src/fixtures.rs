use anyhow::Result;
use serde_json::{Value, json};
use std::path::Path;
use tempfile::NamedTempFile;

/// Builds a JSONL transcript line by line, in the shapes the agent runtime
/// writes them.
#[derive(Debug, Default)]
pub struct TranscriptBuilder {
    lines: Vec<String>,
}

impl TranscriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pre-serialized line verbatim (useful for malformed input).
    pub fn raw_line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn record(mut self, value: Value) -> Self {
        self.lines.push(value.to_string());
        self
    }

    pub fn user(self, ts: &str, uuid: &str, text: &str) -> Self {
        self.record(json!({
            "type": "user",
            "timestamp": ts,
            "uuid": uuid,
            "message": {"role": "user", "content": text},
        }))
    }

    pub fn sidechain_user(self, ts: &str, uuid: &str, parent: Option<&str>, text: &str) -> Self {
        self.record(json!({
            "type": "user",
            "timestamp": ts,
            "uuid": uuid,
            "parentUuid": parent,
            "isSidechain": true,
            "message": {"role": "user", "content": text},
        }))
    }

    pub fn assistant_text(
        self,
        ts: &str,
        uuid: &str,
        message_id: &str,
        text: &str,
        usage: Value,
    ) -> Self {
        self.record(json!({
            "type": "assistant",
            "timestamp": ts,
            "uuid": uuid,
            "message": {
                "id": message_id,
                "role": "assistant",
                "content": [{"type": "text", "text": text}],
            },
            "usage": usage,
        }))
    }

    pub fn assistant_tool_use(
        self,
        ts: &str,
        uuid: &str,
        message_id: &str,
        tool_use: Value,
        usage: Value,
    ) -> Self {
        self.record(json!({
            "type": "assistant",
            "timestamp": ts,
            "uuid": uuid,
            "message": {
                "id": message_id,
                "role": "assistant",
                "content": [tool_use],
            },
            "usage": usage,
        }))
    }

    pub fn sidechain_assistant_text(
        self,
        ts: &str,
        uuid: &str,
        parent: Option<&str>,
        message_id: &str,
        text: &str,
        usage: Value,
    ) -> Self {
        self.record(json!({
            "type": "assistant",
            "timestamp": ts,
            "uuid": uuid,
            "parentUuid": parent,
            "isSidechain": true,
            "message": {
                "id": message_id,
                "role": "assistant",
                "content": [{"type": "text", "text": text}],
            },
            "usage": usage,
        }))
    }

    pub fn tool_result(self, ts: &str, uuid: &str, tool_use_id: &str, payload: Value) -> Self {
        self.record(json!({
            "type": "user",
            "timestamp": ts,
            "uuid": uuid,
            "message": {
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": tool_use_id, "content": payload}],
            },
        }))
    }

    /// Serialize all accumulated lines.
    pub fn to_jsonl(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_jsonl())?;
        Ok(())
    }

    /// Write into a fresh temp file kept alive by the returned handle.
    pub fn into_temp_file(self) -> Result<NamedTempFile> {
        let file = NamedTempFile::new()?;
        self.write_to(file.path())?;
        Ok(file)
    }
}

/// Generate a deterministic session ID based on test name and label.
pub fn fixture_session_id(test_name: &str, label: &str) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(test_name.as_bytes());
    hasher.update(label.as_bytes());
    let hash = hasher.finalize();

    format!(
        "test-session-{:016x}",
        u64::from_be_bytes([
            hash[0], hash[1], hash[2], hash[3], hash[4], hash[5], hash[6], hash[7]
        ])
    )
}

/// Generate a unique session ID for tests needing isolation.
pub fn unique_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_session_id_deterministic() {
        let a = fixture_session_id("t", "one");
        let b = fixture_session_id("t", "one");
        assert_eq!(a, b);
        assert_ne!(a, fixture_session_id("t", "two"));
    }

    #[test]
    fn test_builder_emits_one_line_per_record() {
        let jsonl = TranscriptBuilder::new()
            .user("1970-01-01T00:00:01Z", "u1", "hi")
            .assistant_text(
                "1970-01-01T00:00:02Z",
                "a1",
                "m1",
                "hello",
                serde_json::json!({"output_tokens": 3}),
            )
            .to_jsonl();
        assert_eq!(jsonl.lines().count(), 2);
        for line in jsonl.lines() {
            assert!(serde_json::from_str::<Value>(line).is_ok());
        }
    }
}
