use std::collections::BTreeMap;
use std::sync::Mutex;

use tokenlens_store::KvRead;

/// In-memory stand-in for the hook store. Supports the glob subset the
/// reader issues: literal segments separated by `*`.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .lock()
            .expect("memory kv lock poisoned")
            .insert(key.into(), value.into());
    }

    /// Seed a request/response pair under the hook-store key layout.
    pub fn insert_operation(
        &self,
        session_id: &str,
        epoch_ms: i64,
        request: &serde_json::Value,
        response: Option<&serde_json::Value>,
    ) {
        self.insert(
            format!("session:{session_id}:operations:{epoch_ms}:request"),
            request.to_string(),
        );
        if let Some(response) = response {
            self.insert(
                format!("session:{session_id}:operations:{epoch_ms}:response"),
                response.to_string(),
            );
        }
    }
}

impl KvRead for MemoryKv {
    fn scan_keys(&self, pattern: &str) -> Vec<String> {
        self.entries
            .lock()
            .expect("memory kv lock poisoned")
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect()
    }

    fn get_string(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .expect("memory kv lock poisoned")
            .get(key)
            .cloned()
    }
}

fn glob_match(pattern: &str, key: &str) -> bool {
    let mut remainder = key;
    let mut segments = pattern.split('*').peekable();
    let mut first = true;
    while let Some(segment) = segments.next() {
        if first {
            if !remainder.starts_with(segment) {
                return false;
            }
            remainder = &remainder[segment.len()..];
            first = false;
            continue;
        }
        if segments.peek().is_none() && segment.is_empty() {
            return true;
        }
        match remainder.find(segment) {
            Some(idx) => remainder = &remainder[idx + segment.len()..],
            None => return false,
        }
    }
    remainder.is_empty()
}
