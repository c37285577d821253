use redis::Commands;
use std::sync::Mutex;
use std::time::Duration;

/// Read-side seam over the ephemeral key-value store. The engine only ever
/// scans and reads; hook executables own the write side.
pub trait KvRead {
    /// Keys matching a glob-style pattern. Empty on any transport error.
    fn scan_keys(&self, pattern: &str) -> Vec<String>;

    /// UTF-8 value at `key`, or `None` when absent or unreadable.
    fn get_string(&self, key: &str) -> Option<String>;
}

/// Redis-backed store handle. Construction and every read degrade to empty
/// results; an unreachable store is indistinguishable from an empty one.
pub struct RedisStore {
    conn: Mutex<redis::Connection>,
}

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

impl RedisStore {
    /// Connect to the default local store.
    pub fn connect_default() -> Option<RedisStore> {
        Self::connect("redis://127.0.0.1:6379/")
    }

    pub fn connect(url: &str) -> Option<RedisStore> {
        let client = redis::Client::open(url).ok()?;
        let conn = client.get_connection_with_timeout(CONNECT_TIMEOUT).ok()?;
        Some(RedisStore {
            conn: Mutex::new(conn),
        })
    }
}

impl KvRead for RedisStore {
    fn scan_keys(&self, pattern: &str) -> Vec<String> {
        let Ok(mut conn) = self.conn.lock() else {
            return Vec::new();
        };
        match conn.scan_match::<_, String>(pattern) {
            Ok(iter) => iter.collect(),
            Err(_) => Vec::new(),
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        let Ok(mut conn) = self.conn.lock() else {
            return None;
        };
        conn.get::<_, Option<String>>(key).ok().flatten()
    }
}
