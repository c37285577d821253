use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

/// Memoizes derived values keyed by `(logical key, path)`, invalidated when
/// the file's modification time changes. If the file cannot be stat'd the
/// compute still runs but the result is not cached.
pub struct MtimeCache<V> {
    entries: Mutex<HashMap<(String, PathBuf), (V, SystemTime)>>,
}

impl<V: Clone> MtimeCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value while the file's mtime is unchanged;
    /// otherwise run `compute` and store the result with the current mtime.
    pub fn get(&self, key: &str, path: &Path, compute: impl FnOnce() -> V) -> V {
        let mtime = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(mtime) => mtime,
            Err(_) => return compute(),
        };

        let map_key = (key.to_string(), path.to_path_buf());
        {
            let entries = self.entries.lock().expect("mtime cache lock poisoned");
            if let Some((value, cached_mtime)) = entries.get(&map_key)
                && *cached_mtime == mtime
            {
                return value.clone();
            }
        }

        // Compute outside the lock; the last writer wins on a race.
        let value = compute();
        let mut entries = self.entries.lock().expect("mtime cache lock poisoned");
        entries.insert(map_key, (value.clone(), mtime));
        value
    }

    /// Drop every entry stored under the logical key, regardless of path.
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().expect("mtime cache lock poisoned");
        entries.retain(|(k, _), _| k != key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().expect("mtime cache lock poisoned");
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("mtime cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for MtimeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
