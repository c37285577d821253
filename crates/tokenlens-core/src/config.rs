use std::path::{Path, PathBuf};

use tokenlens_types::{AUTO_COMPACT_LIMIT, NO_AUTO_COMPACT_LIMIT};

/// Token-limit configuration read from the agent's settings file. The single
/// recognized option is `autoCompactEnabled`; everything else in the file is
/// ignored. Any read or parse failure falls back to the default (enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenConfig {
    pub auto_compact_enabled: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            auto_compact_enabled: true,
        }
    }
}

impl TokenConfig {
    /// Load from the default settings location (`~/.claude/settings.json`).
    pub fn load() -> Self {
        match settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit settings file.
    pub fn load_from(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
            return Self::default();
        };
        Self {
            auto_compact_enabled: value
                .get("autoCompactEnabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
        }
    }

    /// The usable context limit under this configuration.
    pub fn context_limit(&self) -> u64 {
        if self.auto_compact_enabled {
            AUTO_COMPACT_LIMIT
        } else {
            NO_AUTO_COMPACT_LIMIT
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude").join("settings.json"))
}
