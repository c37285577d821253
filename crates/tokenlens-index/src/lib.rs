//! Enumerates agent transcripts under the per-user projects root.
//!
//! Directory names and session identifiers are restricted to
//! `[A-Za-z0-9_-]` before any path is joined; entries failing the filter are
//! skipped entirely.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

static SAFE_DIR_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

/// One discovered transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEntry {
    pub session_id: String,
    pub project_dir_name: String,
    pub full_path: PathBuf,
    pub mtime: Option<SystemTime>,
}

/// Strip every character outside `[A-Za-z0-9_-]`. Applied to caller input
/// before any filesystem lookup.
pub fn sanitize_session_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Resolve the projects root. `CLAUDE_CONFIG_DIR` overrides; otherwise the
/// classic and XDG locations are probed in order, a candidate validating
/// only if some subdirectory holds a `.jsonl`. Falls back to the classic
/// location when nothing validates.
pub fn projects_root() -> PathBuf {
    if let Ok(config_dir) = std::env::var("CLAUDE_CONFIG_DIR")
        && !config_dir.is_empty()
    {
        return PathBuf::from(config_dir).join("projects");
    }

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let classic = home.join(".claude").join("projects");
    let candidates = [
        classic.clone(),
        home.join(".config").join("claude").join("projects"),
    ];

    candidates
        .into_iter()
        .find(|c| holds_transcripts(c))
        .unwrap_or(classic)
}

fn holds_transcripts(root: &Path) -> bool {
    if !root.is_dir() {
        return false;
    }
    WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| is_transcript_name(&e.file_name().to_string_lossy()))
}

fn is_transcript_name(name: &str) -> bool {
    name.ends_with(".jsonl") && !name.ends_with(".save")
}

/// List every transcript under the root, most recently modified first.
/// Unreadable entries and unsafely-named directories are skipped.
pub fn list_sessions(root: &Path) -> Vec<SessionEntry> {
    let mut entries: Vec<SessionEntry> = WalkDir::new(root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let path = entry.path();
            if !path.is_file() {
                return None;
            }

            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !is_transcript_name(&file_name) {
                return None;
            }

            let project_dir_name = path.parent()?.file_name()?.to_string_lossy().into_owned();
            if !SAFE_DIR_NAME.is_match(&project_dir_name) {
                return None;
            }

            let stem = file_name.trim_end_matches(".jsonl");
            Some(SessionEntry {
                session_id: sanitize_session_id(stem),
                project_dir_name,
                full_path: path.to_path_buf(),
                mtime: entry.metadata().ok().and_then(|m| m.modified().ok()),
            })
        })
        .collect();

    entries.sort_by(|a, b| b.mtime.cmp(&a.mtime).then_with(|| a.full_path.cmp(&b.full_path)));
    entries
}

/// Resolve a session id (or an 8-char prefix of one) to its transcript.
/// The query is sanitized before any comparison.
pub fn find_session(root: &Path, query: &str) -> Option<SessionEntry> {
    let query = sanitize_session_id(query);
    if query.is_empty() {
        return None;
    }

    let entries = list_sessions(root);
    if let Some(exact) = entries.iter().find(|e| e.session_id == query) {
        return Some(exact.clone());
    }
    if query.len() == 8 {
        return entries
            .iter()
            .find(|e| e.session_id.starts_with(&query))
            .cloned();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, "{}\n").unwrap();
    }

    #[test]
    fn test_sanitize_strips_path_traversal() {
        assert_eq!(sanitize_session_id("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_session_id("abc-123_XYZ"), "abc-123_XYZ");
        assert_eq!(sanitize_session_id("a b:c"), "abc");
    }

    #[test]
    fn test_list_sessions_finds_jsonl_only() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("my-project");
        fs::create_dir(&project).unwrap();
        touch(&project.join("sess-1.jsonl"));
        touch(&project.join("sess-1.jsonl.save"));
        touch(&project.join("notes.txt"));

        let entries = list_sessions(root.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_id, "sess-1");
        assert_eq!(entries[0].project_dir_name, "my-project");
    }

    #[test]
    fn test_unsafe_project_dir_names_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        let bad = root.path().join("evil.dir");
        fs::create_dir(&bad).unwrap();
        touch(&bad.join("sess.jsonl"));

        let good = root.path().join("ok_dir");
        fs::create_dir(&good).unwrap();
        touch(&good.join("sess.jsonl"));

        let entries = list_sessions(root.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].project_dir_name, "ok_dir");
    }

    #[test]
    fn test_missing_root_is_empty() {
        assert!(list_sessions(Path::new("/nonexistent/projects")).is_empty());
    }

    #[test]
    fn test_find_session_exact_and_prefix() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("proj");
        fs::create_dir(&project).unwrap();
        touch(&project.join("abcd1234-ef56-7890.jsonl"));

        let exact = find_session(root.path(), "abcd1234-ef56-7890").unwrap();
        assert_eq!(exact.session_id, "abcd1234-ef56-7890");

        let prefixed = find_session(root.path(), "abcd1234").unwrap();
        assert_eq!(prefixed.session_id, "abcd1234-ef56-7890");

        assert!(find_session(root.path(), "zzzz9999").is_none());
    }

    #[test]
    fn test_find_session_sanitizes_before_lookup() {
        let root = tempfile::tempdir().unwrap();
        let project = root.path().join("proj");
        fs::create_dir(&project).unwrap();
        touch(&project.join("abcd1234-ef56.jsonl"));

        // Dots and slashes are stripped, so the remainder matches exactly.
        let found = find_session(root.path(), "abcd1234-ef56/../").unwrap();
        assert_eq!(found.session_id, "abcd1234-ef56");
    }
}
