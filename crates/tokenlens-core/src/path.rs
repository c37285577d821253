use std::path::{Path, PathBuf};

/// Expand tilde (~) at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home);
        }
    }
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Expand tilde in a `Path` whose leading component is `~`.
pub(crate) fn resolve(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if s.starts_with('~') => expand_tilde(s),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_prefix() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(
            expand_tilde("~/projects/x.jsonl"),
            PathBuf::from(home).join("projects/x.jsonl")
        );
    }

    #[test]
    fn test_plain_path_unchanged() {
        assert_eq!(expand_tilde("/tmp/a"), PathBuf::from("/tmp/a"));
        assert_eq!(expand_tilde("relative/a"), PathBuf::from("relative/a"));
    }

    #[test]
    fn test_tilde_only_resolves_to_home() {
        let home = std::env::var("HOME").unwrap();
        assert_eq!(expand_tilde("~"), PathBuf::from(home));
    }
}
