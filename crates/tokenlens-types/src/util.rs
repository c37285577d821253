/// Truncate a string to a maximum character count, appending an ellipsis
/// when anything was cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect::<String>() + "..."
    }
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max` characters of a string, whitespace-collapsed. Used for
/// display snippets of user prompts.
pub fn snippet(s: &str, max: usize) -> String {
    let collapsed = collapse_whitespace(s);
    collapsed.chars().take(max).collect()
}
