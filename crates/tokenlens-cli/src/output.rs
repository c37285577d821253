use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

/// Whether stdout should get ANSI styling.
pub fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

pub fn bold(text: &str) -> String {
    if use_color() {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

pub fn dim(text: &str) -> String {
    if use_color() {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

pub fn warn(text: &str) -> String {
    if use_color() {
        text.yellow().to_string()
    } else {
        text.to_string()
    }
}

/// Thousands-separated token count.
pub fn format_tokens(tokens: u64) -> String {
    let digits: Vec<char> = tokens.to_string().chars().rev().collect();
    let mut out = String::new();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tokens_groups_thousands() {
        assert_eq!(format_tokens(0), "0");
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(1_000), "1,000");
        assert_eq!(format_tokens(156_000), "156,000");
        assert_eq!(format_tokens(1_234_567), "1,234,567");
    }
}
