//! Common utility functions used across the application

use std::path::Path;

/// Replace escaped newline sequences with actual line breaks.
///
/// Generated text sometimes arrives with literal `\n` (or double-escaped
/// `\\n`) sequences instead of real line breaks; both forms are normalized
/// before any splitting happens.
pub fn normalize_escaped_newlines(text: &str) -> String {
    text.replace("\\\\n", "\n").replace("\\n", "\n")
}

/// Check if a file exists and has valid content (non-zero size)
pub async fn check_file_exists_and_valid(path: &Path) -> bool {
    if let Ok(metadata) = tokio::fs::metadata(path).await {
        if metadata.is_file() && metadata.len() > 0 {
            return true;
        }
    }
    false
}

/// Truncate a text to at most `max_chars` characters for log output.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let short: String = text.chars().take(max_chars).collect();
        format!("{}...", short)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_escaped_newlines() {
        assert_eq!(normalize_escaped_newlines("a\\nb"), "a\nb");
        assert_eq!(normalize_escaped_newlines("a\\\\nb"), "a\nb");
        assert_eq!(normalize_escaped_newlines("a\nb"), "a\nb");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("abcdefgh", 4), "abcd...");
    }
}
