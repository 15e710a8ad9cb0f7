//! Shared utility functions

use std::path::{Path, PathBuf};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Terminal columns a string occupies
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to at most `max_cols` terminal columns.
///
/// Never splits a character, so wide (CJK, emoji) glyphs that would straddle
/// the limit are dropped whole.
pub fn truncate_to_width(s: &str, max_cols: usize) -> &str {
    let mut cols = 0;
    for (idx, ch) in s.char_indices() {
        let w = ch.width().unwrap_or(0);
        if cols + w > max_cols {
            return &s[..idx];
        }
        cols += w;
    }
    s
}

/// Truncate with a trailing ellipsis when the string doesn't fit
pub fn ellipsize(s: &str, max_cols: usize) -> String {
    if display_width(s) <= max_cols {
        return s.to_string();
    }
    if max_cols == 0 {
        return String::new();
    }
    format!("{}…", truncate_to_width(s, max_cols - 1))
}

/// Last path component, or the whole path when there is none
pub fn repo_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand a leading `~` to the home directory
pub fn expand_home(input: &str) -> PathBuf {
    let trimmed = input.trim();
    if trimmed == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(trimmed));
    }
    match (trimmed.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(trimmed),
    }
}

/// Single-quote a string for POSIX shells
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_at_ascii_boundary() {
        assert_eq!(truncate_to_width("hello world", 5), "hello");
    }

    #[test]
    fn test_truncate_counts_wide_chars_as_two() {
        // Each of these occupies two columns
        let s = "日本語";
        assert_eq!(display_width(s), 6);
        assert_eq!(truncate_to_width(s, 5), "日本");
        assert_eq!(truncate_to_width(s, 1), "");
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("short", 10), "short");
        assert_eq!(ellipsize("a longer title", 6), "a lon…");
        assert_eq!(ellipsize("abc", 0), "");
    }

    #[test]
    fn test_repo_name() {
        assert_eq!(repo_name(&PathBuf::from("/home/me/src/hive")), "hive");
        assert_eq!(repo_name(&PathBuf::from("/")), "/");
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("src/main.rs"), "'src/main.rs'");
        assert_eq!(shell_quote("it's.txt"), r"'it'\''s.txt'");
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/src"), home.join("src"));
            assert_eq!(expand_home("~"), home);
        }
        assert_eq!(expand_home(" /tmp "), PathBuf::from("/tmp"));
    }
}
