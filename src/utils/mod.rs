//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;
pub mod retry;

use anyhow::{Context, Result};
use url::Url;

/// Truncate text to at most `max_chars` characters, marking the cut with "..."
///
/// Counts characters, not bytes, so Japanese text is never split mid-codepoint.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}

/// Format an optional score with one fractional digit
pub fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| String::from("-"), |s| format!("{s:.1}"))
}

/// Last non-empty path segment of a URL or path (`/works/123` -> `123`)
pub fn last_path_segment(href: &str) -> Option<&str> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

/// Resolve a possibly relative href against a base URL
pub fn resolve_url(base: &Url, href: &str) -> Result<Url> {
    base.join(href)
        .with_context(|| format!("Invalid href: {href}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("very long text here", 10), "very lo...");
    }

    #[test]
    fn test_truncate_japanese() {
        assert_eq!(truncate_text("吾輩は猫である。名前はまだ無い。", 8), "吾輩は猫で...");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(Some(7.26)), "7.3");
        assert_eq!(format_score(Some(8.0)), "8.0");
        assert_eq!(format_score(None), "-");
    }

    #[test]
    fn test_last_path_segment() {
        assert_eq!(last_path_segment("/works/1177354054"), Some("1177354054"));
        assert_eq!(last_path_segment("/works/1177354054/"), Some("1177354054"));
        assert_eq!(last_path_segment(""), None);
    }

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://kakuyomu.jp").unwrap();
        let url = resolve_url(&base, "/works/123").unwrap();
        assert_eq!(url.as_str(), "https://kakuyomu.jp/works/123");
    }
}
