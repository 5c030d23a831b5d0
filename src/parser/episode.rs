//! Work and episode page extraction

use scraper::Html;
use std::collections::HashSet;

use super::normalize::normalize;
use super::selectors::{EPISODE_PARAGRAPH, EPISODE_REF, EPISODE_TITLE};

/// An episode listed in a work's table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeRef {
    /// Site episode ID
    pub id: String,
    /// Episode title as listed
    pub title: String,
}

/// List episodes from a work page, in table-of-contents order
///
/// The page embeds its state as JSON; the same episode can appear more than
/// once there, so repeats are dropped.
pub fn extract_episode_refs(html: &str) -> Vec<EpisodeRef> {
    let mut seen = HashSet::new();

    EPISODE_REF
        .captures_iter(html)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str();
            if id.is_empty() || !seen.insert(id.to_string()) {
                return None;
            }
            Some(EpisodeRef {
                id: id.to_string(),
                title: unescape_json_string(caps.get(2)?.as_str()),
            })
        })
        .collect()
}

/// Normalized body text of an episode page
///
/// Returns `None` when the page has no body paragraphs; the normalizer is
/// never run on an empty body.
pub fn extract_episode_body(html: &str) -> Option<String> {
    let paragraphs: Vec<&str> = EPISODE_PARAGRAPH
        .find_iter(html)
        .map(|m| m.as_str())
        .collect();

    if paragraphs.is_empty() {
        return None;
    }

    let mut raw = paragraphs.join("\r\n");
    raw.push_str("\r\n");
    Some(normalize(&raw))
}

/// Episode heading from an episode page, tags stripped
pub fn extract_episode_title(html: &str) -> Option<String> {
    let inner = EPISODE_TITLE.captures(html)?.get(1)?.as_str();
    let fragment = Html::parse_fragment(inner);
    let title = fragment.root_element().text().collect::<String>().trim().to_string();
    (!title.is_empty()).then_some(title)
}

fn unescape_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}
