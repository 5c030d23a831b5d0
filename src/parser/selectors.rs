//! CSS selectors and markup patterns for Kakuyomu pages
//!
//! Ranking pages are parsed as a DOM; work and episode pages are scanned
//! with regexes because the data sits in embedded JSON or flat `<p>` runs.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

/// Class of the card wrapping one ranked work
pub const WORK_CARD_CLASS: &str = "widget-workCard";

lazy_static! {
    /// Title link of a ranked work
    pub static ref RANKING_TITLE: Selector =
        parse_selector!(".widget-workCard-titleLabel.bookWalker-work-title");

    /// Author label inside a work card
    pub static ref RANKING_AUTHOR: Selector = parse_selector!(".widget-workCard-authorLabel");

    /// Episode entry in the work page's embedded state
    pub static ref EPISODE_REF: Regex = Regex::new(
        r#""__typename":"Episode","id":"([^"]*)","title":"((?:[^"\\]|\\.)*)","#
    )
    .expect("Invalid episode reference pattern");

    /// Body paragraph of an episode page
    pub static ref EPISODE_PARAGRAPH: Regex =
        Regex::new(r#"(?s)<p id="p.*?</p>"#).expect("Invalid paragraph pattern");

    /// Episode heading on an episode page
    pub static ref EPISODE_TITLE: Regex =
        Regex::new(r#"(?s)<p class="widget-episodeTitle[^"]*"[^>]*>(.*?)</p>"#)
            .expect("Invalid episode title pattern");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_initialize() {
        let _ = &*RANKING_TITLE;
        let _ = &*RANKING_AUTHOR;
    }

    #[test]
    fn test_episode_ref_handles_escaped_quotes() {
        let text = r#""__typename":"Episode","id":"16816","title":"第1話 \"始まり\"","publishedAt""#;
        let caps = EPISODE_REF.captures(text).unwrap();
        assert_eq!(&caps[1], "16816");
        assert_eq!(&caps[2], r#"第1話 \"始まり\""#);
    }

    #[test]
    fn test_episode_title_pattern() {
        let html = r#"<p class="widget-episodeTitle js-vertical-composition-item">第一話</p>"#;
        let caps = EPISODE_TITLE.captures(html).unwrap();
        assert_eq!(&caps[1], "第一話");
    }
}
