//! Daily ranking page parsing

use scraper::{ElementRef, Html};
use url::Url;

use super::selectors::{RANKING_AUTHOR, RANKING_TITLE, WORK_CARD_CLASS};
use crate::models::RankingEntry;
use crate::utils::{last_path_segment, resolve_url};

/// Author shown when a card has no author label
pub const UNKNOWN_AUTHOR: &str = "不明";

/// Parse up to `limit` ranked works, in page order
///
/// Positions are 1-based and count only entries that parsed.
pub fn parse_ranking(html: &str, base: &Url, limit: usize) -> Vec<RankingEntry> {
    let document = Html::parse_document(html);
    let mut entries = Vec::new();

    for (index, title_el) in document.select(&RANKING_TITLE).enumerate() {
        if entries.len() >= limit {
            break;
        }

        match parse_entry(title_el, base, entries.len() as u32 + 1) {
            Some(entry) => entries.push(entry),
            None => tracing::warn!(index, "Skipping ranking entry without a usable link"),
        }
    }

    tracing::debug!(count = entries.len(), "Parsed ranking entries");
    entries
}

fn parse_entry(title_el: ElementRef<'_>, base: &Url, position: u32) -> Option<RankingEntry> {
    let href = title_el.value().attr("href")?;
    let id = last_path_segment(href)?.to_string();
    let novel_url = resolve_url(base, href).ok()?.to_string();
    let title = element_text(title_el);

    let author = work_card(title_el)
        .and_then(|card| card.select(&RANKING_AUTHOR).next())
        .map(element_text)
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    Some(RankingEntry {
        id,
        title,
        author,
        ranking_position: position,
        novel_url,
    })
}

/// Nearest ancestor carrying the work-card class
fn work_card(el: ElementRef<'_>) -> Option<ElementRef<'_>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().classes().any(|c| c == WORK_CARD_CLASS))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
