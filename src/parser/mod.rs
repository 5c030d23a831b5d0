//! HTML parsing and text extraction
//!
//! This module handles parsing Kakuyomu ranking, work and episode pages and
//! normalizing episode markup into annotated plain text.

pub mod episode;
pub mod normalize;
pub mod ranking;
pub mod selectors;

// Re-export main parsing entry points
pub use episode::{extract_episode_body, extract_episode_refs, extract_episode_title, EpisodeRef};
pub use normalize::normalize;
pub use ranking::{parse_ranking, UNKNOWN_AUTHOR};
