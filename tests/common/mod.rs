//! Common test utilities

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use kakuhyo::crawler::SiteFetcher;
use kakuhyo::models::{Episode, Novel};
use kakuhyo::utils::retry::RetryConfig;

/// Read an HTML fixture from `tests/fixtures/html`
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("html")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

/// Fetcher without request spacing and with short backoff
pub fn fast_fetcher(max_retries: u32) -> SiteFetcher {
    SiteFetcher::with_config(
        Duration::ZERO,
        RetryConfig::with_delays(max_retries, 10, 50),
        Duration::from_secs(5),
        "kakuhyo-test",
    )
    .unwrap()
}

/// Create a stored work with default values
pub fn create_test_novel(id: &str, ranking_position: u32) -> Novel {
    let now = Utc::now();
    Novel {
        id: id.to_string(),
        title: format!("作品{id}"),
        author: "テスト作者".to_string(),
        ranking_position,
        novel_url: format!("https://kakuyomu.jp/works/{id}"),
        genre: None,
        created_at: now,
        updated_at: now,
    }
}

/// Create `count` numbered episodes for a work
pub fn create_test_episodes(novel_id: &str, count: u32) -> Vec<Episode> {
    (1..=count)
        .map(|n| {
            let mut episode = Episode {
                id: Episode::make_id(novel_id, &format!("{n}00")),
                novel_id: novel_id.to_string(),
                episode_number: n,
                title: format!("第{n}話"),
                content: format!("第{n}話の本文です。"),
                content_hash: None,
                posted_at: Utc::now(),
            };
            episode.compute_hash();
            episode
        })
        .collect()
}
