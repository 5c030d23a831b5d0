//! Kakuyomu crawling with rate limiting
//!
//! This module implements the sequential crawl: daily ranking, then each
//! work's table of contents, then its leading episodes.

pub mod fetcher;

use chrono::Utc;
use url::Url;

use crate::config::ScraperConfig;
use crate::models::{Episode, Novel, RankingEntry};
use crate::parser::{
    extract_episode_body, extract_episode_refs, extract_episode_title, parse_ranking, EpisodeRef,
};
use crate::utils::error::{CrawlerError, FetchError, ParseError};

pub use fetcher::SiteFetcher;

/// A ranked work with the episodes fetched for it
#[derive(Debug, Clone)]
pub struct ScrapedWork {
    pub novel: Novel,
    pub episodes: Vec<Episode>,
}

/// Kakuyomu crawler
pub struct KakuyomuCrawler {
    fetcher: SiteFetcher,
    base_url: Url,
    ranking_path: String,
}

impl KakuyomuCrawler {
    /// Create a crawler from scraper configuration
    pub fn new(config: &ScraperConfig) -> Result<Self, CrawlerError> {
        let fetcher = SiteFetcher::from_config(config)?;
        Self::with_fetcher(fetcher, &config.base_url, &config.ranking_path)
    }

    /// Create a crawler around an existing fetcher
    pub fn with_fetcher(
        fetcher: SiteFetcher,
        base_url: &str,
        ranking_path: &str,
    ) -> Result<Self, CrawlerError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| FetchError::InvalidUrl(base_url.to_string()))?;

        Ok(Self {
            fetcher,
            base_url,
            ranking_path: ranking_path.to_string(),
        })
    }

    /// URL of the daily ranking page
    pub fn ranking_url(&self) -> String {
        self.join(&self.ranking_path)
    }

    /// URL of a work's table of contents
    pub fn work_url(&self, novel_id: &str) -> String {
        self.join(&format!("/works/{novel_id}"))
    }

    /// URL of a single episode
    pub fn episode_url(&self, novel_id: &str, episode_id: &str) -> String {
        self.join(&format!("/works/{novel_id}/episodes/{episode_id}"))
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Fetch the top `limit` works of the daily ranking
    pub async fn get_daily_ranking(&self, limit: usize) -> Result<Vec<RankingEntry>, CrawlerError> {
        let url = self.ranking_url();
        let html = self.fetcher.fetch_page(&url).await?;
        let entries = parse_ranking(&html, &self.base_url, limit);

        if entries.is_empty() {
            tracing::warn!(url = %url, "Ranking page contained no works");
        } else {
            tracing::info!(count = entries.len(), "Retrieved novels from daily ranking");
        }

        Ok(entries)
    }

    /// Fetch up to `count` leading episodes of a work
    ///
    /// Episodes whose page fails to load or has no body are skipped with a
    /// warning. A work page listing no episodes is an error.
    pub async fn get_episodes(
        &self,
        novel_id: &str,
        count: usize,
    ) -> Result<Vec<Episode>, CrawlerError> {
        let work_html = self.fetcher.fetch_page(&self.work_url(novel_id)).await?;
        let refs = extract_episode_refs(&work_html);

        if refs.is_empty() {
            return Err(ParseError::EpisodeNotFound(novel_id.to_string()).into());
        }

        let mut episodes = Vec::with_capacity(count.min(refs.len()));
        for (index, episode_ref) in refs.iter().take(count).enumerate() {
            match self.fetch_episode(novel_id, episode_ref, index as u32 + 1).await {
                Ok(episode) => episodes.push(episode),
                Err(e) => tracing::warn!(
                    novel_id,
                    episode_id = %episode_ref.id,
                    error = %e,
                    "Skipping episode"
                ),
            }
        }

        tracing::info!(novel_id, count = episodes.len(), "Retrieved episodes");
        Ok(episodes)
    }

    /// Fetch the first episode of a work, if it has readable content
    pub async fn get_first_episode(&self, novel_id: &str) -> Result<Option<Episode>, CrawlerError> {
        Ok(self.get_episodes(novel_id, 1).await?.into_iter().next())
    }

    /// Fetch a ranked work together with its leading episodes
    pub async fn scrape_work(
        &self,
        entry: RankingEntry,
        episode_count: usize,
    ) -> Result<ScrapedWork, CrawlerError> {
        let episodes = self.get_episodes(&entry.id, episode_count).await?;
        Ok(ScrapedWork {
            novel: Novel::from(entry),
            episodes,
        })
    }

    async fn fetch_episode(
        &self,
        novel_id: &str,
        episode_ref: &EpisodeRef,
        episode_number: u32,
    ) -> Result<Episode, CrawlerError> {
        let url = self.episode_url(novel_id, &episode_ref.id);
        let html = self.fetcher.fetch_page(&url).await?;

        let content = extract_episode_body(&html).ok_or(ParseError::ContentNotFound(url))?;

        let title = if episode_ref.title.trim().is_empty() {
            extract_episode_title(&html).unwrap_or_else(|| format!("第{episode_number}話"))
        } else {
            episode_ref.title.clone()
        };

        let mut episode = Episode {
            id: Episode::make_id(novel_id, &episode_ref.id),
            novel_id: novel_id.to_string(),
            episode_number,
            title,
            content,
            content_hash: None,
            posted_at: Utc::now(),
        };
        episode.compute_hash();

        tracing::debug!(
            episode_id = %episode.id,
            chars = episode.content.chars().count(),
            "Fetched episode"
        );
        Ok(episode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crawler(base: &str) -> KakuyomuCrawler {
        KakuyomuCrawler::with_fetcher(SiteFetcher::new().unwrap(), base, "/rankings/all/daily")
            .unwrap()
    }

    #[test]
    fn test_urls() {
        let crawler = crawler("https://kakuyomu.jp/");
        assert_eq!(crawler.ranking_url(), "https://kakuyomu.jp/rankings/all/daily");
        assert_eq!(crawler.work_url("123"), "https://kakuyomu.jp/works/123");
        assert_eq!(
            crawler.episode_url("123", "456"),
            "https://kakuyomu.jp/works/123/episodes/456"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let result =
            KakuyomuCrawler::with_fetcher(SiteFetcher::new().unwrap(), "::not-a-url", "/r");
        assert!(matches!(
            result,
            Err(CrawlerError::Fetch(FetchError::InvalidUrl(_)))
        ));
    }
}
