use anyhow::{Context, Result};

use kakuhyo::config::Config;
use kakuhyo::crawler::KakuyomuCrawler;
use kakuhyo::models::Novel;
use kakuhyo::storage::open_repository;
use kakuhyo::utils::error::CrawlerError;

/// Counts reported at the end of a scrape
#[derive(Debug, Default)]
pub struct ScrapeStats {
    pub works: usize,
    pub episodes: usize,
    pub without_episodes: usize,
}

/// Scrape the daily ranking and store each work with its leading episodes
///
/// Works are saved one by one so an interrupted run keeps what it fetched.
pub async fn scrape(config: &Config, limit: usize) -> Result<ScrapeStats> {
    println!("Starting Kakuyomu Scrape");
    println!("========================");

    let repo = open_repository(&config.database)?;
    let crawler =
        KakuyomuCrawler::new(&config.scraper).context("Failed to create crawler")?;

    let ranking = crawler
        .get_daily_ranking(limit)
        .await
        .context("Failed to fetch daily ranking")?;
    if ranking.is_empty() {
        return Err(CrawlerError::NoWorksFound.into());
    }
    println!("Found {} ranked works", ranking.len());

    let mut stats = ScrapeStats::default();
    let total = ranking.len();

    for (i, entry) in ranking.into_iter().enumerate() {
        println!("[{}/{}] {}", i + 1, total, entry.title);

        let (novel, episodes) = match crawler
            .scrape_work(entry.clone(), config.scraper.episodes_per_work)
            .await
        {
            Ok(work) => (work.novel, work.episodes),
            Err(e) => {
                tracing::warn!(novel_id = %entry.id, error = %e, "Failed to fetch episodes");
                (Novel::from(entry), Vec::new())
            }
        };

        repo.save_novel(&novel, &episodes)
            .with_context(|| format!("Failed to save novel {}", novel.id))?;

        stats.works += 1;
        stats.episodes += episodes.len();
        if episodes.is_empty() {
            stats.without_episodes += 1;
        }
    }

    println!();
    println!("Scrape Complete");
    println!("===============");
    println!("  Works saved:      {}", stats.works);
    println!("  Episodes saved:   {}", stats.episodes);
    println!("  Without episodes: {}", stats.without_episodes);

    tracing::info!(
        works = stats.works,
        episodes = stats.episodes,
        "Scrape finished"
    );
    Ok(stats)
}
