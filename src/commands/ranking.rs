use std::path::Path;

use anyhow::{Context, Result};

use kakuhyo::config::Config;
use kakuhyo::crawler::KakuyomuCrawler;
use kakuhyo::storage::write_ranking_csv;

/// Print the current daily ranking, optionally writing it to CSV
pub async fn ranking(config: &Config, limit: usize, output: Option<&Path>) -> Result<()> {
    let crawler =
        KakuyomuCrawler::new(&config.scraper).context("Failed to create crawler")?;
    let entries = crawler
        .get_daily_ranking(limit)
        .await
        .context("Failed to fetch daily ranking")?;

    println!("Kakuyomu Daily Ranking");
    println!("======================");
    for entry in &entries {
        println!(
            "{:>3}. {} / {}",
            entry.ranking_position, entry.title, entry.author
        );
        println!("     {}", entry.novel_url);
    }

    if let Some(path) = output {
        let rows = write_ranking_csv(&entries, path)?;
        println!("\nSaved {rows} entries to {}", path.display());
    }

    Ok(())
}
