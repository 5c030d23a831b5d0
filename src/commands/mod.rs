//! Subcommand implementations for the kakuhyo binary

pub mod evaluate;
pub mod init_db;
pub mod ranking;
pub mod results;
pub mod scrape;

use anyhow::Result;
use kakuhyo::config::Config;

pub use evaluate::evaluate;
pub use init_db::init_db;
pub use ranking::ranking;
pub use results::results;
pub use scrape::scrape;

/// Full pipeline: scrape the ranking, evaluate pending works, show results
///
/// A failed scrape does not stop the run; works stored earlier are still
/// evaluated.
pub async fn run(config: &Config, limit: usize) -> Result<()> {
    if let Err(e) = scrape(config, limit).await {
        tracing::warn!(error = %format!("{e:#}"), "Scrape failed, evaluating stored works");
        println!("Scrape failed: {e:#}");
    }
    evaluate(config, limit).await?;
    results(config, limit)?;
    Ok(())
}
