//! kakuhyo - Kakuyomu ranking scraper and LLM novel evaluator
//!
//! Scrapes the daily ranking of the Kakuyomu web-novel site, stores each
//! ranked work with its leading episodes, asks an LLM to review them and
//! exports the scores.
//!
//! # Architecture
//!
//! - [`config`] - Configuration from environment variables or TOML
//! - [`crawler`] - Rate-limited fetching of ranking, work and episode pages
//! - [`parser`] - Ranking/episode extraction and HTML to Aozora normalization
//! - [`llm`] - Prompt rendering, chat-completion client and score extraction
//! - [`evaluator`] - Evaluation orchestration over stored works
//! - [`storage`] - SQLite repository and CSV export
//! - [`models`] - Core data structures
//! - [`utils`] - Error types, retry policy and text helpers
//!
//! # Example
//!
//! ```no_run
//! use kakuhyo::config::Config;
//! use kakuhyo::crawler::KakuyomuCrawler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let crawler = KakuyomuCrawler::new(&config.scraper)?;
//!     let ranking = crawler.get_daily_ranking(10).await?;
//!     println!("{} works", ranking.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod evaluator;
pub mod llm;
pub mod models;
pub mod parser;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::crawler::{KakuyomuCrawler, ScrapedWork};
    pub use crate::error::{Error, ErrorCategory, KakuhyoErrorTrait, Result};
    pub use crate::evaluator::{BatchSummary, EvaluationOutcome, NovelEvaluator};
    pub use crate::llm::{ChatCompletion, LlmClient};
    pub use crate::models::{
        Episode, EvaluationRecord, EvaluationResponse, EvaluationResult, Novel, RankingEntry,
    };
    pub use crate::storage::{NovelRepository, SharedNovelRepository};
}

pub use models::{Episode, EvaluationResponse, EvaluationResult, Novel, RankingEntry};
