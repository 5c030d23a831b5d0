//! Configuration management for kakuhyo
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::llm::LlmConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Site scraping configuration
    pub scraper: ScraperConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// LLM endpoint configuration
    pub llm: LlmConfig,

    /// Evaluation orchestration
    pub evaluation: EvaluationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Results export
    pub export: ExportConfig,
}

/// Scraper-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Site root, e.g. `https://kakuyomu.jp`
    pub base_url: String,

    /// Ranking page path relative to `base_url`
    pub ranking_path: String,

    /// User agent string
    pub user_agent: String,

    /// Minimum seconds between two site requests
    pub request_interval_secs: f64,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Retry attempts after the first failure
    pub max_retries: u32,

    /// Episodes stored per work
    pub episodes_per_work: usize,
}

/// Largest accepted `request_interval_secs`
pub const MAX_REQUEST_INTERVAL_SECS: f64 = 3600.0;

impl ScraperConfig {
    /// Minimum spacing between site requests, clamped to the accepted range
    #[must_use]
    pub fn request_interval(&self) -> Duration {
        Duration::try_from_secs_f64(
            self.request_interval_secs
                .clamp(0.0, MAX_REQUEST_INTERVAL_SECS),
        )
        .unwrap_or(Duration::ZERO)
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://kakuyomu.jp"),
            ranking_path: String::from("/rankings/all/daily"),
            user_agent: String::from(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ),
            request_interval_secs: 1.0,
            request_timeout_secs: 30,
            max_retries: 3,
            episodes_per_work: 3,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/novels.db"),
        }
    }
}

/// Evaluation orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Episode slots in one prompt
    pub episodes_per_evaluation: usize,

    /// Per-episode character cutoff; `None` sends full text
    pub max_episode_chars: Option<usize>,

    /// Store sentinel results instead of leaving the work for the next run
    pub persist_failed: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            episodes_per_evaluation: 3,
            max_episode_chars: Some(7700),
            persist_failed: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Optional plain-text log file, written alongside the console
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
            file: Some(PathBuf::from("logs/novel_evaluation.log")),
        }
    }
}

/// Results export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Evaluation results CSV
    pub csv_path: PathBuf,

    /// Characters of feedback shown in the console listing
    pub feedback_preview_chars: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("results/evaluation_results.csv"),
            feedback_preview_chars: 100,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let scraper = ScraperConfig {
            base_url: env_string("KAKUYOMU_BASE_URL").unwrap_or(defaults.scraper.base_url),
            ranking_path: defaults.scraper.ranking_path,
            user_agent: env_string("USER_AGENT").unwrap_or(defaults.scraper.user_agent),
            request_interval_secs: env_parse("SCRAPE_INTERVAL")
                .unwrap_or(defaults.scraper.request_interval_secs),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT")
                .unwrap_or(defaults.scraper.request_timeout_secs),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(defaults.scraper.max_retries),
            episodes_per_work: env_parse("EPISODES_PER_WORK")
                .unwrap_or(defaults.scraper.episodes_per_work),
        };

        let database = DatabaseConfig {
            sqlite_path: env_string("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database.sqlite_path),
        };

        let llm = LlmConfig {
            api_key: env_string("LLM_API_KEY"),
            endpoint: env_string("LLM_ENDPOINT").unwrap_or(defaults.llm.endpoint),
            model: env_string("LLM_MODEL").unwrap_or(defaults.llm.model),
            temperature: env_parse("LLM_TEMPERATURE").unwrap_or(defaults.llm.temperature),
            max_tokens: env_parse("LLM_MAX_TOKENS").unwrap_or(defaults.llm.max_tokens),
            timeout_secs: env_parse("LLM_TIMEOUT").unwrap_or(defaults.llm.timeout_secs),
            max_retries: env_parse("MAX_RETRIES").unwrap_or(defaults.llm.max_retries),
        };

        let max_episode_chars = match std::env::var("MAX_EPISODE_CHARS") {
            Ok(v) if v.trim() == "0" || v.trim().eq_ignore_ascii_case("none") => None,
            Ok(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .or(defaults.evaluation.max_episode_chars),
            Err(_) => defaults.evaluation.max_episode_chars,
        };

        let evaluation = EvaluationConfig {
            episodes_per_evaluation: env_parse("EPISODES_PER_EVALUATION")
                .unwrap_or(defaults.evaluation.episodes_per_evaluation),
            max_episode_chars,
            persist_failed: env_parse("PERSIST_FAILED_EVALUATIONS")
                .unwrap_or(defaults.evaluation.persist_failed),
        };

        let logging = LoggingConfig {
            level: env_string("LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: env_string("LOG_FORMAT").unwrap_or(defaults.logging.format),
            file: env_string("LOG_FILE")
                .map(PathBuf::from)
                .or(defaults.logging.file),
        };

        let export = ExportConfig {
            csv_path: env_string("RESULTS_CSV")
                .map(PathBuf::from)
                .unwrap_or(defaults.export.csv_path),
            feedback_preview_chars: defaults.export.feedback_preview_chars,
        };

        Ok(Self {
            scraper,
            database,
            llm,
            evaluation,
            logging,
            export,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.scraper.base_url)
            .with_context(|| format!("invalid base_url: {}", self.scraper.base_url))?;

        if !(0.0..=MAX_REQUEST_INTERVAL_SECS).contains(&self.scraper.request_interval_secs) {
            anyhow::bail!(
                "request_interval_secs must be between 0 and {MAX_REQUEST_INTERVAL_SECS}"
            );
        }

        if self.scraper.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.scraper.episodes_per_work == 0 {
            anyhow::bail!("episodes_per_work must be greater than 0");
        }

        if !self.llm.endpoint.starts_with("http://") && !self.llm.endpoint.starts_with("https://")
        {
            anyhow::bail!("llm.endpoint must be an http(s) URL");
        }

        if self.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be greater than 0");
        }

        if self.evaluation.episodes_per_evaluation == 0 {
            anyhow::bail!("episodes_per_evaluation must be greater than 0");
        }

        if self.evaluation.max_episode_chars == Some(0) {
            anyhow::bail!("max_episode_chars must be greater than 0 when set");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scraper.request_timeout_secs)
    }

    /// Get the minimum interval between site requests
    #[must_use]
    pub fn request_interval(&self) -> Duration {
        self.scraper.request_interval()
    }
}
