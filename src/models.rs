// Core data structures for kakuhyo

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Entry scraped from the daily ranking page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub id: String, // Kakuyomu work ID
    pub title: String,
    pub author: String,
    pub ranking_position: u32, // 1-based
    pub novel_url: String,
}

/// Stored work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Novel {
    pub id: String,
    pub title: String,
    pub author: String,
    pub ranking_position: u32,
    pub novel_url: String,
    pub genre: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RankingEntry> for Novel {
    fn from(entry: RankingEntry) -> Self {
        let now = Utc::now();
        Self {
            id: entry.id,
            title: entry.title,
            author: entry.author,
            ranking_position: entry.ranking_position,
            novel_url: entry.novel_url,
            genre: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Stored episode with normalized body text
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Episode {
    pub id: String, // {novel_id}-{episode_id}
    pub novel_id: String,
    pub episode_number: u32, // 1-based position in the table of contents
    pub title: String,
    pub content: String,
    pub content_hash: Option<String>, // SHA256 of content
    pub posted_at: DateTime<Utc>,
}

impl Episode {
    /// Build the storage ID from work and episode IDs
    pub fn make_id(novel_id: &str, episode_id: &str) -> String {
        format!("{novel_id}-{episode_id}")
    }

    /// Calculate content hash using SHA256
    pub fn compute_hash(&mut self) {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        self.content_hash = Some(format!("{:x}", hasher.finalize()));
    }
}

/// Structured score record produced from an LLM response
///
/// Scores are expected in `[0.0, 10.0]` but are neither clamped nor rounded
/// here; that is left to presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub overall_score: f64,
    pub story_score: f64,
    pub writing_score: f64,
    pub character_score: f64,
    pub feedback: String,
}

impl EvaluationResponse {
    /// Zero-score record carrying the failure reason as feedback
    pub fn sentinel(reason: impl Into<String>) -> Self {
        Self {
            overall_score: 0.0,
            story_score: 0.0,
            writing_score: 0.0,
            character_score: 0.0,
            feedback: reason.into(),
        }
    }
}

/// Evaluation row as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub id: i64,
    pub novel_id: String,
    pub episode_id: Option<String>,
    pub evaluation_date: DateTime<Utc>,
    pub overall_score: f64,
    pub story_score: Option<f64>,
    pub writing_score: Option<f64>,
    pub character_score: Option<f64>,
    pub feedback: Option<String>,
}

/// Evaluation joined with its work, for display and export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub novel_id: String,
    pub title: String,
    pub author: String,
    pub ranking: u32,
    pub overall_score: f64,
    pub story_score: Option<f64>,
    pub writing_score: Option<f64>,
    pub character_score: Option<f64>,
    pub feedback: String,
    pub evaluation_date: DateTime<Utc>,
}
