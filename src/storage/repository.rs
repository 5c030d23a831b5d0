//! Repository Pattern for Database Abstraction
//!
//! This module provides a trait-based repository abstraction that decouples
//! the scraper and evaluator from the storage implementation, enabling:
//! - Easy testing with the in-memory implementation
//! - Swappable storage backends
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Business Logic                          │
//! │              (scrape, evaluate, results)                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   NovelRepository                           │
//! └─────────────────────────────────────────────────────────────┘
//!                    │                       │
//!                    ▼                       ▼
//!          ┌─────────────────┐     ┌─────────────────┐
//!          │     SQLite      │     │      Mock       │
//!          │  Implementation │     │ Implementation  │
//!          └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use kakuhyo::storage::repository::{NovelRepository, SqliteNovelRepository};
//!
//! // Production: use SQLite
//! let repo = SqliteNovelRepository::new("data/novels.db")?;
//!
//! // Testing: use Mock
//! let mock_repo = MockNovelRepository::new();
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Episode, EvaluationRecord, EvaluationResponse, EvaluationResult, Novel};

// ============================================================================
// Repository Trait
// ============================================================================

/// Storage for works, their episodes and evaluations
pub trait NovelRepository: Send + Sync {
    /// Insert or update a work and its episodes in one transaction
    ///
    /// `created_at` of an existing work is kept; a `None` genre does not
    /// overwrite a stored one.
    fn save_novel(&self, novel: &Novel, episodes: &[Episode]) -> Result<()>;

    /// Get a work by ID
    fn get_novel(&self, novel_id: &str) -> Result<Option<Novel>>;

    /// Up to `limit` episodes of a work, in table-of-contents order
    fn get_novel_episodes(&self, novel_id: &str, limit: usize) -> Result<Vec<Episode>>;

    /// Up to `limit` works with stored episodes and no evaluation, best
    /// ranked first
    fn get_novels_for_evaluation(&self, limit: usize) -> Result<Vec<Novel>>;

    /// Whether a work already has an evaluation
    fn has_existing_evaluation(&self, novel_id: &str) -> Result<bool>;

    /// Store an evaluation and return its row ID
    fn save_evaluation(
        &self,
        novel_id: &str,
        episode_id: Option<&str>,
        response: &EvaluationResponse,
    ) -> Result<i64>;

    /// Evaluations of one work, newest first
    fn get_evaluations(&self, novel_id: &str) -> Result<Vec<EvaluationRecord>>;

    /// Up to `limit` evaluations joined with their works, best overall score first
    fn get_evaluation_results(&self, limit: usize) -> Result<Vec<EvaluationResult>>;

    /// Number of stored works
    fn count_novels(&self) -> Result<usize>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of NovelRepository
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteNovelRepository {
    conn: Mutex<Connection>,
}

impl SqliteNovelRepository {
    /// Create a new SQLite repository
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite repository initialized");
        Ok(repo)
    }

    /// Create in-memory repository (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory SQLite")?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection mutex poisoned"))
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS novels (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    author TEXT NOT NULL,
                    ranking_position INTEGER NOT NULL,
                    novel_url TEXT NOT NULL,
                    genre TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS episodes (
                    id TEXT PRIMARY KEY,
                    novel_id TEXT NOT NULL REFERENCES novels(id),
                    episode_number INTEGER NOT NULL DEFAULT 0,
                    title TEXT NOT NULL,
                    content TEXT NOT NULL,
                    content_hash TEXT,
                    posted_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_episodes_novel
                    ON episodes(novel_id, episode_number);

                CREATE TABLE IF NOT EXISTS evaluations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    novel_id TEXT NOT NULL REFERENCES novels(id),
                    episode_id TEXT REFERENCES episodes(id),
                    evaluation_date TEXT NOT NULL,
                    overall_score REAL NOT NULL,
                    story_score REAL,
                    writing_score REAL,
                    character_score REAL,
                    llm_feedback TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_evaluations_novel
                    ON evaluations(novel_id);

                CREATE INDEX IF NOT EXISTS idx_evaluations_score
                    ON evaluations(overall_score DESC, evaluation_date DESC);
                "#,
        )
        .context("Failed to create SQLite schema")?;

        Ok(())
    }
}

fn get_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

const NOVEL_COLUMNS: &str =
    "id, title, author, ranking_position, novel_url, genre, created_at, updated_at";

fn novel_from_row(row: &Row<'_>) -> rusqlite::Result<Novel> {
    Ok(Novel {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        ranking_position: row.get(3)?,
        novel_url: row.get(4)?,
        genre: row.get(5)?,
        created_at: get_datetime(row, 6)?,
        updated_at: get_datetime(row, 7)?,
    })
}

fn episode_from_row(row: &Row<'_>) -> rusqlite::Result<Episode> {
    Ok(Episode {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        episode_number: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        content_hash: row.get(5)?,
        posted_at: get_datetime(row, 6)?,
    })
}

impl NovelRepository for SqliteNovelRepository {
    fn save_novel(&self, novel: &Novel, episodes: &[Episode]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;

        tx.execute(
            r#"
            INSERT INTO novels (id, title, author, ranking_position, novel_url, genre, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                ranking_position = excluded.ranking_position,
                novel_url = excluded.novel_url,
                genre = COALESCE(excluded.genre, novels.genre),
                updated_at = excluded.updated_at
            "#,
            params![
                novel.id,
                novel.title,
                novel.author,
                novel.ranking_position,
                novel.novel_url,
                novel.genre,
                novel.created_at.to_rfc3339(),
                Utc::now().to_rfc3339(),
            ],
        )
        .with_context(|| format!("Failed to save novel {}", novel.id))?;

        for episode in episodes {
            tx.execute(
                r#"
                INSERT INTO episodes (id, novel_id, episode_number, title, content, content_hash, posted_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(id) DO UPDATE SET
                    episode_number = excluded.episode_number,
                    title = excluded.title,
                    content = excluded.content,
                    content_hash = excluded.content_hash,
                    posted_at = excluded.posted_at
                "#,
                params![
                    episode.id,
                    novel.id,
                    episode.episode_number,
                    episode.title,
                    episode.content,
                    episode.content_hash,
                    episode.posted_at.to_rfc3339(),
                ],
            )
            .with_context(|| format!("Failed to save episode {}", episode.id))?;
        }

        tx.commit().context("Failed to commit novel")?;

        tracing::debug!(novel_id = %novel.id, episodes = episodes.len(), "Novel saved");
        Ok(())
    }

    fn get_novel(&self, novel_id: &str) -> Result<Option<Novel>> {
        let conn = self.conn()?;
        let novel = conn
            .query_row(
                &format!("SELECT {NOVEL_COLUMNS} FROM novels WHERE id = ?1"),
                params![novel_id],
                novel_from_row,
            )
            .optional()
            .context("Failed to get novel")?;

        Ok(novel)
    }

    fn get_novel_episodes(&self, novel_id: &str, limit: usize) -> Result<Vec<Episode>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, novel_id, episode_number, title, content, content_hash, posted_at
            FROM episodes
            WHERE novel_id = ?1
            ORDER BY episode_number, id
            LIMIT ?2
            "#,
        )?;

        let episodes = stmt
            .query_map(params![novel_id, limit as i64], episode_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read episodes")?;

        Ok(episodes)
    }

    fn get_novels_for_evaluation(&self, limit: usize) -> Result<Vec<Novel>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {NOVEL_COLUMNS}
            FROM novels n
            WHERE NOT EXISTS (SELECT 1 FROM evaluations e WHERE e.novel_id = n.id)
              AND EXISTS (SELECT 1 FROM episodes ep WHERE ep.novel_id = n.id)
            ORDER BY n.ranking_position, n.id
            LIMIT ?1
            "#
        ))?;

        let novels = stmt
            .query_map(params![limit as i64], novel_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read novels for evaluation")?;

        Ok(novels)
    }

    fn has_existing_evaluation(&self, novel_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM evaluations WHERE novel_id = ?1)",
                params![novel_id],
                |row| row.get(0),
            )
            .context("Failed to check evaluation")?;

        Ok(exists)
    }

    fn save_evaluation(
        &self,
        novel_id: &str,
        episode_id: Option<&str>,
        response: &EvaluationResponse,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO evaluations
                (novel_id, episode_id, evaluation_date, overall_score,
                 story_score, writing_score, character_score, llm_feedback)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                novel_id,
                episode_id,
                Utc::now().to_rfc3339(),
                response.overall_score,
                response.story_score,
                response.writing_score,
                response.character_score,
                response.feedback,
            ],
        )
        .with_context(|| format!("Failed to save evaluation for {novel_id}"))?;

        Ok(conn.last_insert_rowid())
    }

    fn get_evaluations(&self, novel_id: &str) -> Result<Vec<EvaluationRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, novel_id, episode_id, evaluation_date, overall_score,
                   story_score, writing_score, character_score, llm_feedback
            FROM evaluations
            WHERE novel_id = ?1
            ORDER BY evaluation_date DESC, id DESC
            "#,
        )?;

        let records = stmt
            .query_map(params![novel_id], |row| {
                Ok(EvaluationRecord {
                    id: row.get(0)?,
                    novel_id: row.get(1)?,
                    episode_id: row.get(2)?,
                    evaluation_date: get_datetime(row, 3)?,
                    overall_score: row.get(4)?,
                    story_score: row.get(5)?,
                    writing_score: row.get(6)?,
                    character_score: row.get(7)?,
                    feedback: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read evaluations")?;

        Ok(records)
    }

    fn get_evaluation_results(&self, limit: usize) -> Result<Vec<EvaluationResult>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT n.id, n.title, n.author, n.ranking_position,
                   e.overall_score, e.story_score, e.writing_score, e.character_score,
                   e.llm_feedback, e.evaluation_date
            FROM evaluations e
            JOIN novels n ON n.id = e.novel_id
            ORDER BY e.overall_score DESC, e.evaluation_date DESC, e.id DESC
            LIMIT ?1
            "#,
        )?;

        let results = stmt
            .query_map(params![limit as i64], |row| {
                Ok(EvaluationResult {
                    novel_id: row.get(0)?,
                    title: row.get(1)?,
                    author: row.get(2)?,
                    ranking: row.get(3)?,
                    overall_score: row.get(4)?,
                    story_score: row.get(5)?,
                    writing_score: row.get(6)?,
                    character_score: row.get(7)?,
                    feedback: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                    evaluation_date: get_datetime(row, 9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read evaluation results")?;

        Ok(results)
    }

    fn count_novels(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM novels", [], |row| row.get(0))
            .context("Failed to count novels")?;

        Ok(count as usize)
    }
}

// ============================================================================
// Mock Implementation
// ============================================================================

/// In-memory mock implementation of NovelRepository
///
/// Useful for unit testing without database dependencies.
pub struct MockNovelRepository {
    novels: RwLock<HashMap<String, Novel>>,
    episodes: RwLock<HashMap<String, Episode>>,
    evaluations: RwLock<Vec<EvaluationRecord>>,
    next_id: AtomicI64,
}

impl MockNovelRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self {
            novels: RwLock::new(HashMap::new()),
            episodes: RwLock::new(HashMap::new()),
            evaluations: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Number of stored evaluations
    pub fn evaluation_count(&self) -> usize {
        self.evaluations.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for MockNovelRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("mock repository lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("mock repository lock poisoned"))
}

impl NovelRepository for MockNovelRepository {
    fn save_novel(&self, novel: &Novel, episodes: &[Episode]) -> Result<()> {
        let mut novels = write(&self.novels)?;
        let mut stored = novel.clone();
        stored.updated_at = Utc::now();
        if let Some(existing) = novels.get(&novel.id) {
            stored.created_at = existing.created_at;
            if stored.genre.is_none() {
                stored.genre = existing.genre.clone();
            }
        }
        novels.insert(novel.id.clone(), stored);

        let mut stored_episodes = write(&self.episodes)?;
        for episode in episodes {
            let mut episode = episode.clone();
            episode.novel_id = novel.id.clone();
            stored_episodes.insert(episode.id.clone(), episode);
        }
        Ok(())
    }

    fn get_novel(&self, novel_id: &str) -> Result<Option<Novel>> {
        Ok(read(&self.novels)?.get(novel_id).cloned())
    }

    fn get_novel_episodes(&self, novel_id: &str, limit: usize) -> Result<Vec<Episode>> {
        let episodes = read(&self.episodes)?;
        let mut matching: Vec<Episode> = episodes
            .values()
            .filter(|e| e.novel_id == novel_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            a.episode_number
                .cmp(&b.episode_number)
                .then_with(|| a.id.cmp(&b.id))
        });
        matching.truncate(limit);
        Ok(matching)
    }

    fn get_novels_for_evaluation(&self, limit: usize) -> Result<Vec<Novel>> {
        let novels = read(&self.novels)?;
        let episodes = read(&self.episodes)?;
        let evaluations = read(&self.evaluations)?;

        let mut pending: Vec<Novel> = novels
            .values()
            .filter(|n| !evaluations.iter().any(|e| e.novel_id == n.id))
            .filter(|n| episodes.values().any(|ep| ep.novel_id == n.id))
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.ranking_position
                .cmp(&b.ranking_position)
                .then_with(|| a.id.cmp(&b.id))
        });
        pending.truncate(limit);
        Ok(pending)
    }

    fn has_existing_evaluation(&self, novel_id: &str) -> Result<bool> {
        Ok(read(&self.evaluations)?
            .iter()
            .any(|e| e.novel_id == novel_id))
    }

    fn save_evaluation(
        &self,
        novel_id: &str,
        episode_id: Option<&str>,
        response: &EvaluationResponse,
    ) -> Result<i64> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        write(&self.evaluations)?.push(EvaluationRecord {
            id,
            novel_id: novel_id.to_string(),
            episode_id: episode_id.map(String::from),
            evaluation_date: Utc::now(),
            overall_score: response.overall_score,
            story_score: Some(response.story_score),
            writing_score: Some(response.writing_score),
            character_score: Some(response.character_score),
            feedback: Some(response.feedback.clone()),
        });
        Ok(id)
    }

    fn get_evaluations(&self, novel_id: &str) -> Result<Vec<EvaluationRecord>> {
        let mut records: Vec<EvaluationRecord> = read(&self.evaluations)?
            .iter()
            .filter(|e| e.novel_id == novel_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.evaluation_date
                .cmp(&a.evaluation_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    fn get_evaluation_results(&self, limit: usize) -> Result<Vec<EvaluationResult>> {
        let novels = read(&self.novels)?;
        let evaluations = read(&self.evaluations)?;

        let mut results: Vec<(i64, EvaluationResult)> = evaluations
            .iter()
            .filter_map(|e| {
                let novel = novels.get(&e.novel_id)?;
                Some((
                    e.id,
                    EvaluationResult {
                        novel_id: novel.id.clone(),
                        title: novel.title.clone(),
                        author: novel.author.clone(),
                        ranking: novel.ranking_position,
                        overall_score: e.overall_score,
                        story_score: e.story_score,
                        writing_score: e.writing_score,
                        character_score: e.character_score,
                        feedback: e.feedback.clone().unwrap_or_default(),
                        evaluation_date: e.evaluation_date,
                    },
                ))
            })
            .collect();

        results.sort_by(|(a_id, a), (b_id, b)| {
            b.overall_score
                .total_cmp(&a.overall_score)
                .then_with(|| b.evaluation_date.cmp(&a.evaluation_date))
                .then_with(|| b_id.cmp(a_id))
        });

        Ok(results
            .into_iter()
            .take(limit)
            .map(|(_, result)| result)
            .collect())
    }

    fn count_novels(&self) -> Result<usize> {
        Ok(read(&self.novels)?.len())
    }
}

// ============================================================================
// Shared Repository Types
// ============================================================================

/// Thread-safe shared repository wrapper
pub type SharedNovelRepository = Arc<dyn NovelRepository>;

/// Create a shared SQLite repository
pub fn create_sqlite_repository(path: impl AsRef<Path>) -> Result<SharedNovelRepository> {
    let repo = SqliteNovelRepository::new(path)?;
    Ok(Arc::new(repo))
}

/// Create a shared mock repository
pub fn create_mock_repository() -> SharedNovelRepository {
    Arc::new(MockNovelRepository::new())
}

// ============================================================================
// Tests
// ============================================================================
