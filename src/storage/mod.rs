//! Persistence for works, episodes and evaluations
//!
//! This module handles data persistence with SQLite and CSV export of
//! evaluation results.

pub mod export;
pub mod repository;

use anyhow::{Context, Result};

use crate::config::DatabaseConfig;

pub use export::{export_evaluation_results_to_csv, write_ranking_csv};
pub use repository::{
    create_mock_repository, create_sqlite_repository, MockNovelRepository, NovelRepository,
    SharedNovelRepository, SqliteNovelRepository,
};

/// Open the configured SQLite database, creating the schema if needed
pub fn open_repository(config: &DatabaseConfig) -> Result<SharedNovelRepository> {
    create_sqlite_repository(&config.sqlite_path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.sqlite_path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_repository_creates_schema() {
        let dir = tempdir().unwrap();
        let config = DatabaseConfig {
            sqlite_path: dir.path().join("data").join("novels.db"),
        };

        let repo = open_repository(&config).unwrap();
        assert_eq!(repo.count_novels().unwrap(), 0);
        assert!(config.sqlite_path.exists());
    }
}
