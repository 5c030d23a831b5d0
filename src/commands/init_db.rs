use anyhow::Result;

use kakuhyo::config::Config;
use kakuhyo::storage::open_repository;

/// Create the database file and schema
pub fn init_db(config: &Config) -> Result<()> {
    let repo = open_repository(&config.database)?;
    let novels = repo.count_novels()?;

    println!(
        "Database ready: {} ({novels} novels)",
        config.database.sqlite_path.display()
    );
    tracing::info!(path = %config.database.sqlite_path.display(), novels, "Database initialized");
    Ok(())
}
