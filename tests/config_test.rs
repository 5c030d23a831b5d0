//! Configuration loading from the environment and TOML files

use std::path::PathBuf;

use kakuhyo::config::Config;
use serial_test::serial;

const VARS: &[&str] = &[
    "KAKUYOMU_BASE_URL",
    "SCRAPE_INTERVAL",
    "MAX_RETRIES",
    "REQUEST_TIMEOUT",
    "USER_AGENT",
    "EPISODES_PER_WORK",
    "DATABASE_PATH",
    "LLM_API_KEY",
    "LLM_ENDPOINT",
    "LLM_MODEL",
    "LLM_TEMPERATURE",
    "LLM_MAX_TOKENS",
    "LLM_TIMEOUT",
    "EPISODES_PER_EVALUATION",
    "MAX_EPISODE_CHARS",
    "PERSIST_FAILED_EVALUATIONS",
    "LOG_LEVEL",
    "LOG_FORMAT",
    "LOG_FILE",
    "RESULTS_CSV",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();

    assert_eq!(config.scraper.base_url, "https://kakuyomu.jp");
    assert_eq!(config.scraper.max_retries, 3);
    assert_eq!(config.database.sqlite_path, PathBuf::from("data/novels.db"));
    assert!(config.llm.api_key.is_none());
    assert_eq!(config.evaluation.episodes_per_evaluation, 3);
    assert_eq!(config.evaluation.max_episode_chars, Some(7700));
    assert!(!config.evaluation.persist_failed);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_overrides() {
    clear_env();
    std::env::set_var("LLM_API_KEY", "sk-env");
    std::env::set_var("LLM_MODEL", "gpt-4o-mini");
    std::env::set_var("SCRAPE_INTERVAL", "2.5");
    std::env::set_var("EPISODES_PER_EVALUATION", "1");
    std::env::set_var("DATABASE_PATH", "/tmp/kakuhyo.db");
    std::env::set_var("PERSIST_FAILED_EVALUATIONS", "true");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.scraper.request_interval_secs, 2.5);
    assert_eq!(config.evaluation.episodes_per_evaluation, 1);
    assert_eq!(config.database.sqlite_path, PathBuf::from("/tmp/kakuhyo.db"));
    assert!(config.evaluation.persist_failed);
}

#[test]
#[serial]
fn test_unparsable_values_keep_defaults() {
    clear_env();
    std::env::set_var("MAX_RETRIES", "many");
    std::env::set_var("LLM_API_KEY", "   ");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.scraper.max_retries, 3);
    assert!(config.llm.api_key.is_none());
}

#[test]
#[serial]
fn test_truncation_can_be_disabled() {
    for value in ["0", "none", "NONE"] {
        clear_env();
        std::env::set_var("MAX_EPISODE_CHARS", value);
        let config = Config::from_env().unwrap();
        assert_eq!(config.evaluation.max_episode_chars, None, "value {value}");
    }

    std::env::set_var("MAX_EPISODE_CHARS", "5000");
    let config = Config::from_env().unwrap();
    clear_env();
    assert_eq!(config.evaluation.max_episode_chars, Some(5000));
}

#[test]
fn test_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kakuhyo.toml");
    std::fs::write(
        &path,
        r#"
[scraper]
request_interval_secs = 0.5
episodes_per_work = 1

[database]
sqlite_path = "work/db.sqlite"

[export]
csv_path = "out/results.csv"
"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.scraper.request_interval_secs, 0.5);
    assert_eq!(config.scraper.episodes_per_work, 1);
    assert_eq!(config.database.sqlite_path, PathBuf::from("work/db.sqlite"));
    assert_eq!(config.export.csv_path, PathBuf::from("out/results.csv"));
    assert_eq!(config.export.feedback_preview_chars, 100);
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_file_invalid_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[scraper\nbase_url = ").unwrap();

    assert!(Config::from_file(&path).is_err());
    assert!(Config::from_file(&dir.path().join("missing.toml")).is_err());
}
