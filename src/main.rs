mod commands;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use kakuhyo::config::Config;

#[derive(Parser)]
#[command(
    name = "kakuhyo",
    version,
    about = "Kakuyomu daily-ranking scraper with LLM-based novel evaluation",
    long_about = None
)]
struct Cli {
    /// Runs scrape, evaluate and results when omitted
    #[command(subcommand)]
    command: Option<Commands>,

    /// Number of ranked works to process
    #[arg(short, long, global = true, default_value = "100")]
    limit: usize,

    /// TOML configuration file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the daily ranking and store works with their episodes
    Scrape,

    /// Evaluate stored works that have no evaluation yet
    Evaluate,

    /// Show evaluation results and export them to CSV
    Results,

    /// Print the daily ranking
    Ranking {
        /// Also write the ranking to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create the database schema
    InitDb,

    /// Scrape, evaluate and show results
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(
        &log_format,
        cli.verbose,
        &config.logging.level,
        config.logging.file.as_deref(),
    )?;

    tracing::info!(limit = cli.limit, "kakuhyo starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Scrape => {
            tracing::info!(limit = cli.limit, "Starting scrape command");
            commands::scrape(&config, cli.limit).await?;
        }
        Commands::Evaluate => {
            tracing::info!(limit = cli.limit, "Starting evaluate command");
            commands::evaluate(&config, cli.limit).await?;
        }
        Commands::Results => {
            commands::results(&config, cli.limit)?;
        }
        Commands::Ranking { output } => {
            tracing::info!(limit = cli.limit, output = ?output, "Starting ranking command");
            commands::ranking(&config, cli.limit, output.as_deref()).await?;
        }
        Commands::InitDb => {
            commands::init_db(&config)?;
        }
        Commands::Run => {
            tracing::info!(limit = cli.limit, "Starting full run");
            commands::run(&config, cli.limit).await?;
        }
    }

    tracing::info!("kakuhyo completed successfully");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // The key is never written to config files
    if config.llm.api_key.is_none() {
        config.llm.api_key = std::env::var("LLM_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn setup_tracing(format: &str, verbose: bool, level: &str, file: Option<&Path>) -> Result<()> {
    let env_filter = if verbose {
        EnvFilter::new("kakuhyo=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("kakuhyo={level},warn")))
    };

    let file_layer = match file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .boxed(),
            )
        }
        None => None,
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    Ok(())
}
