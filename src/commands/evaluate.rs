use std::sync::Arc;

use anyhow::{Context, Result};

use kakuhyo::config::Config;
use kakuhyo::evaluator::{BatchSummary, NovelEvaluator};
use kakuhyo::llm::LlmClient;
use kakuhyo::storage::open_repository;

/// Evaluate up to `limit` stored works that have no evaluation yet
pub async fn evaluate(config: &Config, limit: usize) -> Result<BatchSummary> {
    println!("Starting Evaluation");
    println!("===================");

    let repo = open_repository(&config.database)?;
    let client =
        LlmClient::with_config(config.llm.clone()).context("Failed to create LLM client")?;

    if !client.has_api_key() {
        println!("Warning: LLM_API_KEY is not set; evaluations will fail");
    }

    let evaluator = NovelEvaluator::new(repo, Arc::new(client), &config.evaluation)?;
    let summary = evaluator.evaluate_pending(limit).await?;

    println!();
    println!("Evaluation Complete");
    println!("===================");
    println!("  Evaluated: {}", summary.evaluated);
    println!("  Skipped:   {}", summary.skipped);
    println!("  Failed:    {}", summary.failed);

    Ok(summary)
}
