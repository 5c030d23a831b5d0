//! Evaluation orchestration
//!
//! Loads a stored work and its leading episodes, asks the LLM for a review,
//! extracts scores and persists them against the first episode. Works run
//! strictly one at a time.

use std::fmt;
use std::sync::Arc;

use crate::config::EvaluationConfig;
use crate::error::{Error, KakuhyoErrorTrait, Result};
use crate::llm::{extract_detailed, ChatCompletion, ExtractionOutcome, PromptBuilder, SYSTEM_PROMPT};
use crate::models::EvaluationResponse;
use crate::storage::SharedNovelRepository;
use crate::utils::error::LlmError;

/// Feedback stored when no API key is configured
pub const MISSING_API_KEY_FEEDBACK: &str = "API key not configured";

/// Why a work was not sent to the LLM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    AlreadyEvaluated,
    NoEpisodes,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NotFound => "novel not found",
            Self::AlreadyEvaluated => "already evaluated",
            Self::NoEpisodes => "no episodes stored",
        };
        f.write_str(text)
    }
}

/// Result of evaluating one work
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// Scores extracted and stored
    Evaluated {
        response: EvaluationResponse,
        evaluation_id: i64,
    },
    /// Nothing sent to the LLM
    Skipped(SkipReason),
    /// The LLM call or extraction failed; the sentinel is stored only when
    /// failed evaluations are persisted. `retryable` is set when a later run
    /// may succeed.
    Failed {
        response: EvaluationResponse,
        evaluation_id: Option<i64>,
        retryable: bool,
    },
}

/// Tally of a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failures a later run may fix
    pub retryable: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.evaluated + self.skipped + self.failed
    }

    fn record(&mut self, outcome: &EvaluationOutcome) {
        match outcome {
            EvaluationOutcome::Evaluated { .. } => self.evaluated += 1,
            EvaluationOutcome::Skipped(_) => self.skipped += 1,
            EvaluationOutcome::Failed { retryable, .. } => {
                self.failed += 1;
                if *retryable {
                    self.retryable += 1;
                }
            }
        }
    }
}

/// Novel evaluation engine
pub struct NovelEvaluator {
    repo: SharedNovelRepository,
    llm: Arc<dyn ChatCompletion>,
    prompt: PromptBuilder,
    persist_failed: bool,
}

impl NovelEvaluator {
    pub fn new(
        repo: SharedNovelRepository,
        llm: Arc<dyn ChatCompletion>,
        config: &EvaluationConfig,
    ) -> Result<Self> {
        let prompt = PromptBuilder::new(config.episodes_per_evaluation, config.max_episode_chars)?;
        Ok(Self {
            repo,
            llm,
            prompt,
            persist_failed: config.persist_failed,
        })
    }

    /// Evaluate one stored work
    ///
    /// Storage errors propagate; LLM and extraction failures are reported as
    /// [`EvaluationOutcome::Failed`].
    pub async fn evaluate_novel(&self, novel_id: &str) -> Result<EvaluationOutcome> {
        let Some(novel) = self.repo.get_novel(novel_id)? else {
            tracing::error!(novel_id, "Novel not found");
            return Ok(EvaluationOutcome::Skipped(SkipReason::NotFound));
        };

        if self.repo.has_existing_evaluation(novel_id)? {
            tracing::info!(novel_id, title = %novel.title, "Already evaluated, skipping");
            return Ok(EvaluationOutcome::Skipped(SkipReason::AlreadyEvaluated));
        }

        let episodes = self.repo.get_novel_episodes(novel_id, self.prompt.slots())?;
        let Some(first_episode) = episodes.first() else {
            tracing::error!(novel_id, "No episodes found");
            return Ok(EvaluationOutcome::Skipped(SkipReason::NoEpisodes));
        };

        let prompt = self.prompt.render(&novel, &episodes)?;
        tracing::info!(
            novel_id,
            title = %novel.title,
            author = %novel.author,
            episodes = episodes.len(),
            "Evaluating novel"
        );

        let (response, failed, retryable) = match self.llm.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => {
                let extraction = extract_detailed(&raw);
                match &extraction.outcome {
                    ExtractionOutcome::Parsed => {}
                    ExtractionOutcome::Repaired { fields } => {
                        tracing::warn!(novel_id, ?fields, "Scores repaired with default value");
                    }
                    ExtractionOutcome::Failed { reason } => {
                        tracing::error!(novel_id, reason = %reason, "Could not parse LLM response");
                    }
                }
                let failed = extraction.is_failed();
                (extraction.response, failed, false)
            }
            Err(LlmError::MissingApiKey) => {
                tracing::warn!(novel_id, "LLM API key not configured");
                (EvaluationResponse::sentinel(MISSING_API_KEY_FEEDBACK), true, false)
            }
            Err(e) => {
                let err = Error::from(e);
                tracing::error!(
                    novel_id,
                    category = err.category().as_str(),
                    recoverable = err.is_recoverable(),
                    error = %err,
                    "Error evaluating novel"
                );
                (
                    EvaluationResponse::sentinel(format!("evaluation request failed: {err}")),
                    true,
                    err.is_recoverable(),
                )
            }
        };

        if failed && !self.persist_failed {
            return Ok(EvaluationOutcome::Failed {
                response,
                evaluation_id: None,
                retryable,
            });
        }

        let evaluation_id =
            self.repo
                .save_evaluation(novel_id, Some(&first_episode.id), &response)?;

        if failed {
            return Ok(EvaluationOutcome::Failed {
                response,
                evaluation_id: Some(evaluation_id),
                retryable,
            });
        }

        tracing::info!(
            novel_id,
            title = %novel.title,
            overall_score = response.overall_score,
            "Evaluation complete"
        );
        Ok(EvaluationOutcome::Evaluated {
            response,
            evaluation_id,
        })
    }

    /// Evaluate works in order; storage errors count as failures
    pub async fn evaluate_batch(&self, novel_ids: &[String]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for novel_id in novel_ids {
            match self.evaluate_novel(novel_id).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    tracing::error!(
                        novel_id = %novel_id,
                        category = e.category().as_str(),
                        recoverable = e.is_recoverable(),
                        error = %e,
                        "Evaluation aborted"
                    );
                    summary.failed += 1;
                    if e.is_recoverable() {
                        summary.retryable += 1;
                    }
                }
            }
        }

        tracing::info!(
            evaluated = summary.evaluated,
            skipped = summary.skipped,
            failed = summary.failed,
            retryable = summary.retryable,
            "Batch evaluation finished"
        );
        summary
    }

    /// Evaluate up to `limit` works that have no evaluation yet
    pub async fn evaluate_pending(&self, limit: usize) -> Result<BatchSummary> {
        let ids: Vec<String> = self
            .repo
            .get_novels_for_evaluation(limit)?
            .into_iter()
            .map(|novel| novel.id)
            .collect();

        if ids.is_empty() {
            tracing::warn!("No novels found for evaluation");
        }

        Ok(self.evaluate_batch(&ids).await)
    }
}
