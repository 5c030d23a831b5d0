//! Structured score extraction from free-form LLM output
//!
//! Extraction walks a fixed ladder and never fails:
//!
//! 1. candidate search: fenced `{...}` block, else the whole trimmed text
//! 2. JSON parse and required-key check; failure yields the sentinel
//! 3. per-field numeric coercion; an unreadable score becomes
//!    [`DEFAULT_SCORE`] while the rest of the record is kept

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::models::EvaluationResponse;
use crate::utils::truncate_text;

/// Substitute for a single score that cannot be read as a number
pub const DEFAULT_SCORE: f64 = 5.0;

/// Score keys, in record order
pub const SCORE_FIELDS: [&str; 4] = [
    "overall_score",
    "story_score",
    "writing_score",
    "character_score",
];

/// Free-text key
pub const FEEDBACK_FIELD: &str = "feedback";

static FENCED_OBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(\{.*?\})\s*```").unwrap());

/// A way of locating the JSON candidate in raw text
type CandidateStrategy = fn(&str) -> Option<&str>;

/// Candidate strategies, tried in order until one yields text
const CANDIDATE_STRATEGIES: &[(&str, CandidateStrategy)] = &[
    ("fenced_block", fenced_block),
    ("whole_text", whole_text),
];

fn fenced_block(raw: &str) -> Option<&str> {
    FENCED_OBJECT_REGEX
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn whole_text(raw: &str) -> Option<&str> {
    Some(raw.trim())
}

/// How an extraction ended
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    /// Every field was read as given
    Parsed,
    /// Structure was valid but these score fields fell back to the default
    Repaired { fields: Vec<String> },
    /// Nothing usable; the response is the sentinel
    Failed { reason: String },
}

/// Extraction result with its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub response: EvaluationResponse,
    pub outcome: ExtractionOutcome,
}

impl Extraction {
    /// Whether the response is the sentinel
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Failed { .. })
    }

    fn failed(reason: String) -> Self {
        Self {
            response: EvaluationResponse::sentinel(format!(
                "failed to parse evaluation response: {reason}"
            )),
            outcome: ExtractionOutcome::Failed { reason },
        }
    }
}

/// Extract an [`EvaluationResponse`] from raw LLM output
///
/// # Examples
///
/// ```
/// use kakuhyo::llm::extract::extract;
///
/// let raw = "```json\n{\"overall_score\": 7, \"story_score\": 6.5, \"writing_score\": \"8\",\
///            \"character_score\": 7, \"feedback\": \"良い\"}\n```";
/// let response = extract(raw);
/// assert_eq!(response.writing_score, 8.0);
/// ```
pub fn extract(raw: &str) -> EvaluationResponse {
    extract_detailed(raw).response
}

/// Extract and report which rung of the ladder produced the result
pub fn extract_detailed(raw: &str) -> Extraction {
    let Some((strategy, candidate)) = CANDIDATE_STRATEGIES
        .iter()
        .find_map(|(name, strategy)| strategy(raw).map(|c| (*name, c)))
    else {
        return Extraction::failed("no candidate text".to_string());
    };

    tracing::debug!(
        strategy,
        candidate = %truncate_text(candidate, 200),
        "Located evaluation candidate"
    );

    let object = match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            return Extraction::failed(format!("expected a JSON object, got {}", type_name(&other)))
        }
        Err(e) => return Extraction::failed(format!("invalid JSON: {e}")),
    };

    if let Some(missing) = SCORE_FIELDS
        .iter()
        .chain(std::iter::once(&FEEDBACK_FIELD))
        .find(|key| !object.contains_key(**key))
    {
        return Extraction::failed(format!("missing required field: {missing}"));
    }

    build_response(&object)
}

fn build_response(object: &Map<String, Value>) -> Extraction {
    let mut repaired = Vec::new();
    let mut scores = [0.0_f64; 4];

    for (slot, key) in scores.iter_mut().zip(SCORE_FIELDS) {
        *slot = match coerce_score(&object[key]) {
            Some(value) => value,
            None => {
                tracing::warn!(field = key, value = %object[key], "Unreadable score, using default");
                repaired.push(key.to_string());
                DEFAULT_SCORE
            }
        };
    }

    let feedback = match &object[FEEDBACK_FIELD] {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };

    let [overall_score, story_score, writing_score, character_score] = scores;
    let outcome = if repaired.is_empty() {
        ExtractionOutcome::Parsed
    } else {
        ExtractionOutcome::Repaired { fields: repaired }
    };

    Extraction {
        response: EvaluationResponse {
            overall_score,
            story_score,
            writing_score,
            character_score,
            feedback,
        },
        outcome,
    }
}

fn coerce_score(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
