//! Score extraction from raw LLM replies

use kakuhyo::llm::extract::{extract, extract_detailed, ExtractionOutcome, DEFAULT_SCORE};

fn assert_sentinel(raw: &str) {
    let response = extract(raw);
    assert_eq!(response.overall_score, 0.0);
    assert_eq!(response.story_score, 0.0);
    assert_eq!(response.writing_score, 0.0);
    assert_eq!(response.character_score, 0.0);
    assert!(
        response.feedback.starts_with("failed to parse evaluation response"),
        "unexpected feedback: {}",
        response.feedback
    );
}

#[test]
fn test_fenced_block_exact_values() {
    let raw = r#"評価は以下の通りです。

```json
{
  "overall_score": 7.5,
  "story_score": 8.0,
  "writing_score": 6.5,
  "character_score": 7.0,
  "feedback": "テンポが良く、続きが気になる作品です。"
}
```

以上です。"#;

    let extraction = extract_detailed(raw);
    assert_eq!(extraction.outcome, ExtractionOutcome::Parsed);

    let response = extraction.response;
    assert_eq!(response.overall_score, 7.5);
    assert_eq!(response.story_score, 8.0);
    assert_eq!(response.writing_score, 6.5);
    assert_eq!(response.character_score, 7.0);
    assert_eq!(response.feedback, "テンポが良く、続きが気になる作品です。");
}

#[test]
fn test_untagged_fence() {
    let raw = "```\n{\"overall_score\": 6, \"story_score\": 6, \"writing_score\": 6, \
               \"character_score\": 6, \"feedback\": \"普通\"}\n```";
    assert_eq!(extract(raw).overall_score, 6.0);
}

#[test]
fn test_bare_json_fallback() {
    let raw = "  {\"overall_score\": 9, \"story_score\": 8, \"writing_score\": 9.5, \
               \"character_score\": 8.5, \"feedback\": \"傑作\"}  ";
    let response = extract(raw);
    assert_eq!(response.writing_score, 9.5);
    assert_eq!(response.feedback, "傑作");
}

#[test]
fn test_no_json_yields_sentinel() {
    assert_sentinel("申し訳ありませんが、この作品は評価できません。");
}

#[test]
fn test_empty_reply_yields_sentinel() {
    assert_sentinel("");
}

#[test]
fn test_string_score_is_coerced() {
    let raw = r#"{"overall_score": 7, "story_score": "7.5", "writing_score": 6,
                  "character_score": 8, "feedback": "ok"}"#;
    let extraction = extract_detailed(raw);
    assert_eq!(extraction.outcome, ExtractionOutcome::Parsed);
    assert_eq!(extraction.response.story_score, 7.5);
}

#[test]
fn test_unreadable_score_is_repaired() {
    let raw = r#"{"overall_score": 7, "story_score": "not-a-number", "writing_score": 6,
                  "character_score": 8, "feedback": "ok"}"#;
    let extraction = extract_detailed(raw);

    assert_eq!(
        extraction.outcome,
        ExtractionOutcome::Repaired {
            fields: vec!["story_score".to_string()]
        }
    );
    let response = extraction.response;
    assert_eq!(response.story_score, DEFAULT_SCORE);
    assert_eq!(response.overall_score, 7.0);
    assert_eq!(response.writing_score, 6.0);
    assert_eq!(response.character_score, 8.0);
    assert_eq!(response.feedback, "ok");
}

#[test]
fn test_missing_feedback_yields_sentinel() {
    assert_sentinel(
        r#"{"overall_score": 7, "story_score": 7, "writing_score": 7, "character_score": 7}"#,
    );
}

#[test]
fn test_non_object_yields_sentinel() {
    assert_sentinel("[1, 2, 3]");
}

#[test]
fn test_long_feedback_is_not_truncated() {
    let feedback = "長".repeat(500);
    let raw = format!(
        r#"{{"overall_score": 5, "story_score": 5, "writing_score": 5, "character_score": 5, "feedback": "{feedback}"}}"#
    );
    assert_eq!(extract(&raw).feedback, feedback);
}
