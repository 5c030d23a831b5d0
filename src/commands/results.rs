use std::fmt::Write;

use anyhow::Result;

use kakuhyo::config::Config;
use kakuhyo::models::EvaluationResult;
use kakuhyo::storage::{export_evaluation_results_to_csv, open_repository};
use kakuhyo::utils::{format_score, truncate_text};

/// Show the top `limit` evaluations and export all of them to CSV
pub fn results(config: &Config, limit: usize) -> Result<()> {
    let repo = open_repository(&config.database)?;
    let results = repo.get_evaluation_results(limit)?;

    if results.is_empty() {
        println!("No evaluation results found");
        return Ok(());
    }

    println!("Evaluation Results (top {})", results.len());
    println!("==========================");
    for (i, result) in results.iter().enumerate() {
        print!(
            "{}",
            format_result(i + 1, result, config.export.feedback_preview_chars)
        );
    }

    let path = &config.export.csv_path;
    let rows = export_evaluation_results_to_csv(repo.as_ref(), path)?;
    println!("Exported {rows} results to {}", path.display());

    Ok(())
}

/// Render one result block with Japanese labels
pub fn format_result(index: usize, result: &EvaluationResult, preview_chars: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{index}. {} / {}", result.title, result.author);
    let _ = writeln!(out, "   ランキング: {}位", result.ranking);
    let _ = writeln!(
        out,
        "   総合評価: {}/10",
        format_score(Some(result.overall_score))
    );
    let _ = writeln!(out, "   ストーリー: {}", format_score(result.story_score));
    let _ = writeln!(out, "   文章力: {}", format_score(result.writing_score));
    let _ = writeln!(out, "   キャラクター: {}", format_score(result.character_score));
    let _ = writeln!(
        out,
        "   評価日: {}",
        result.evaluation_date.format("%Y-%m-%d %H:%M:%S")
    );
    if !result.feedback.is_empty() {
        let _ = writeln!(
            out,
            "   評価コメント: {}",
            truncate_text(&result.feedback, preview_chars)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_format_result() {
        let result = EvaluationResult {
            novel_id: "1".to_string(),
            title: "題名".to_string(),
            author: "作者".to_string(),
            ranking: 3,
            overall_score: 7.5,
            story_score: Some(8.0),
            writing_score: None,
            character_score: Some(6.0),
            feedback: "あ".repeat(150),
            evaluation_date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let text = format_result(1, &result, 100);
        assert!(text.contains("1. 題名 / 作者"));
        assert!(text.contains("ランキング: 3位"));
        assert!(text.contains("総合評価: 7.5/10"));
        assert!(text.contains("文章力: -"));
        assert!(text.contains("評価日: 2024-05-01 12:00:00"));

        let comment = text
            .lines()
            .find(|l| l.contains("評価コメント"))
            .unwrap();
        assert!(comment.ends_with("..."));
        assert_eq!(comment.trim_start().chars().count(), "評価コメント: ".chars().count() + 100);
    }
}
