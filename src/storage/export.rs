//! CSV export of evaluation results and ranking listings
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet software detects
//! the encoding of Japanese titles.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use super::repository::NovelRepository;
use crate::models::{EvaluationResult, RankingEntry};
use crate::utils::format_score;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header of the evaluation results file
pub const RESULT_HEADERS: [&str; 10] = [
    "作品ID",
    "タイトル",
    "作者",
    "ランキング",
    "総合評価",
    "ストーリー",
    "文章力",
    "キャラクター",
    "評価日",
    "評価コメント",
];

/// Header of the ranking listing file
pub const RANKING_HEADERS: [&str; 3] = ["ランク", "タイトル", "URL"];

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write a single CSV row
pub fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            w.write_all(b",")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

fn create_csv(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(UTF8_BOM)?;
    Ok(writer)
}

fn result_row(result: &EvaluationResult) -> [String; 10] {
    [
        result.novel_id.clone(),
        result.title.clone(),
        result.author.clone(),
        result.ranking.to_string(),
        format_score(Some(result.overall_score)),
        format_score(result.story_score),
        format_score(result.writing_score),
        format_score(result.character_score),
        result.evaluation_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        result.feedback.clone(),
    ]
}

/// Write evaluation results to `path`; returns the number of data rows
pub fn write_evaluation_results(results: &[EvaluationResult], path: &Path) -> Result<usize> {
    let mut writer = create_csv(path)?;
    write_row(&mut writer, &RESULT_HEADERS)?;
    for result in results {
        write_row(&mut writer, &result_row(result))?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = results.len(), "Exported evaluation results");
    Ok(results.len())
}

/// Export every stored evaluation, best first
pub fn export_evaluation_results_to_csv(repo: &dyn NovelRepository, path: &Path) -> Result<usize> {
    let results = repo
        .get_evaluation_results(i64::MAX as usize)
        .context("Failed to load evaluation results")?;
    write_evaluation_results(&results, path)
}

/// Write a ranking listing (rank, title, URL)
pub fn write_ranking_csv(entries: &[RankingEntry], path: &Path) -> Result<usize> {
    let mut writer = create_csv(path)?;
    write_row(&mut writer, &RANKING_HEADERS)?;
    for entry in entries {
        write_row(
            &mut writer,
            &[
                entry.ranking_position.to_string(),
                entry.title.clone(),
                entry.novel_url.clone(),
            ],
        )?;
    }
    writer.flush()?;

    tracing::info!(path = %path.display(), rows = entries.len(), "Exported ranking");
    Ok(entries.len())
}
