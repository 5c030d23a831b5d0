//! Parsing of ranking, work and episode pages from fixtures

mod common;

use common::fixture;
use kakuhyo::parser::normalize::{EMPHASIS_END, EMPHASIS_START};
use kakuhyo::parser::ranking::UNKNOWN_AUTHOR;
use kakuhyo::parser::{
    extract_episode_body, extract_episode_refs, extract_episode_title, parse_ranking,
};
use url::Url;

fn base() -> Url {
    Url::parse("https://kakuyomu.jp").unwrap()
}

#[test]
fn test_parse_ranking_fixture() {
    let entries = parse_ranking(&fixture("ranking.html"), &base(), 100);

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].id, "1177354054880000001");
    assert_eq!(entries[0].title, "異世界で食堂を開いたら");
    assert_eq!(entries[0].author, "山田太郎");
    assert_eq!(
        entries[0].novel_url,
        "https://kakuyomu.jp/works/1177354054880000001"
    );
    assert_eq!(entries[1].author, UNKNOWN_AUTHOR);

    let positions: Vec<u32> = entries.iter().map(|e| e.ranking_position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[test]
fn test_parse_ranking_limit() {
    let entries = parse_ranking(&fixture("ranking.html"), &base(), 2);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].id, "1177354054880000002");
}

#[test]
fn test_parse_ranking_empty_page() {
    assert!(parse_ranking("<html><body></body></html>", &base(), 10).is_empty());
}

#[test]
fn test_extract_episode_refs_fixture() {
    let refs = extract_episode_refs(&fixture("work.html"));

    let ids: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1001", "1002", "1003"]);
    assert_eq!(refs[0].title, "第1話 \"はじまり\"");
    assert_eq!(refs[1].title, "第2話 市場へ");
}

#[test]
fn test_extract_episode_body_fixture() {
    let body = extract_episode_body(&fixture("episode.html")).unwrap();

    assert!(body.starts_with("目が覚めると、そこは｜異世界《いせかい》だった。\r\n"));
    assert!(body.contains(&format!("これは{EMPHASIS_START}本当{EMPHASIS_END}の話だ。")));
    assert!(body.contains("値段は\\100、<特売>&あ"));
    assert!(!body.contains("<p"));
    assert!(body.ends_with("\r\n"));
}

#[test]
fn test_extract_episode_body_without_paragraphs() {
    assert!(extract_episode_body("<html><body><div>本文なし</div></body></html>").is_none());
}

#[test]
fn test_extract_episode_title_fixture() {
    assert_eq!(
        extract_episode_title(&fixture("episode.html")).as_deref(),
        Some("第1話 はじまり")
    );
}
