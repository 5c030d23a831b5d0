//! End-to-end crawl against a mock site

mod common;

use common::{fast_fetcher, fixture};
use kakuhyo::crawler::KakuyomuCrawler;
use kakuhyo::storage::{create_sqlite_repository, NovelRepository};
use kakuhyo::utils::error::{CrawlerError, ParseError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WORK_ID: &str = "1177354054880000001";

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

async fn mock_site() -> MockServer {
    let server = MockServer::start().await;

    mount_html(&server, "/rankings/all/daily", fixture("ranking.html")).await;
    mount_html(&server, &format!("/works/{WORK_ID}"), fixture("work.html")).await;
    mount_html(
        &server,
        &format!("/works/{WORK_ID}/episodes/1001"),
        fixture("episode.html"),
    )
    .await;
    mount_html(
        &server,
        &format!("/works/{WORK_ID}/episodes/1003"),
        fixture("episode.html"),
    )
    .await;

    Mock::given(method("GET"))
        .and(path(format!("/works/{WORK_ID}/episodes/1002")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    mount_html(
        &server,
        "/works/1177354054880000002",
        "<html><body>目次なし</body></html>".to_string(),
    )
    .await;

    server
}

fn crawler(server: &MockServer) -> KakuyomuCrawler {
    KakuyomuCrawler::with_fetcher(fast_fetcher(1), &server.uri(), "/rankings/all/daily").unwrap()
}

#[tokio::test]
async fn test_daily_ranking_resolves_against_site() {
    let server = mock_site().await;
    let ranking = crawler(&server).get_daily_ranking(2).await.unwrap();

    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].id, WORK_ID);
    assert_eq!(
        ranking[0].novel_url,
        format!("{}/works/{WORK_ID}", server.uri())
    );
}

#[tokio::test]
async fn test_get_episodes_skips_failed_pages() {
    let server = mock_site().await;
    let episodes = crawler(&server).get_episodes(WORK_ID, 3).await.unwrap();

    let numbers: Vec<u32> = episodes.iter().map(|e| e.episode_number).collect();
    assert_eq!(numbers, vec![1, 3]);

    let first = &episodes[0];
    assert_eq!(first.id, format!("{WORK_ID}-1001"));
    assert_eq!(first.novel_id, WORK_ID);
    assert_eq!(first.title, "第1話 \"はじまり\"");
    assert!(first.content.contains("｜異世界《いせかい》"));
    assert_eq!(first.content_hash.as_ref().map(String::len), Some(64));
}

#[tokio::test]
async fn test_get_first_episode() {
    let server = mock_site().await;
    let episode = crawler(&server)
        .get_first_episode(WORK_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(episode.episode_number, 1);
}

#[tokio::test]
async fn test_work_without_episodes() {
    let server = mock_site().await;
    let err = crawler(&server)
        .get_episodes("1177354054880000002", 3)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlerError::Parse(ParseError::EpisodeNotFound(_))
    ));
}

#[tokio::test]
async fn test_scrape_and_store() {
    let server = mock_site().await;
    let crawler = crawler(&server);
    let dir = tempfile::tempdir().unwrap();
    let repo = create_sqlite_repository(dir.path().join("novels.db")).unwrap();

    let ranking = crawler.get_daily_ranking(1).await.unwrap();
    let work = crawler.scrape_work(ranking[0].clone(), 2).await.unwrap();
    repo.save_novel(&work.novel, &work.episodes).unwrap();

    let stored = repo.get_novel(WORK_ID).unwrap().unwrap();
    assert_eq!(stored.title, "異世界で食堂を開いたら");
    assert_eq!(stored.ranking_position, 1);

    let episodes = repo.get_novel_episodes(WORK_ID, 10).unwrap();
    assert_eq!(episodes.len(), 1);
    assert_eq!(episodes[0].content, work.episodes[0].content);
}
