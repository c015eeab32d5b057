//! Integration tests for the identify flow.
//!
//! Drives `ComicWikiSource::identify` against a mock search endpoint and mock
//! wiki pages served from fixtures.

use std::sync::Arc;

use chrono::NaiveDate;
use comicwiki_core::{
    COMICWIKI_ID, ComicWikiSource, CoverUrlCache, HttpPageFetcher, InMemoryCoverCache, Query,
    collect_ranked,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;
use support::{KLO_1, NOT_FOUND, SEARCH_KLO, SEARCH_LOISEL_KLO, config_for, init_tracing};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

fn source_for(server: &MockServer, cache: Arc<InMemoryCoverCache>) -> ComicWikiSource {
    let fetcher = HttpPageFetcher::new(std::time::Duration::from_secs(2)).unwrap();
    ComicWikiSource::with_parts(config_for(server), Arc::new(fetcher), cache).unwrap()
}

async fn mount_detail_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/wiki/Klo_1"))
        .respond_with(html(KLO_1))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wiki/Klo_2"))
        .respond_with(html(NOT_FOUND))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_identify_klo_by_loisel_end_to_end() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "site:comicwiki.dk Klo"))
        .respond_with(html(SEARCH_KLO))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "site:comicwiki.dk Régis Loisel Klo"))
        .respond_with(html(SEARCH_LOISEL_KLO))
        .expect(1)
        .mount(&server)
        .await;
    mount_detail_pages(&server).await;

    let cache = Arc::new(InMemoryCoverCache::new());
    let source = source_for(&server, Arc::clone(&cache));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let stats = source
        .identify(
            &Query::with_title("Klo").author("Régis Loisel"),
            &tx,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(stats.candidates, 2);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.failed, 1);

    let records = collect_ranked(&mut rx);
    assert_eq!(records.len(), 1, "only the parsable page yields a record");
    let record = &records[0];
    assert_eq!(record.source_identifier, format!("{}/wiki/Klo_1", server.uri()));
    assert_eq!(record.relevance, 0);
    assert_eq!(record.title.as_deref(), Some("Klo 1: Den forkælede prinsesse"));
    assert_eq!(record.authors, vec!["Régis Loisel", "Jean-Louis Tripp"]);
    assert_eq!(record.isbn.as_deref(), Some("9788792910046"));
    assert_eq!(record.publisher.as_deref(), Some("Faraos Cigarer"));
    assert_eq!(record.series.as_deref(), Some("Klo"));
    assert_eq!(record.series_index.as_deref(), Some("1"));
    assert_eq!(record.pubdate, NaiveDate::from_ymd_opt(2011, 1, 1));
    assert_eq!(
        record.comments.as_deref(),
        Some("Prinsessen er forkælet, og Klo må rydde op.")
    );
    assert_eq!(record.tags, vec!["Comic", "Graphic Novel"]);

    let cover_url = format!("{}/images/6/6f/Klo1.jpg", server.uri());
    assert_eq!(record.cover_url.as_deref(), Some(cover_url.as_str()));
    assert_eq!(cache.get_cover_url("9788792910046"), Some(cover_url));

    let identifiers = record.identifiers();
    assert_eq!(identifiers.get("isbn").map(String::as_str), Some("9788792910046"));
}

#[tokio::test]
async fn test_title_only_query_issues_single_search() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "site:comicwiki.dk Klo"))
        .respond_with(html(SEARCH_KLO))
        .expect(1)
        .mount(&server)
        .await;
    mount_detail_pages(&server).await;

    let source = source_for(&server, Arc::new(InMemoryCoverCache::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let stats = source
        .identify(&Query::with_title("Klo"), &tx, &CancellationToken::new())
        .await;

    assert_eq!(stats.candidates, 2);
    assert_eq!(collect_ranked(&mut rx).len(), 1);
    let searches = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/search")
        .count();
    assert_eq!(searches, 1);
}

#[tokio::test]
async fn test_preset_identifier_without_title_skips_search() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(SEARCH_KLO))
        .expect(0)
        .mount(&server)
        .await;
    mount_detail_pages(&server).await;

    let source = source_for(&server, Arc::new(InMemoryCoverCache::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let page = format!("{}/wiki/Klo_1", server.uri());

    source
        .identify(
            &Query::default().identifier(COMICWIKI_ID, page.as_str()),
            &tx,
            &CancellationToken::new(),
        )
        .await;

    let records = collect_ranked(&mut rx);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_identifier, page);
    assert_eq!(records[0].relevance, 0);
}

#[tokio::test]
async fn test_latin1_search_page_still_yields_candidates() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    let mut results = b"<html><head><title>site:comicwiki.dk Klo - Google-s\xf8gning</title></head><body>".to_vec();
    results.extend_from_slice(br#"<div class="g"><a href="/wiki/Klo_1">Klo 1</a></div></body></html>"#);
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(results, "text/html; charset=ISO-8859-1"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_detail_pages(&server).await;

    let source = source_for(&server, Arc::new(InMemoryCoverCache::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let stats = source
        .identify(&Query::with_title("Klo"), &tx, &CancellationToken::new())
        .await;

    assert_eq!(stats.candidates, 1);
    let records = collect_ranked(&mut rx);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_identifier, format!("{}/wiki/Klo_1", server.uri()));
    assert_eq!(records[0].title.as_deref(), Some("Klo 1: Den forkælede prinsesse"));
}

#[tokio::test]
async fn test_search_failure_yields_empty_result() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let source = source_for(&server, Arc::new(InMemoryCoverCache::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let stats = source
        .identify(
            &Query::with_title("Klo").author("Régis Loisel"),
            &tx,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(stats.candidates, 0);
    assert!(collect_ranked(&mut rx).is_empty());
}

#[tokio::test]
async fn test_cancelled_identify_makes_no_requests() {
    init_tracing();
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    let source = source_for(&server, Arc::new(InMemoryCoverCache::new()));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = source
        .identify(&Query::with_title("Klo"), &tx, &cancel)
        .await;

    assert_eq!(stats.spawned, 0);
    assert!(collect_ranked(&mut rx).is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}
