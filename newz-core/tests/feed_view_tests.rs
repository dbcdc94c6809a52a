use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use newz_core::error::FEED_ERROR_MESSAGE;
use newz_core::{
    ApiClient, ApiConfig, Caches, Category, FeedKey, FeedView, FetchOutcome, Language,
    SourceFilter,
};
use reqwest::Client;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    let config = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        retry_attempts: 0,
        retry_delay_ms: 10,
        ..ApiConfig::default()
    };
    ApiClient::new(Client::new(), &config).unwrap()
}

fn page_body(range: Range<usize>, total: usize) -> Value {
    let articles: Vec<Value> = range
        .map(|i| {
            json!({
                "title": format!("Story {i}"),
                "description": format!("About story {i}"),
                "url": format!("http://news.test/{i}"),
                "source": { "name": if i % 2 == 0 { "Even Times" } else { "Odd Post" } }
            })
        })
        .collect();
    json!({ "articles": articles, "totalResults": total })
}

async fn mount_page(server: &MockServer, category: &str, page: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .and(query_param("category", category))
        .and(query_param("page", page.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn view(server: &MockServer, caches: &Caches, category: Category) -> FeedView {
    FeedView::new(
        api(server),
        caches.clone(),
        FeedKey::new(category, "us"),
        8,
        Language::En,
    )
}

#[tokio::test]
async fn first_page_is_served_from_cache_on_remount() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0..8, 20)))
        .expect(1)
        .mount(&server)
        .await;

    let caches = Caches::new();
    let first = view(&server, &caches, Category::General);
    assert_eq!(first.load_page(1).await, FetchOutcome::Loaded { page: 1, received: 8 });
    assert!(caches.pages.contains("general-us").await);
    assert_eq!(*first.progress().borrow(), 100);
    first.close();
    drop(first);

    let second = view(&server, &caches, Category::General);
    assert_eq!(second.load_page(1).await, FetchOutcome::CacheHit { articles: 8 });
    let state = second.snapshot();
    assert_eq!(state.articles.len(), 8);
    assert_eq!(state.total_results, 20);
    assert!(state.has_more);
    assert_eq!(*second.progress().borrow(), 100);
}

#[tokio::test]
async fn has_more_follows_loaded_count_against_total() {
    let server = MockServer::start().await;
    mount_page(&server, "general", 1, page_body(0..8, 20)).await;
    mount_page(&server, "general", 2, page_body(8..16, 20)).await;
    mount_page(&server, "general", 3, page_body(16..20, 20)).await;

    let caches = Caches::new();
    let feed = view(&server, &caches, Category::General);
    feed.load_page(1).await;
    assert!(feed.snapshot().has_more);

    assert_eq!(feed.load_more().await, FetchOutcome::Loaded { page: 2, received: 8 });
    assert!(feed.snapshot().has_more);

    assert_eq!(feed.load_more().await, FetchOutcome::Loaded { page: 3, received: 4 });
    let state = feed.snapshot();
    assert_eq!(state.articles.len(), 20);
    assert_eq!(state.page, 3);
    assert!(!state.has_more);
    assert_eq!(state.articles[19].url, "http://news.test/19");

    assert_eq!(feed.load_more().await, FetchOutcome::Skipped);

    // only page 1 is cached
    let cached = caches.pages.get("general-us").await.unwrap();
    assert_eq!(cached.articles.len(), 8);
}

#[tokio::test]
async fn empty_page_ends_the_feed_without_error() {
    let server = MockServer::start().await;
    mount_page(&server, "general", 1, page_body(0..8, 100)).await;
    mount_page(&server, "general", 2, json!({ "articles": [], "totalResults": 100 })).await;

    let feed = view(&server, &Caches::new(), Category::General);
    feed.load_page(1).await;
    assert_eq!(feed.load_more().await, FetchOutcome::Exhausted);

    let state = feed.snapshot();
    assert!(!state.has_more);
    assert!(state.error.is_none());
    assert_eq!(state.articles.len(), 8);
}

#[tokio::test]
async fn failed_page_keeps_loaded_articles_and_retry_recovers() {
    let server = MockServer::start().await;
    mount_page(&server, "general", 1, page_body(0..8, 16)).await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "boom" })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "general", 2, page_body(8..16, 16)).await;

    let caches = Caches::new();
    let feed = view(&server, &caches, Category::General);
    feed.load_page(1).await;
    assert_eq!(feed.load_more().await, FetchOutcome::Failed);

    let state = feed.snapshot();
    assert_eq!(state.error.as_deref(), Some(FEED_ERROR_MESSAGE));
    assert_eq!(state.articles.len(), 8);
    assert!(!state.has_more);
    assert!(!state.loading);

    assert_eq!(feed.retry().await, FetchOutcome::Loaded { page: 2, received: 8 });
    let state = feed.snapshot();
    assert!(state.error.is_none());
    assert_eq!(state.articles.len(), 16);
    assert!(!state.has_more);
}

#[tokio::test]
async fn failed_first_page_does_not_poison_the_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let caches = Caches::new();
    let feed = view(&server, &caches, Category::Business);
    assert_eq!(feed.load_page(1).await, FetchOutcome::Failed);
    assert!(caches.pages.is_empty().await);
    assert_eq!(*feed.progress().borrow(), 100);
}

#[tokio::test]
async fn rapid_page_advances_apply_a_single_fetch() {
    let server = MockServer::start().await;
    mount_page(&server, "general", 1, page_body(0..8, 100)).await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(8..16, 100))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let feed = view(&server, &Caches::new(), Category::General);
    feed.load_page(1).await;

    let (a, b) = tokio::join!(feed.load_more(), feed.load_more());
    let mut outcomes = [a, b];
    outcomes.sort_by_key(|o| matches!(o, FetchOutcome::Skipped));
    assert_eq!(outcomes[0], FetchOutcome::Loaded { page: 2, received: 8 });
    assert_eq!(outcomes[1], FetchOutcome::Skipped);

    let state = feed.snapshot();
    assert_eq!(state.articles.len(), 16);
    assert_eq!(state.page, 2);
}

#[tokio::test]
async fn switching_category_discards_the_stale_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .and(query_param("category", "general"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(0..8, 8))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_page(&server, "technology", 1, page_body(100..104, 4)).await;

    let caches = Caches::new();
    let feed = Arc::new(view(&server, &caches, Category::General));
    let slow = {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move { feed.load_page(1).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = feed.set_category(Category::Technology).await;
    assert_eq!(outcome, FetchOutcome::Loaded { page: 1, received: 4 });
    assert_eq!(slow.await.unwrap(), FetchOutcome::Superseded);

    let state = feed.snapshot();
    assert_eq!(state.key, FeedKey::new(Category::Technology, "us"));
    assert_eq!(state.articles.len(), 4);
    assert_eq!(state.articles[0].url, "http://news.test/100");
    assert!(!caches.pages.contains("general-us").await);

    // same key again is a no-op
    assert_eq!(feed.set_category(Category::Technology).await, FetchOutcome::Skipped);
}

#[tokio::test]
async fn closing_the_view_cancels_the_pending_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body(0..8, 8))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let caches = Caches::new();
    let feed = Arc::new(view(&server, &caches, Category::Sports));
    let pending = {
        let feed = Arc::clone(&feed);
        tokio::spawn(async move { feed.load_page(1).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    feed.close();

    assert_eq!(pending.await.unwrap(), FetchOutcome::Superseded);
    let state = feed.snapshot();
    assert!(state.articles.is_empty());
    assert!(!state.loading);
    assert!(caches.pages.is_empty().await);
    assert_eq!(feed.load_page(1).await, FetchOutcome::Skipped);
}

#[tokio::test]
async fn filters_are_forwarded_and_applied_locally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/news"))
        .and(query_param("q", "story"))
        .and(query_param("sources", "Odd Post"))
        .and(query_param("lang", "en"))
        .and(query_param("pageSize", "8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(0..8, 8)))
        .expect(1)
        .mount(&server)
        .await;

    let feed = view(&server, &Caches::new(), Category::Science)
        .with_filters("story", SourceFilter::Named("Odd Post".into()));
    feed.load_page(1).await;

    let visible = feed.visible();
    assert_eq!(visible.len(), 4);
    assert!(visible.iter().all(|a| a.source_name() == Some("Odd Post")));

    feed.set_query("story 3");
    assert_eq!(feed.visible().len(), 1);

    feed.set_source(SourceFilter::Named("Even Times".into()));
    assert!(feed.visible().is_empty());
    assert!(feed.snapshot().error.is_none());
}

#[tokio::test]
async fn load_more_waits_for_the_first_page() {
    let server = MockServer::start().await;
    let feed = view(&server, &Caches::new(), Category::General);
    assert_eq!(feed.load_more().await, FetchOutcome::Skipped);
    assert_eq!(feed.snapshot().page, 1);
}
