use newz_core::summary::NO_SUMMARY;
use newz_core::{
    AiSearch, ApiClient, ApiConfig, ApiError, Caches, Language, SummaryOutcome, SummaryService,
};
use reqwest::Client;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_with_retries(server: &MockServer, retry_attempts: u8) -> ApiClient {
    let config = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        retry_attempts,
        retry_delay_ms: 10,
        ..ApiConfig::default()
    };
    ApiClient::new(Client::new(), &config).unwrap()
}

fn api(server: &MockServer) -> ApiClient {
    api_with_retries(server, 0)
}

#[tokio::test]
async fn summary_fills_defaults_and_is_cached_per_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/summary"))
        .and(body_partial_json(json!({ "language": "hi" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Markets rallied on Monday",
            "sentiment": "Positive",
            "model": "mini"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let caches = Caches::new();
    let service = SummaryService::new(api(&server), caches.summaries.clone());
    let description = "Stocks rose sharply after the central bank held rates.";
    assert_eq!(
        service.summarize(description, Language::Hi).await,
        SummaryOutcome::Generated
    );

    let state = service.snapshot();
    assert!(!state.loading);
    let result = state.result.unwrap();
    assert_eq!(result.summary.event, "Markets rallied on Monday");
    assert_eq!(result.insights.sentiment, "Positive");
    assert_eq!(result.insights.read_time, "30s");
    assert_eq!(result.insights.word_count, 4);
    assert_eq!(result.model.as_deref(), Some("mini"));

    // a second screen for the same article reuses the cached summary
    let again = SummaryService::new(api(&server), caches.summaries.clone());
    assert_eq!(
        again.summarize(description, Language::Hi).await,
        SummaryOutcome::CacheHit
    );
    assert_eq!(again.snapshot().language, Some(Language::Hi));
}

#[tokio::test]
async fn summary_error_detail_is_shown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/summary"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "Text too short" })),
        )
        .mount(&server)
        .await;

    let caches = Caches::new();
    let service = SummaryService::new(api(&server), caches.summaries.clone());
    assert_eq!(
        service.summarize("Short", Language::En).await,
        SummaryOutcome::Failed
    );
    let state = service.snapshot();
    assert_eq!(state.error.as_deref(), Some("Text too short"));
    assert!(state.result.is_none());
    assert!(caches.summaries.is_empty().await);
}

#[tokio::test]
async fn blank_description_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/summary"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let service = SummaryService::new(api(&server), Caches::new().summaries);
    assert_eq!(
        service.summarize("   ", Language::Es).await,
        SummaryOutcome::NoDescription
    );
}

#[tokio::test]
async fn speech_uses_placeholder_for_blank_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/tts"))
        .and(body_partial_json(json!({
            "title": "Rates",
            "summary": NO_SUMMARY,
            "language": "mr"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x49, 0x44, 0x33, 0x04]))
        .expect(1)
        .mount(&server)
        .await;

    let service = SummaryService::new(api(&server), Caches::new().summaries);
    let audio = service.speak("Rates", "  ", Language::Mr).await.unwrap();
    assert_eq!(&audio[..3], b"ID3");
}

#[tokio::test]
async fn feedback_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/feedback"))
        .and(body_partial_json(json!({ "url": "http://news.test/1", "useful": true })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = SummaryService::new(api(&server), Caches::new().summaries);
    service
        .send_feedback("Story", "http://news.test/1", true)
        .await
        .unwrap();
    service
        .send_feedback("Story", "http://news.test/1", false)
        .await
        .unwrap();
    assert!(service.snapshot().feedback_sent);
}

#[tokio::test]
async fn article_is_fetched_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/articles/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Found",
            "url": "http://news.test/abc",
            "source": { "name": "Wire" },
            "content": "body"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/articles/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "No such article" })))
        .expect(1)
        .mount(&server)
        .await;

    let service = SummaryService::new(api_with_retries(&server, 3), Caches::new().summaries);
    let article = service.article("abc").await.unwrap();
    assert_eq!(article.title.as_deref(), Some("Found"));
    assert_eq!(article.extra.get("content"), Some(&Value::from("body")));

    match service.article("missing").await {
        Err(ApiError::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "No such article");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/rag-search"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/rag-search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Rates held.",
            "sources": [{ "title": "Bank", "content": "held", "url": "http://news.test/b" }]
        })))
        .mount(&server)
        .await;

    let search = AiSearch::new(api_with_retries(&server, 2));
    let answer = search.search("what happened to rates?").await.unwrap().unwrap();
    assert_eq!(answer.answer, "Rates held.");
    assert_eq!(answer.sources[0].url, "http://news.test/b");
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    let state = search.snapshot();
    assert_eq!(state.query, "what happened to rates?");
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn search_rejects_blank_queries_and_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/rag-search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let search = AiSearch::new(api(&server));
    assert!(matches!(search.search("  ").await, Err(ApiError::EmptyQuery)));
    assert!(server.received_requests().await.unwrap().is_empty());

    assert!(search.search("anything").await.is_err());
    let state = search.snapshot();
    assert!(!state.loading);
    assert_eq!(
        state.error.as_deref(),
        Some("Internal Server Error")
    );
}

#[tokio::test]
async fn indexing_accepts_an_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/trigger-indexing"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let search = AiSearch::new(api(&server));
    assert_eq!(search.trigger_indexing().await.unwrap(), Value::Null);
}
