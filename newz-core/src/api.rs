use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::filter::SourceFilter;
use crate::models::{
    Article, Category, FeedbackRequest, NewsPage, RagAnswer, RagSearchRequest, SummaryRequest,
    SummaryResponse, TranslateRequest, TranslateResponse, TtsRequest,
};

/// Article text is always requested in English; other languages go through
/// the translation overlay.
pub const FEED_LANGUAGE: &str = "en";

/// Query of one `/news` page.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub country: String,
    pub category: Category,
    pub page: u32,
    pub page_size: u32,
    pub query: String,
    pub source: SourceFilter,
}

impl NewsQuery {
    /// Query-string pairs; `q` and `sources` only when they narrow the feed.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("country", self.country.clone()),
            ("category", self.category.as_str().to_string()),
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("lang", FEED_LANGUAGE.to_string()),
        ];
        let q = self.query.trim();
        if !q.is_empty() {
            params.push(("q", q.to_string()));
        }
        if let Some(name) = self.source.name() {
            params.push(("sources", name.to_string()));
        }
        params
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
    retry_attempts: u8,
    retry_delay: Duration,
    timeout: Option<Duration>,
}

impl ApiClient {
    pub fn new(client: Client, config: &ApiConfig) -> ApiResult<Self> {
        let parsed = Url::parse(config.base_url.trim())?;
        Ok(Self {
            client,
            base: parsed.as_str().trim_end_matches('/').to_string(),
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay(),
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub async fn news(&self, query: &NewsQuery) -> ApiResult<NewsPage> {
        let url = self.endpoint("news");
        let params = query.params();
        let response = self
            .execute(|| self.client.get(&url).query(&params))
            .await?;
        decode_json(response).await
    }

    pub async fn translate(&self, texts: &[String], target_lang: &str) -> ApiResult<Vec<String>> {
        let body = TranslateRequest { texts, target_lang };
        let response: TranslateResponse = self.post_json("translate", &body).await?;
        Ok(response.translations)
    }

    pub async fn summary(&self, text: &str, language: &str) -> ApiResult<SummaryResponse> {
        self.post_json("summary", &SummaryRequest { text, language })
            .await
    }

    /// Returns the raw audio payload.
    pub async fn tts(&self, title: &str, summary: &str, language: &str) -> ApiResult<Bytes> {
        let url = self.endpoint("tts");
        let body = TtsRequest {
            title,
            summary,
            language,
        };
        let response = self
            .execute(|| self.client.post(&url).json(&body))
            .await?;
        Ok(response.bytes().await?)
    }

    pub async fn rag_search(&self, query: &str) -> ApiResult<RagAnswer> {
        self.post_json("rag-search", &RagSearchRequest { query })
            .await
    }

    pub async fn trigger_indexing(&self) -> ApiResult<serde_json::Value> {
        let url = self.endpoint("trigger-indexing");
        let response = self.execute(|| self.client.post(&url)).await?;
        decode_json_or_null(response).await
    }

    pub async fn feedback(&self, title: &str, url: &str, useful: bool) -> ApiResult<()> {
        let endpoint = self.endpoint("feedback");
        let body = FeedbackRequest { title, url, useful };
        self.execute(|| self.client.post(&endpoint).json(&body))
            .await?;
        Ok(())
    }

    pub async fn article(&self, id: &str) -> ApiResult<Article> {
        let url = self.endpoint(&format!("articles/{id}"));
        let response = self.execute(|| self.client.get(&url)).await?;
        decode_json(response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        let response = self
            .execute(|| self.client.post(&url).json(body))
            .await?;
        decode_json(response).await
    }

    /// Sends the request built by `build`, retrying transport failures and
    /// 5xx answers. The returned response always has a 2xx status.
    async fn execute<F>(&self, build: F) -> ApiResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt: u8 = 0;
        loop {
            let mut request = build();
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }
            let result = match request.send().await {
                Ok(response) => check_status(response).await,
                Err(err) => Err(ApiError::Network(err)),
            };
            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.retry_attempts => {
                    attempt += 1;
                    warn!(error = %err, attempt, "request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

async fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let fallback = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["detail", "message"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or(fallback);
    debug!(status = status.as_u16(), %message, "backend returned an error status");
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

async fn decode_json_or_null(response: Response) -> ApiResult<serde_json::Value> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
