use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use tracing::{debug, info, warn};
use url::Url;

use crate::api::ApiClient;
use crate::cache::SummaryCache;
use crate::error::{ApiError, ApiResult};
use crate::language::Language;
use crate::models::{Article, SummaryResponse};
use crate::request::RequestSlot;

pub const NO_SUMMARY: &str = "No summary available";
const CACHE_KEY_PREFIX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub event: String,
    pub background: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insights {
    pub sentiment: String,
    pub read_time: String,
    pub context: String,
    pub relevance: String,
    pub bias: String,
    pub next: String,
    pub word_count: usize,
}

impl Default for Insights {
    fn default() -> Self {
        Self {
            sentiment: "Neutral".into(),
            read_time: "30s".into(),
            context: "General news".into(),
            relevance: "General interest".into(),
            bias: "Balanced".into(),
            next: "Watch for follow-ups".into(),
            word_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryResult {
    pub summary: Summary,
    pub insights: Insights,
    pub model: Option<String>,
    pub confidence: Option<f64>,
}

impl From<SummaryResponse> for SummaryResult {
    fn from(raw: SummaryResponse) -> Self {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        let event = non_blank(raw.summary).unwrap_or_else(|| NO_SUMMARY.to_string());
        let defaults = Insights::default();
        let word_count = raw
            .word_count
            .filter(|n| *n > 0)
            .unwrap_or_else(|| event.split_whitespace().count());
        Self {
            insights: Insights {
                sentiment: non_blank(raw.sentiment).unwrap_or(defaults.sentiment),
                read_time: non_blank(raw.read_time).unwrap_or(defaults.read_time),
                context: non_blank(raw.context).unwrap_or(defaults.context),
                relevance: non_blank(raw.relevance).unwrap_or(defaults.relevance),
                bias: non_blank(raw.bias).unwrap_or(defaults.bias),
                next: non_blank(raw.next).unwrap_or(defaults.next),
                word_count,
            },
            summary: Summary {
                event,
                background: non_blank(raw.background).unwrap_or_default(),
            },
            model: non_blank(raw.model),
            confidence: raw.confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn classify(label: &str) -> Self {
        let v = label.to_lowercase();
        if v.contains("pos") {
            Sentiment::Positive
        } else if v.contains("neg") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

pub fn summary_cache_key(description: &str, lang: Language) -> String {
    let prefix: String = description.chars().take(CACHE_KEY_PREFIX_CHARS).collect();
    format!("{}-{}", prefix, lang.code())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLinks {
    pub x: String,
    pub linkedin: String,
}

pub fn share_links(text: &str, article_url: &str) -> Result<ShareLinks, url::ParseError> {
    let x = Url::parse_with_params(
        "https://twitter.com/intent/tweet",
        &[("text", text), ("url", article_url)],
    )?;
    let linkedin = Url::parse_with_params(
        "https://www.linkedin.com/sharing/share-offsite/",
        &[("url", article_url)],
    )?;
    Ok(ShareLinks {
        x: x.into(),
        linkedin: linkedin.into(),
    })
}

#[derive(Debug, Clone, Default)]
pub struct SummaryState {
    pub language: Option<Language>,
    pub result: Option<SummaryResult>,
    pub loading: bool,
    pub error: Option<String>,
    pub feedback_sent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOutcome {
    NoDescription,
    CacheHit,
    Generated,
    Superseded,
    Failed,
}

/// AI summary of one article, with text-to-speech and feedback.
pub struct SummaryService {
    api: ApiClient,
    cache: SummaryCache,
    state: Mutex<SummaryState>,
    requests: RequestSlot,
}

impl SummaryService {
    pub fn new(api: ApiClient, cache: SummaryCache) -> Self {
        Self {
            api,
            cache,
            state: Mutex::new(SummaryState::default()),
            requests: RequestSlot::new("summary"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SummaryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> SummaryState {
        self.lock().clone()
    }

    pub async fn summarize(&self, description: &str, lang: Language) -> SummaryOutcome {
        if description.trim().is_empty() {
            return SummaryOutcome::NoDescription;
        }
        let key = summary_cache_key(description, lang);
        if let Some(hit) = self.cache.get(&key).await {
            self.requests.cancel();
            let mut s = self.lock();
            s.loading = false;
            s.language = Some(lang);
            s.result = Some(hit);
            s.error = None;
            return SummaryOutcome::CacheHit;
        }

        let handle = self.requests.begin();
        {
            let mut s = self.lock();
            s.language = Some(lang);
            s.loading = true;
            s.error = None;
        }
        let result = handle.run(self.api.summary(description, lang.code())).await;
        if !self.requests.is_current(&handle) {
            return SummaryOutcome::Superseded;
        }
        self.requests.finish(&handle);

        match result {
            Err(ApiError::Cancelled) => SummaryOutcome::Superseded,
            Err(err) => {
                warn!(lang = %lang, error = %err, "summary generation failed");
                let message = match &err {
                    ApiError::Status { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                let mut s = self.lock();
                s.loading = false;
                s.error = Some(message);
                SummaryOutcome::Failed
            }
            Ok(raw) => {
                let summary = SummaryResult::from(raw);
                self.cache.insert(key, summary.clone()).await;
                info!(lang = %lang, words = summary.insights.word_count, "summary generated");
                let mut s = self.lock();
                s.loading = false;
                s.result = Some(summary);
                SummaryOutcome::Generated
            }
        }
    }

    /// Audio rendition of the summary in `lang`.
    pub async fn speak(&self, title: &str, summary: &str, lang: Language) -> ApiResult<Bytes> {
        let summary = if summary.trim().is_empty() {
            NO_SUMMARY
        } else {
            summary
        };
        let audio = self.api.tts(title, summary, lang.code()).await?;
        debug!(bytes = audio.len(), "received tts audio");
        Ok(audio)
    }

    /// Records a thumbs up/down once per summary view.
    pub async fn send_feedback(&self, title: &str, url: &str, useful: bool) -> ApiResult<()> {
        if self.lock().feedback_sent {
            return Ok(());
        }
        self.api.feedback(title, url, useful).await?;
        self.lock().feedback_sent = true;
        Ok(())
    }

    pub async fn article(&self, id: &str) -> ApiResult<Article> {
        self.api.article(id).await
    }

    pub fn cancel(&self) {
        self.requests.cancel();
        self.lock().loading = false;
    }
}
