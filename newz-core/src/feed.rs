//! Feed coordinator: paginated loading, first-page caching and the
//! translation overlay for one mounted feed view.
//!
//! A view owns one [`RequestSlot`] for feed pages and one for translations.
//! Every response is checked against its slot before it touches
//! [`FeedState`], so a superseded request can never overwrite newer data.
//! Failures are turned into a user-facing message in `FeedState::error` and
//! never reach the shared caches.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, NewsQuery};
use crate::cache::{CachedPage, Caches, FeedKey, TranslationKey};
use crate::error::{ApiError, ApiResult, FEED_ERROR_MESSAGE, TRANSLATION_ERROR_MESSAGE};
use crate::filter::{self, SourceFilter};
use crate::language::Language;
use crate::models::{Article, Category, NewsPage};
use crate::request::{RequestHandle, RequestSlot};

pub const PROGRESS_STARTED: u8 = 10;
pub const PROGRESS_DONE: u8 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct FeedState {
    pub key: FeedKey,
    pub articles: Vec<Article>,
    /// Positionally aligned copy of `articles` in `language`; `None` in English
    /// or before the first translation lands.
    pub translated: Option<Vec<Article>>,
    pub page: u32,
    pub total_results: usize,
    pub has_more: bool,
    pub loading: bool,
    pub translating: bool,
    pub error: Option<String>,
    pub query: String,
    pub source: SourceFilter,
    pub language: Language,
}

impl FeedState {
    pub fn new(key: FeedKey, language: Language) -> Self {
        Self {
            key,
            articles: Vec::new(),
            translated: None,
            page: 1,
            total_results: 0,
            has_more: true,
            loading: false,
            translating: false,
            error: None,
            query: String::new(),
            source: SourceFilter::All,
            language,
        }
    }

    /// Overlay when present, otherwise the originals.
    pub fn displayed(&self) -> &[Article] {
        self.translated.as_deref().unwrap_or(&self.articles)
    }

    fn clear_feed(&mut self) {
        self.page = 1;
        self.articles.clear();
        self.translated = None;
        self.total_results = 0;
        self.has_more = true;
        self.loading = false;
        self.translating = false;
        self.error = None;
    }
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(FeedKey::new(Category::General, "us"), Language::DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// First page served from the page cache, no request made.
    CacheHit { articles: usize },
    Loaded { page: u32, received: usize },
    /// The backend returned an empty page; the feed is complete.
    Exhausted,
    /// Nothing to do: no more pages, a load is pending, or the view is closed.
    Skipped,
    /// A newer request or a close retired this one; state was left alone.
    Superseded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateOutcome {
    NoArticles,
    /// Default language: overlay dropped without a request.
    Cleared,
    CacheHit,
    Translated { articles: usize },
    Superseded,
    Failed,
}

enum Settled {
    Done(FetchOutcome),
    Merged {
        articles: Vec<Article>,
        total: usize,
        language: Language,
        received: usize,
    },
}

pub struct FeedView {
    api: ApiClient,
    caches: Caches,
    page_size: u32,
    state: Mutex<FeedState>,
    fetches: RequestSlot,
    translations: RequestSlot,
    progress: watch::Sender<u8>,
    closed: AtomicBool,
}

impl FeedView {
    pub fn new(
        api: ApiClient,
        caches: Caches,
        key: FeedKey,
        page_size: u32,
        language: Language,
    ) -> Self {
        let (progress, _rx) = watch::channel(0);
        Self {
            api,
            caches,
            page_size: page_size.max(1),
            state: Mutex::new(FeedState::new(key, language)),
            fetches: RequestSlot::new("feed"),
            translations: RequestSlot::new("translation"),
            progress,
            closed: AtomicBool::new(false),
        }
    }

    /// Seeds the persisted query and source filter.
    pub fn with_filters(self, query: impl Into<String>, source: SourceFilter) -> Self {
        {
            let mut s = self.lock();
            s.query = query.into();
            s.source = source;
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> FeedState {
        self.lock().clone()
    }

    pub fn visible(&self) -> Vec<Article> {
        let state = self.lock();
        filter::visible_articles(&state).into_iter().cloned().collect()
    }

    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.lock().query = query.into();
    }

    pub fn set_source(&self, source: SourceFilter) {
        self.lock().source = source;
    }

    /// Loads `page` (1-based). Page 1 is served from the page cache when
    /// possible; any other load retires the previous in-flight fetch.
    pub async fn load_page(&self, page: u32) -> FetchOutcome {
        if self.is_closed() {
            return FetchOutcome::Skipped;
        }
        let page = page.max(1);
        let (key, query, source) = {
            let mut s = self.lock();
            s.page = page;
            (s.key.clone(), s.query.clone(), s.source.clone())
        };

        if page == 1 {
            if let Some(cached) = self.caches.pages.get(&key.cache_key()).await {
                return self.apply_cached(&key, cached).await;
            }
        }

        // started under the state lock so a feed switch is either seen here
        // or cancels this request
        let handle = {
            let mut s = self.lock();
            if s.key != key {
                debug!(feed = %key, page, "feed switched before the request started");
                return FetchOutcome::Superseded;
            }
            let handle = self.fetches.begin();
            s.loading = true;
            s.error = None;
            handle
        };
        if page == 1 {
            self.progress.send_replace(PROGRESS_STARTED);
        }

        let request = NewsQuery {
            country: key.country.clone(),
            category: key.category,
            page,
            page_size: self.page_size,
            query,
            source,
        };
        debug!(feed = %key, page, "requesting feed page");
        let result = handle.run(self.api.news(&request)).await;

        let (articles, total, language, received) =
            match self.settle_page(&handle, &key, page, result) {
                Settled::Done(FetchOutcome::Superseded) => return FetchOutcome::Superseded,
                Settled::Done(outcome) => {
                    self.progress.send_replace(PROGRESS_DONE);
                    return outcome;
                }
                Settled::Merged {
                    articles,
                    total,
                    language,
                    received,
                } => (articles, total, language, received),
            };
        info!(
            feed = %key,
            page,
            received,
            loaded = articles.len(),
            total,
            "merged feed page"
        );
        if page == 1 {
            self.caches
                .pages
                .insert(
                    key.cache_key(),
                    CachedPage {
                        articles: articles.clone(),
                        total_results: total,
                    },
                )
                .await;
        }
        self.progress.send_replace(PROGRESS_DONE);
        if !language.is_default() {
            self.translate(articles, language).await;
        }
        FetchOutcome::Loaded { page, received }
    }

    /// Applies a page response to the state. The slot is checked while the
    /// state lock is held, so a switch or close that retired `handle` is
    /// either fully before or fully after this call.
    fn settle_page(
        &self,
        handle: &RequestHandle,
        key: &FeedKey,
        page: u32,
        result: ApiResult<NewsPage>,
    ) -> Settled {
        let mut s = self.lock();
        if !self.fetches.is_current(handle) {
            debug!(feed = %key, page, "discarding superseded feed response");
            return Settled::Done(FetchOutcome::Superseded);
        }
        self.fetches.finish(handle);

        match result {
            Err(ApiError::Cancelled) => Settled::Done(FetchOutcome::Superseded),
            Err(err) => {
                warn!(feed = %key, page, error = %err, "failed to fetch news");
                s.error = Some(FEED_ERROR_MESSAGE.to_string());
                s.loading = false;
                s.has_more = false;
                Settled::Done(FetchOutcome::Failed)
            }
            Ok(data) if data.articles.is_empty() => {
                info!(feed = %key, page, "feed exhausted");
                s.has_more = false;
                s.loading = false;
                Settled::Done(FetchOutcome::Exhausted)
            }
            Ok(data) => {
                let received = data.articles.len();
                if page == 1 {
                    s.articles = data.articles;
                } else {
                    s.articles.extend(data.articles);
                }
                s.total_results = data.total_results;
                s.has_more = s.articles.len() < s.total_results;
                s.loading = false;
                s.error = None;
                Settled::Merged {
                    articles: s.articles.clone(),
                    total: s.total_results,
                    language: s.language,
                    received,
                }
            }
        }
    }

    async fn apply_cached(&self, key: &FeedKey, cached: CachedPage) -> FetchOutcome {
        let count = cached.articles.len();
        let (articles, language) = {
            let mut s = self.lock();
            if s.key != *key || self.is_closed() {
                return FetchOutcome::Superseded;
            }
            // a cache hit still wins over any fetch that was in flight
            self.fetches.cancel();
            s.has_more = cached.articles.len() < cached.total_results;
            s.articles = cached.articles;
            s.total_results = cached.total_results;
            s.loading = false;
            s.error = None;
            (s.articles.clone(), s.language)
        };
        info!(feed = %key, articles = count, "first page served from cache");
        self.progress.send_replace(PROGRESS_DONE);
        if !language.is_default() {
            self.translate(articles, language).await;
        }
        FetchOutcome::CacheHit { articles: count }
    }

    /// Infinite-scroll trigger: advances the page counter and loads it, unless
    /// the feed is complete or a page or translation is still pending.
    pub async fn load_more(&self) -> FetchOutcome {
        let next = {
            let mut s = self.lock();
            if self.is_closed()
                || !s.has_more
                || s.loading
                || s.translating
                || s.articles.is_empty()
            {
                return FetchOutcome::Skipped;
            }
            s.page += 1;
            s.loading = true;
            s.page
        };
        self.load_page(next).await
    }

    /// Re-issues the last fetch with the same page number.
    pub async fn retry(&self) -> FetchOutcome {
        let page = self.lock().page;
        self.load_page(page).await
    }

    /// Switches to another category/country. Pending requests are retired and
    /// the feed restarts at page 1; an unchanged key is a no-op.
    pub async fn set_feed(&self, key: FeedKey) -> FetchOutcome {
        if self.is_closed() {
            return FetchOutcome::Skipped;
        }
        {
            let mut s = self.lock();
            if s.key == key {
                return FetchOutcome::Skipped;
            }
            self.fetches.cancel();
            self.translations.cancel();
            info!(from = %s.key, to = %key, "switching feed");
            s.key = key;
            s.clear_feed();
        }
        self.load_page(1).await
    }

    pub fn set_category(&self, category: Category) -> impl Future<Output = FetchOutcome> + '_ {
        let country = self.lock().key.country.clone();
        self.set_feed(FeedKey::new(category, country))
    }

    /// Unmount: retires both in-flight requests; every later call is a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.fetches.cancel();
        self.translations.cancel();
        let mut s = self.lock();
        s.loading = false;
        s.translating = false;
        debug!(feed = %s.key, "feed view closed");
    }

    /// Applies a language switch. English drops the overlay immediately;
    /// any other language translates the loaded articles.
    pub async fn set_language(&self, lang: Language) -> TranslateOutcome {
        let articles = {
            let mut s = self.lock();
            s.language = lang;
            s.translated = None;
            if lang.is_default() {
                self.translations.cancel();
                s.translating = false;
                return TranslateOutcome::Cleared;
            }
            s.articles.clone()
        };
        self.translate(articles, lang).await
    }

    /// Translates titles and descriptions of `articles` in one batch and
    /// installs the result as the overlay.
    pub async fn translate(&self, articles: Vec<Article>, lang: Language) -> TranslateOutcome {
        if self.is_closed() {
            return TranslateOutcome::Superseded;
        }
        if articles.is_empty() {
            return TranslateOutcome::NoArticles;
        }
        if lang.is_default() {
            let mut s = self.lock();
            self.translations.cancel();
            s.translated = None;
            s.translating = false;
            return TranslateOutcome::Cleared;
        }

        let handle = {
            let s = self.lock();
            if !same_urls(&s.articles, &articles) {
                debug!(lang = %lang, "articles changed before the translation started");
                return TranslateOutcome::Superseded;
            }
            self.translations.begin()
        };
        let key = TranslationKey::new(&articles, lang);
        if let Some(hit) = self.caches.translations.get(key.as_str()).await {
            if !self.install_overlay(&handle, lang, hit) {
                return TranslateOutcome::Superseded;
            }
            debug!(lang = %lang, articles = articles.len(), "translation served from cache");
            return TranslateOutcome::CacheHit;
        }

        {
            let mut s = self.lock();
            if !self.translations.is_current(&handle) {
                return TranslateOutcome::Superseded;
            }
            s.translating = true;
            s.error = None;
        }
        let texts = flatten_texts(&articles);
        debug!(lang = %lang, texts = texts.len(), "requesting batch translation");
        let result = handle.run(self.api.translate(&texts, lang.code())).await;

        match result {
            Err(ApiError::Cancelled) => TranslateOutcome::Superseded,
            Err(err) => {
                let mut s = self.lock();
                if !self.translations.is_current(&handle) {
                    debug!(lang = %lang, "discarding superseded translation failure");
                    return TranslateOutcome::Superseded;
                }
                self.translations.finish(&handle);
                warn!(lang = %lang, error = %err, "translation failed");
                s.error = Some(TRANSLATION_ERROR_MESSAGE.to_string());
                s.translating = false;
                TranslateOutcome::Failed
            }
            Ok(translations) => {
                let overlay = apply_translations(&articles, &translations);
                let count = overlay.len();
                if !self.install_overlay(&handle, lang, overlay.clone()) {
                    debug!(lang = %lang, "discarding superseded translation");
                    return TranslateOutcome::Superseded;
                }
                self.caches.translations.insert(key.as_str(), overlay).await;
                info!(lang = %lang, articles = count, "articles translated");
                TranslateOutcome::Translated { articles: count }
            }
        }
    }

    /// Installs `overlay` if `handle` still owns the translation slot.
    /// Returns `false` when the request was retired.
    fn install_overlay(
        &self,
        handle: &RequestHandle,
        lang: Language,
        overlay: Vec<Article>,
    ) -> bool {
        let mut s = self.lock();
        if !self.translations.is_current(handle) {
            return false;
        }
        self.translations.finish(handle);
        s.translating = false;
        // the overlay is positional: it must match both language and articles
        if s.language == lang && same_urls(&s.articles, &overlay) {
            s.translated = Some(overlay);
        }
        true
    }

    /// Future that applies every change published on `rx` to this view. It ends
    /// once the view is dropped or closed, or the settings go away.
    pub fn language_listener(
        self: &Arc<Self>,
        mut rx: watch::Receiver<Language>,
    ) -> impl Future<Output = ()> + Send + 'static {
        let view = Arc::downgrade(self);
        async move {
            while rx.changed().await.is_ok() {
                let lang = *rx.borrow_and_update();
                let Some(live) = view.upgrade() else { break };
                if live.is_closed() {
                    break;
                }
                live.set_language(lang).await;
            }
        }
    }
}

impl Drop for FeedView {
    fn drop(&mut self) {
        self.close();
    }
}

fn same_urls(left: &[Article], right: &[Article]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| l.url == r.url)
}

/// `[title₁, description₁, title₂, description₂, …]`, empty strings for gaps.
pub fn flatten_texts(articles: &[Article]) -> Vec<String> {
    articles
        .iter()
        .flat_map(|a| {
            [
                a.title_or_empty().to_string(),
                a.description_or_empty().to_string(),
            ]
        })
        .collect()
}

/// Zips a positional translation batch back onto `articles`; a missing or
/// empty slot keeps the original text.
pub fn apply_translations(articles: &[Article], translations: &[String]) -> Vec<Article> {
    let pick = |slot: usize, original: &Option<String>| {
        translations
            .get(slot)
            .filter(|t| !t.is_empty())
            .cloned()
            .or_else(|| original.clone())
    };
    articles
        .iter()
        .enumerate()
        .map(|(index, article)| {
            let mut translated = article.clone();
            translated.title = pick(index * 2, &article.title);
            translated.description = pick(index * 2 + 1, &article.description);
            translated
        })
        .collect()
}
