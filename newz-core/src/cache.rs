use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::language::Language;
use crate::models::{Article, Category};
use crate::summary::SummaryResult;

/// Shared `(key) -> value` map. Clones share storage; entries are never evicted
/// and a second insert for the same key replaces the first.
#[derive(Debug)]
pub struct KeyedCache<V> {
    name: &'static str,
    inner: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> Clone for KeyedCache<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Clone> KeyedCache<V> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let hit = self.inner.read().await.get(key).cloned();
        debug!(cache = self.name, key, hit = hit.is_some(), "cache lookup");
        hit
    }

    pub async fn insert(&self, key: impl Into<String>, value: V) {
        self.inner.write().await.insert(key.into(), value);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.inner.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

/// Identifies one feed: a category in a country.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub category: Category,
    pub country: String,
}

impl FeedKey {
    pub fn new(category: Category, country: impl Into<String>) -> Self {
        Self {
            category,
            country: country.into(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.category.as_str(), self.country)
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.category, self.country)
    }
}

/// Key of one translated batch: the ordered article urls plus the target
/// language. Urls are newline-separated so distinct lists never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey(String);

impl TranslationKey {
    pub fn new(articles: &[Article], lang: Language) -> Self {
        let urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
        Self(format!("{}\n-{}", urls.join("\n"), lang.code()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// First page of a feed plus the total reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub articles: Vec<Article>,
    pub total_results: usize,
}

pub type PageCache = KeyedCache<CachedPage>;
pub type TranslationCache = KeyedCache<Vec<Article>>;
pub type SummaryCache = KeyedCache<SummaryResult>;

/// The process-wide caches, created once and handed to every view.
#[derive(Debug, Clone)]
pub struct Caches {
    pub pages: PageCache,
    pub translations: TranslationCache,
    pub summaries: SummaryCache,
}

impl Caches {
    pub fn new() -> Self {
        Self {
            pages: KeyedCache::new("pages"),
            translations: KeyedCache::new("translations"),
            summaries: KeyedCache::new("summaries"),
        }
    }
}

impl Default for Caches {
    fn default() -> Self {
        Self::new()
    }
}
