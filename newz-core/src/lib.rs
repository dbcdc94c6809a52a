pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod language;
pub mod models;
pub mod prefs;
pub mod request;
pub mod search;
pub mod summary;

pub use api::{ApiClient, NewsQuery};
pub use cache::{CachedPage, Caches, FeedKey, KeyedCache, TranslationKey};
pub use config::{ApiConfig, AppConfig, FeedConfig, UiConfig};
pub use error::{ApiError, ApiResult, ConfigError};
pub use feed::{FeedState, FeedView, FetchOutcome, TranslateOutcome};
pub use filter::{source_counts, visible_articles, SourceFilter};
pub use language::{Language, LanguageSettings};
pub use models::{Article, ArticleSource, Category, NewsPage, RagAnswer, RagSource};
pub use prefs::{Preferences, PreferencesStore, Theme};
pub use request::{RequestHandle, RequestSlot};
pub use search::{AiSearch, SearchState};
pub use summary::{Sentiment, SummaryOutcome, SummaryResult, SummaryService, SummaryState};
