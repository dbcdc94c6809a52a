//! Client-side filtering of the loaded feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::feed::FeedState;
use crate::models::Article;

pub const ALL_SOURCES: &str = "all";

/// Source restriction; stored and transmitted as `"all"` or the source name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceFilter {
    #[default]
    All,
    Named(String),
}

impl SourceFilter {
    pub fn name(&self) -> Option<&str> {
        match self {
            SourceFilter::All => None,
            SourceFilter::Named(name) => Some(name),
        }
    }

    pub fn as_str(&self) -> &str {
        self.name().unwrap_or(ALL_SOURCES)
    }

    pub fn accepts(&self, article: &Article) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Named(name) => article.source.name.as_deref() == Some(name.as_str()),
        }
    }
}

impl From<String> for SourceFilter {
    fn from(value: String) -> Self {
        if value.is_empty() || value == ALL_SOURCES {
            SourceFilter::All
        } else {
            SourceFilter::Named(value)
        }
    }
}

impl From<SourceFilter> for String {
    fn from(value: SourceFilter) -> Self {
        match value {
            SourceFilter::All => ALL_SOURCES.to_string(),
            SourceFilter::Named(name) => name,
        }
    }
}

/// Case-insensitive match on title or description, combined with the source filter.
pub fn matches(article: &Article, query: &str, source: &SourceFilter) -> bool {
    let needle = query.trim().to_lowercase();
    let matches_text = needle.is_empty()
        || article.title_or_empty().to_lowercase().contains(&needle)
        || article.description_or_empty().to_lowercase().contains(&needle);
    matches_text && source.accepts(article)
}

/// What is on screen: the translated overlay when present, else the originals,
/// narrowed by the query and source filter.
pub fn visible_articles(state: &FeedState) -> Vec<&Article> {
    let needle = state.query.trim().to_lowercase();
    state
        .displayed()
        .iter()
        .filter(|a| matches(a, &needle, &state.source))
        .collect()
}

/// List key; the index guards against the same url arriving on two pages.
pub fn render_key(article: &Article, index: usize) -> String {
    format!("{}{}", article.url, index)
}

/// Distinct source names, sorted, with how many articles each contributes.
pub fn source_counts(articles: &[Article]) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for name in articles.iter().filter_map(Article::source_name) {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub total: usize,
    pub loaded: usize,
    pub sources: usize,
}

pub fn feed_stats(state: &FeedState) -> FeedStats {
    FeedStats {
        total: state.total_results,
        loaded: state.articles.len(),
        sources: source_counts(state.displayed()).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn article(title: &str, source: &str, url: &str) -> Article {
        serde_json::from_value(json!({
            "title": title,
            "url": url,
            "source": { "name": source }
        }))
        .unwrap()
    }

    fn state(articles: Vec<Article>) -> FeedState {
        let mut state = FeedState::default();
        state.articles = articles;
        state
    }

    #[test]
    fn query_and_source_filters() {
        let mut s = state(vec![
            article("Cats win", "A", "u1"),
            article("Dogs lose", "B", "u2"),
        ]);

        s.query = "cat".into();
        let titles: Vec<_> = visible_articles(&s).iter().map(|a| a.title_or_empty()).collect();
        assert_eq!(titles, ["Cats win"]);

        s.query.clear();
        s.source = SourceFilter::Named("B".into());
        let titles: Vec<_> = visible_articles(&s).iter().map(|a| a.title_or_empty()).collect();
        assert_eq!(titles, ["Dogs lose"]);

        s.query = "cat".into();
        assert!(visible_articles(&s).is_empty());
    }

    #[test]
    fn description_matches_and_missing_fields_do_not() {
        let mut a = article("Headline", "A", "u1");
        a.description = Some("Markets RALLY today".into());
        assert!(matches(&a, "rally", &SourceFilter::All));

        let bare: Article = serde_json::from_value(json!({ "url": "u2" })).unwrap();
        assert!(!matches(&bare, "rally", &SourceFilter::All));
        assert!(matches(&bare, "", &SourceFilter::All));
        assert!(!matches(&bare, "", &SourceFilter::Named("A".into())));
    }

    #[test]
    fn overlay_replaces_originals_when_present() {
        let mut s = state(vec![article("Cats win", "A", "u1")]);
        s.translated = Some(vec![article("Les chats gagnent", "A", "u1")]);
        assert_eq!(visible_articles(&s)[0].title_or_empty(), "Les chats gagnent");
    }

    #[test]
    fn sources_are_counted_and_sorted() {
        let articles = vec![
            article("1", "Reuters", "u1"),
            article("2", "AP", "u2"),
            article("3", "Reuters", "u3"),
        ];
        assert_eq!(
            source_counts(&articles),
            vec![("AP".to_string(), 1), ("Reuters".to_string(), 2)]
        );
        assert_eq!(render_key(&articles[0], 3), "u13");
    }

    #[test]
    fn source_filter_string_form() {
        assert_eq!(SourceFilter::from("all".to_string()), SourceFilter::All);
        assert_eq!(String::from(SourceFilter::Named("AP".into())), "AP");
        let json = serde_json::to_string(&SourceFilter::All).unwrap();
        assert_eq!(json, "\"all\"");
    }
}
