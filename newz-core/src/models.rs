use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// News category as exposed by the backend `/news` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Business,
    Technology,
    Sports,
    Science,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Business,
        Category::Technology,
        Category::Sports,
        Category::Science,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Sports => "sports",
            Category::Science => "science",
        }
    }

    /// Capitalized label, e.g. "Technology".
    pub fn title(self) -> String {
        let s = self.as_str();
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ArticleSource {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// An article as returned by the backend. Only the named fields are read;
/// anything else is carried through untouched in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    #[serde(default, rename = "urlToImage", alias = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub source: ArticleSource,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    pub fn source_name(&self) -> Option<&str> {
        self.source.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewsPage {
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub total_results: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest<'a> {
    pub texts: &'a [String],
    pub target_lang: &'a str,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TranslateResponse {
    #[serde(default)]
    pub translations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRequest<'a> {
    pub text: &'a str,
    pub language: &'a str,
}

/// Raw `/summary` payload; every field may be missing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: Option<String>,
    pub background: Option<String>,
    pub sentiment: Option<String>,
    pub read_time: Option<String>,
    pub context: Option<String>,
    pub relevance: Option<String>,
    pub bias: Option<String>,
    pub next: Option<String>,
    pub word_count: Option<usize>,
    pub model: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TtsRequest<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub language: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagSearchRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RagSource {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RagAnswer {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<RagSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest<'a> {
    pub title: &'a str,
    pub url: &'a str,
    pub useful: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn article_keeps_unknown_fields_and_reads_image_alias() {
        let raw = serde_json::json!({
            "title": "Cats win",
            "url": "http://e/1",
            "urlToImage": "http://e/1.png",
            "source": { "id": null, "name": "A" },
            "content": "full text"
        });
        let article: Article = serde_json::from_value(raw).unwrap();
        assert_eq!(article.image_url.as_deref(), Some("http://e/1.png"));
        assert_eq!(article.source_name(), Some("A"));
        assert_eq!(article.extra.get("content"), Some(&Value::from("full text")));

        let back = serde_json::to_value(&article).unwrap();
        assert_eq!(back["content"], "full text");
    }

    #[test]
    fn category_title_is_capitalized() {
        assert_eq!(Category::Technology.title(), "Technology");
        assert_eq!(Category::parse(" Sports "), Some(Category::Sports));
        assert_eq!(Category::parse("weather"), None);
    }
}
