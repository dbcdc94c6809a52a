use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::language::Language;
use crate::models::Category;

pub const API_BASE_ENV: &str = "NEWZ_API_BASE";
pub const CATEGORY_ENV: &str = "NEWZ_CATEGORY";
pub const LANGUAGE_ENV: &str = "NEWZ_LANGUAGE";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub feed: FeedConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// No deadline is enforced when unset.
    pub request_timeout_seconds: Option<u64>,
    pub retry_attempts: u8,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub country: String,
    pub page_size: u32,
    pub default_category: Category,
    /// Language to start in; the saved preference is used when unset.
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub font_size: f32,
    pub window_width: f32,
    pub window_height: f32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout_seconds: None,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            user_agent: "Newz/0.1".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            country: "us".to_string(),
            page_size: 8,
            default_category: Category::General,
            language: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            window_width: 1000.0,
            window_height: 800.0,
        }
    }
}

/// `<config_dir>/newz`, created on demand.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    let dir = base.join("newz");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

impl AppConfig {
    pub fn config_file_path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("config.json"))
    }

    /// Loads the config file, falling back to (and writing back) the defaults.
    /// Environment overrides are applied last.
    pub fn load() -> Self {
        let mut config = match Self::config_file_path().and_then(|p| Self::load_from_file(&p)) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "could not load configuration, using defaults");
                let default_config = Self::default();
                if let Err(save_err) = default_config.save() {
                    warn!(error = %save_err, "could not save default configuration");
                }
                default_config
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config
    }

    /// Applies `NEWZ_API_BASE`, `NEWZ_CATEGORY` and `NEWZ_LANGUAGE` as read by
    /// `var`. Blank or unknown values leave the loaded setting in place.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |name: &str| var(name).filter(|v: &String| !v.trim().is_empty());
        if let Some(base) = set(API_BASE_ENV) {
            info!(base = %base, "api base overridden from environment");
            self.api.base_url = base;
        }
        if let Some(value) = set(CATEGORY_ENV) {
            match Category::parse(&value) {
                Some(category) => self.feed.default_category = category,
                None => warn!(value = %value, "unknown category in {CATEGORY_ENV}"),
            }
        }
        if let Some(value) = set(LANGUAGE_ENV) {
            match Language::parse(&value) {
                Some(language) => self.feed.language = Some(language),
                None => warn!(value = %value, "unsupported language in {LANGUAGE_ENV}"),
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "newz_config_{}.json",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, r#"{ "feed": { "country": "in" } }"#).unwrap();

        let config = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(config.feed.country, "in");
        assert_eq!(config.feed.page_size, 8);
        assert_eq!(config.api.retry_attempts, 3);
        assert!(config.api.request_timeout().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn environment_overrides_are_parsed() {
        let mut config = AppConfig::default();
        config.apply_overrides(|name| match name {
            API_BASE_ENV => Some("http://news.internal/api".into()),
            CATEGORY_ENV => Some(" Technology ".into()),
            LANGUAGE_ENV => Some("mr-IN".into()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://news.internal/api");
        assert_eq!(config.feed.default_category, Category::Technology);
        assert_eq!(config.feed.language, Some(Language::Mr));
    }

    #[test]
    fn unknown_or_blank_overrides_are_ignored() {
        let mut config = AppConfig::default();
        config.feed.language = Some(Language::Es);
        config.apply_overrides(|name| match name {
            API_BASE_ENV => Some("  ".into()),
            CATEGORY_ENV => Some("weather".into()),
            LANGUAGE_ENV => Some("de".into()),
            _ => None,
        });
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
        assert_eq!(config.feed.default_category, Category::General);
        assert_eq!(config.feed.language, Some(Language::Es));
    }
}
