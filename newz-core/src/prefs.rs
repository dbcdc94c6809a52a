use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::filter::SourceFilter;
use crate::language::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Preferences {
    pub language: Language,
    pub theme: Theme,
    pub query: String,
    pub source: SourceFilter,
}

impl Preferences {
    /// Dark mode is disabled for now: whatever is stored, the light theme is used.
    pub fn effective_theme(&self) -> Theme {
        Theme::Light
    }
}

/// Preferences kept in memory and mirrored to `preferences.json` when backed by a file.
#[derive(Debug, Clone)]
pub struct PreferencesStore {
    inner: Arc<Mutex<Preferences>>,
    path: Option<PathBuf>,
    /// Serializes background writes so they never share the tmp file.
    writes: Arc<tokio::sync::Mutex<()>>,
}

impl PreferencesStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Preferences::default())),
            path: None,
            writes: Arc::default(),
        }
    }

    pub fn load_from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!(error = %e, "failed to create preferences dir");
        }
        let path = dir.join("preferences.json");
        let prefs: Preferences = read_json_with_tmp_fallback(&path);
        Self {
            inner: Arc::new(Mutex::new(prefs)),
            path: Some(path),
            writes: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Preferences> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self) -> Preferences {
        self.lock().clone()
    }

    /// Applies `change` and persists the result.
    pub fn update(&self, change: impl FnOnce(&mut Preferences)) -> Result<(), ConfigError> {
        let snapshot = {
            let mut prefs = self.lock();
            change(&mut prefs);
            prefs.clone()
        };
        self.persist(&snapshot)
    }

    /// Like [`update`](Self::update), but writes with `tokio::fs` so it can run
    /// on the runtime. The latest state is written, whatever the call order.
    pub async fn update_async(
        &self,
        change: impl FnOnce(&mut Preferences),
    ) -> Result<(), ConfigError> {
        {
            let mut prefs = self.lock();
            change(&mut prefs);
        }
        let Some(path) = &self.path else {
            debug!("preferences are in-memory only; skipping persist");
            return Ok(());
        };
        let _writing = self.writes.lock().await;
        let bytes = serde_json::to_vec_pretty(&self.get())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "preferences saved");
        Ok(())
    }

    fn persist(&self, prefs: &Preferences) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            debug!("preferences are in-memory only; skipping persist");
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(prefs)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // write-then-rename so a crash never leaves a truncated file behind
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// Reads `path`; a corrupt file falls back to its `.json.tmp` sibling, then to defaults.
fn read_json_with_tmp_fallback<T: DeserializeOwned + Default>(path: &Path) -> T {
    match std::fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<T>(&bytes) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to parse JSON, trying tmp fallback");
                let tmp = path.with_extension("json.tmp");
                std::fs::read(&tmp)
                    .ok()
                    .and_then(|b| serde_json::from_slice::<T>(&b).ok())
                    .unwrap_or_default()
            }
        },
        Err(_) => T::default(),
    }
}
