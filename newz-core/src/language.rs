use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::prefs::PreferencesStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Mr,
    Es,
    Fr,
}

impl Language {
    pub const DEFAULT: Language = Language::En;

    pub const ALL: [Language; 5] = [
        Language::En,
        Language::Hi,
        Language::Mr,
        Language::Es,
        Language::Fr,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Mr => "mr",
            Language::Es => "es",
            Language::Fr => "fr",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "Hindi",
            Language::Mr => "Marathi",
            Language::Es => "Spanish",
            Language::Fr => "French",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Hi => "हिंदी",
            Language::Mr => "मराठी",
            Language::Es => "Español",
            Language::Fr => "Français",
        }
    }

    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }

    /// Accepts codes like `fr`, `FR` or `fr-CA`.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        let code = normalized.split(['-', '_']).next().unwrap_or_default();
        Self::ALL.into_iter().find(|lang| lang.code() == code)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Process-wide current language. Views subscribe to it; only [`set`](Self::set)
/// changes it, and every change is written to the preferences store.
#[derive(Debug)]
pub struct LanguageSettings {
    tx: watch::Sender<Language>,
    store: Option<PreferencesStore>,
}

impl LanguageSettings {
    pub fn new(initial: Language) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx, store: None }
    }

    /// Starts from the stored preference and persists later changes there.
    pub fn with_store(store: PreferencesStore) -> Self {
        let initial = store.get().language;
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            store: Some(store),
        }
    }

    /// Starts this session in `lang`; the stored preference is left as is.
    pub fn starting_in(self, lang: Language) -> Self {
        self.tx.send_replace(lang);
        self
    }

    pub fn current(&self) -> Language {
        *self.tx.borrow()
    }

    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.tx.subscribe()
    }

    pub fn set(&self, lang: Language) {
        let mut previous = lang;
        let changed = self.tx.send_if_modified(|current| {
            if *current == lang {
                return false;
            }
            previous = std::mem::replace(current, lang);
            true
        });
        if !changed {
            return;
        }
        info!(from = %previous, to = %lang, "language changed");
        if let Some(store) = &self.store {
            if let Err(e) = store.update(|p| p.language = lang) {
                warn!(error = %e, "failed to persist language preference");
            }
        }
    }
}
