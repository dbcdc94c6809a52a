mod app;

use std::sync::Arc;

use eframe::{egui, NativeOptions};
use newz_core::config::config_dir;
use newz_core::{ApiClient, ApiConfig, AppConfig, Caches, LanguageSettings, PreferencesStore};
use reqwest::{redirect, ClientBuilder};
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{AppInit, NewzApp};

fn main() -> eframe::Result<()> {
    init_tracing();

    let runtime = Arc::new(Runtime::new().expect("failed to initialise Tokio runtime"));
    let config = AppConfig::load();
    let client = ClientBuilder::new()
        .redirect(redirect::Policy::limited(5))
        .user_agent(config.api.user_agent.as_str())
        .build()
        .expect("failed to build HTTP client");
    let api = match ApiClient::new(client.clone(), &config.api) {
        Ok(api) => api,
        Err(e) => {
            warn!(error = %e, base = %config.api.base_url, "invalid api base url, using the default");
            ApiClient::new(client, &ApiConfig::default()).expect("default api base url is valid")
        }
    };
    let prefs = load_preferences();
    let mut language = LanguageSettings::with_store(prefs.clone());
    if let Some(lang) = config.feed.language {
        language = language.starting_in(lang);
    }
    let language = Arc::new(language);
    info!(base = api.base_url(), language = %language.current(), "starting newz");

    let ui = config.ui.clone();
    let init = AppInit {
        runtime,
        config,
        api,
        caches: Caches::new(),
        prefs,
        language,
    };

    eframe::run_native(
        "Newz",
        NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_title("Newz")
                .with_inner_size([ui.window_width, ui.window_height])
                .with_min_inner_size([600.0, 500.0]),
            ..Default::default()
        },
        Box::new(move |cc| {
            install_fonts(&cc.egui_ctx);
            Box::new(NewzApp::new(&cc.egui_ctx, init))
        }),
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn load_preferences() -> PreferencesStore {
    match config_dir() {
        Ok(dir) => PreferencesStore::load_from_dir(dir),
        Err(e) => {
            warn!(error = %e, "no config directory, preferences will not be saved");
            PreferencesStore::in_memory()
        }
    }
}

/// Adds system fonts as fallbacks so Devanagari (Hindi, Marathi) and emoji render.
fn install_fonts(ctx: &egui::Context) {
    let mut fonts = egui::FontDefinitions::default();

    let candidates = [
        "/usr/share/fonts/truetype/noto/NotoSansDevanagari-Regular.ttf",
        "/usr/share/fonts/opentype/noto/NotoSansDevanagari-Regular.otf",
        "/usr/share/fonts/truetype/lohit-devanagari/Lohit-Devanagari.ttf",
        "/usr/share/fonts/truetype/noto/NotoEmoji-Regular.ttf",
        "/usr/share/fonts/opentype/noto/NotoSansSymbols2-Regular.otf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    ];

    let mut added: Vec<String> = Vec::new();
    for path in candidates {
        let Ok(bytes) = std::fs::read(path) else {
            continue;
        };
        let name = format!("system-{}", added.len());
        fonts
            .font_data
            .insert(name.clone(), egui::FontData::from_owned(bytes));
        for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
            fonts.families.entry(family).or_default().push(name.clone());
        }
        added.push(name);
    }

    if !added.is_empty() {
        info!(fonts = added.len(), "installed fallback fonts");
        ctx.set_fonts(fonts);
    }
}
