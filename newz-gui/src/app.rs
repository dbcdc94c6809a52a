use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::DateTime;
use eframe::egui::{self, Color32, RichText, Rounding, Stroke};
use newz_core::error::TRANSLATION_ERROR_MESSAGE;
use newz_core::filter::{feed_stats, render_key};
use newz_core::summary::share_links;
use newz_core::{
    source_counts, visible_articles, AiSearch, ApiClient, ApiError, AppConfig, Article, Caches,
    Category, FeedKey, FeedView, Language, LanguageSettings, PreferencesStore, Sentiment,
    SourceFilter, SummaryResult, SummaryService, Theme,
};
use tokio::runtime::Runtime;
use tracing::{debug, error, info, warn};
use url::Url;

const ERROR_COLOR: Color32 = Color32::from_rgb(229, 57, 53);
const OK_COLOR: Color32 = Color32::from_rgb(67, 160, 71);
const ACCENT_COLOR: Color32 = Color32::from_rgb(0, 122, 204);
const BUSY_REPAINT: Duration = Duration::from_millis(150);
/// Typing pause before the search box is saved.
const FILTER_SAVE_DELAY: Duration = Duration::from_millis(300);

fn color_for_source(name: &str) -> Color32 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    name.hash(&mut hasher);
    const PALETTE: [Color32; 8] = [
        Color32::from_rgb(0, 122, 204),
        Color32::from_rgb(56, 142, 60),
        Color32::from_rgb(211, 47, 47),
        Color32::from_rgb(239, 108, 0),
        Color32::from_rgb(123, 31, 162),
        Color32::from_rgb(0, 131, 143),
        Color32::from_rgb(194, 24, 91),
        Color32::from_rgb(48, 63, 159),
    ];
    PALETTE[(hasher.finish() as usize) % PALETTE.len()]
}

pub struct AppInit {
    pub runtime: Arc<Runtime>,
    pub config: AppConfig,
    pub api: ApiClient,
    pub caches: Caches,
    pub prefs: PreferencesStore,
    pub language: Arc<LanguageSettings>,
}

enum Screen {
    Feed,
    Summary(Box<SummaryScreen>),
    Search,
    About,
}

struct SummaryScreen {
    article: Article,
    language: Language,
    service: Arc<SummaryService>,
    notice: Notice,
}

/// One-line status written by background tasks and read by the next frame.
#[derive(Clone, Default)]
struct Notice(Arc<Mutex<Option<(bool, String)>>>);

impl Notice {
    fn set(&self, ok: bool, message: impl Into<String>) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = Some((ok, message.into()));
    }

    fn clear(&self) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn get(&self) -> Option<(bool, String)> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn show(&self, ui: &mut egui::Ui) {
        if let Some((ok, message)) = self.get() {
            let color = if ok { OK_COLOR } else { ERROR_COLOR };
            ui.label(RichText::new(message).color(color).size(13.0));
        }
    }
}

pub struct NewzApp {
    runtime: Arc<Runtime>,
    config: AppConfig,
    api: ApiClient,
    caches: Caches,
    prefs: PreferencesStore,
    language: Arc<LanguageSettings>,
    category: Category,
    /// Mounted only while the feed screen is shown.
    feed: Option<Arc<FeedView>>,
    screen: Screen,
    query: String,
    source: SourceFilter,
    search: Arc<AiSearch>,
    search_input: String,
    search_notice: Notice,
    /// Set when the query changed and has not been saved yet.
    filters_dirty_since: Option<Instant>,
    /// A screen panicked while drawing; only the reload prompt is shown.
    crashed: bool,
}

impl NewzApp {
    pub fn new(ctx: &egui::Context, init: AppInit) -> Self {
        let prefs = init.prefs.get();
        apply_theme(ctx, prefs.effective_theme(), init.config.ui.font_size);

        let mut app = Self {
            runtime: init.runtime,
            category: init.config.feed.default_category,
            search: Arc::new(AiSearch::new(init.api.clone())),
            config: init.config,
            api: init.api,
            caches: init.caches,
            prefs: init.prefs,
            language: init.language,
            feed: None,
            screen: Screen::Feed,
            query: prefs.query,
            source: prefs.source,
            search_input: String::new(),
            search_notice: Notice::default(),
            filters_dirty_since: None,
            crashed: false,
        };
        app.mount_feed(ctx);
        app
    }

    /// Runs `task` on the Tokio runtime and repaints once it is done.
    fn spawn<F>(&self, ctx: &egui::Context, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            task.await;
            ctx.request_repaint();
        });
    }

    fn mount_feed(&mut self, ctx: &egui::Context) {
        let key = FeedKey::new(self.category, self.config.feed.country.clone());
        debug!(feed = %key, "mounting feed view");
        let view = Arc::new(
            FeedView::new(
                self.api.clone(),
                self.caches.clone(),
                key,
                self.config.feed.page_size,
                self.language.current(),
            )
            .with_filters(self.query.clone(), self.source.clone()),
        );
        self.runtime
            .spawn(view.language_listener(self.language.subscribe()));
        let first = Arc::clone(&view);
        self.spawn(ctx, async move {
            first.load_page(1).await;
        });
        self.feed = Some(view);
    }

    fn unmount_feed(&mut self) {
        if let Some(view) = self.feed.take() {
            view.close();
        }
    }

    fn show(&mut self, ctx: &egui::Context, screen: Screen) {
        if let Screen::Summary(current) = &self.screen {
            current.service.cancel();
        }
        let to_feed = matches!(screen, Screen::Feed);
        if !to_feed {
            self.unmount_feed();
        }
        self.screen = screen;
        if to_feed && self.feed.is_none() {
            self.mount_feed(ctx);
        }
    }

    fn select_category(&mut self, ctx: &egui::Context, category: Category) {
        self.category = category;
        let mounted = match (&self.screen, &self.feed) {
            (Screen::Feed, Some(view)) => Some(Arc::clone(view)),
            _ => None,
        };
        match mounted {
            Some(view) => self.spawn(ctx, async move {
                view.set_category(category).await;
            }),
            None => self.show(ctx, Screen::Feed),
        }
    }

    fn set_language(&mut self, ctx: &egui::Context, lang: Language) {
        self.language.set(lang);
        // the listener picks the change up on the runtime
        ctx.request_repaint_after(Duration::from_millis(50));
    }

    /// Saves the filters on the runtime.
    fn persist_filters(&mut self) {
        self.filters_dirty_since = None;
        let prefs = self.prefs.clone();
        let query = self.query.clone();
        let source = self.source.clone();
        self.runtime.spawn(async move {
            let saved = prefs
                .update_async(|p| {
                    p.query = query;
                    p.source = source;
                })
                .await;
            if let Err(e) = saved {
                warn!(error = %e, "failed to persist feed filters");
            }
        });
    }

    /// Saves the query once typing has paused for [`FILTER_SAVE_DELAY`].
    fn flush_filters(&mut self, ctx: &egui::Context) {
        let Some(since) = self.filters_dirty_since else {
            return;
        };
        let waited = since.elapsed();
        if waited < FILTER_SAVE_DELAY {
            ctx.request_repaint_after(FILTER_SAVE_DELAY - waited);
            return;
        }
        self.persist_filters();
    }

    /// Leaves the reload prompt: the feed view is mounted from scratch.
    fn reload(&mut self, ctx: &egui::Context) {
        info!("reloading after a rendering failure");
        self.crashed = false;
        self.unmount_feed();
        self.show(ctx, Screen::Feed);
    }

    fn draw_crashed(&mut self, ctx: &egui::Context) {
        let mut reload = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(80.0);
                ui.label(
                    RichText::new("Something went wrong.")
                        .strong()
                        .size(20.0)
                        .color(ERROR_COLOR),
                );
                ui.label(RichText::new("The page could not be displayed.").weak());
                ui.add_space(10.0);
                reload = ui.button("⟳ Reload").clicked();
            });
        });
        if reload {
            self.reload(ctx);
        }
    }

    fn open_summary(&mut self, ctx: &egui::Context, article: Article) {
        let screen = SummaryScreen {
            article,
            language: self.language.current(),
            service: Arc::new(SummaryService::new(
                self.api.clone(),
                self.caches.summaries.clone(),
            )),
            notice: Notice::default(),
        };
        self.request_summary(ctx, &screen);
        self.show(ctx, Screen::Summary(Box::new(screen)));
    }

    fn request_summary(&self, ctx: &egui::Context, screen: &SummaryScreen) {
        let service = Arc::clone(&screen.service);
        let description = screen.article.description_or_empty().to_string();
        let lang = screen.language;
        self.spawn(ctx, async move {
            service.summarize(&description, lang).await;
        });
    }

    fn is_busy(&self) -> bool {
        let feed_busy = self.feed.as_ref().is_some_and(|view| {
            let state = view.snapshot();
            state.loading || state.translating
        });
        let summary_busy = match &self.screen {
            Screen::Summary(screen) => screen.service.snapshot().loading,
            _ => false,
        };
        feed_busy || summary_busy || self.search.snapshot().loading
    }

    fn draw_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal_wrapped(|ui| {
                ui.label(RichText::new("📰 Newz").strong().size(20.0).color(ACCENT_COLOR));
                ui.separator();

                let on_feed = matches!(self.screen, Screen::Feed);
                for category in Category::ALL {
                    let selected = on_feed && self.category == category;
                    if ui.selectable_label(selected, category.title()).clicked() {
                        self.select_category(ctx, category);
                    }
                }
                ui.separator();
                if ui
                    .selectable_label(matches!(self.screen, Screen::Search), "🤖 AI Search")
                    .clicked()
                {
                    self.show(ctx, Screen::Search);
                }
                if ui
                    .selectable_label(matches!(self.screen, Screen::About), "ℹ About")
                    .clicked()
                {
                    self.show(ctx, Screen::About);
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let current = self.language.current();
                    let mut picked = current;
                    egui::ComboBox::from_id_source("language")
                        .selected_text(current.native_name())
                        .show_ui(ui, |ui| {
                            for lang in Language::ALL {
                                let label = format!("{} ({})", lang.native_name(), lang.name());
                                ui.selectable_value(&mut picked, lang, label);
                            }
                        });
                    ui.label("🌐");
                    if picked != current {
                        self.set_language(ctx, picked);
                    }
                });
            });

            if let Some(view) = &self.feed {
                let progress = *view.progress().borrow();
                if progress > 0 && progress < 100 {
                    ui.add(egui::ProgressBar::new(f32::from(progress) / 100.0));
                }
            }
            ui.add_space(2.0);
        });
    }

    fn draw_feed(&mut self, ui: &mut egui::Ui) {
        let Some(view) = self.feed.clone() else {
            return;
        };
        let ctx = ui.ctx().clone();
        let state = view.snapshot();

        ui.heading(
            RichText::new(format!("Top {} Headlines", self.category.title()))
                .strong()
                .size(20.0),
        );
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            let search = ui.add(
                egui::TextEdit::singleline(&mut self.query)
                    .hint_text("🔍 Search articles")
                    .desired_width(280.0),
            );
            if search.changed() {
                view.set_query(self.query.clone());
                self.filters_dirty_since = Some(Instant::now());
            }

            let counts = source_counts(state.displayed());
            let mut picked = self.source.clone();
            let selected = match &picked {
                SourceFilter::All => "All sources".to_string(),
                SourceFilter::Named(name) => name.clone(),
            };
            egui::ComboBox::from_id_source("source_filter")
                .selected_text(selected)
                .width(200.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut picked, SourceFilter::All, "All sources");
                    for (name, count) in &counts {
                        ui.selectable_value(
                            &mut picked,
                            SourceFilter::Named(name.clone()),
                            format!("{name} ({count})"),
                        );
                    }
                });
            if picked != self.source {
                self.source = picked;
                view.set_source(self.source.clone());
                self.persist_filters();
            }
        });

        let stats = feed_stats(&state);
        ui.horizontal(|ui| {
            chip(ui, format!("{} total", stats.total));
            chip(ui, format!("{} loaded", stats.loaded));
            chip(ui, format!("{} sources", stats.sources));
            if state.translating {
                ui.spinner();
                ui.label(RichText::new(format!("Translating to {}…", state.language.name())).weak());
            }
        });

        if let Some(error) = &state.error {
            egui::Frame::group(ui.style())
                .fill(Color32::from_rgb(253, 236, 234))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(RichText::new(error.as_str()).color(ERROR_COLOR));
                        if ui.button("⟳ Retry").clicked() {
                            let view = Arc::clone(&view);
                            let lang = state.language;
                            let translation = error == TRANSLATION_ERROR_MESSAGE;
                            self.spawn(&ctx, async move {
                                if translation {
                                    view.set_language(lang).await;
                                } else {
                                    view.retry().await;
                                }
                            });
                        }
                    });
                });
        }
        ui.separator();

        let visible = visible_articles(&state);
        let mut summarize: Option<Article> = None;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if visible.is_empty() && !state.loading && state.error.is_none() {
                    ui.vertical_centered(|ui| {
                        ui.add_space(40.0);
                        ui.label(RichText::new("📭 No articles match your filters").size(16.0));
                    });
                }

                for (index, article) in visible.iter().enumerate() {
                    ui.push_id(render_key(article, index), |ui| {
                        if draw_card(ui, article) {
                            summarize = Some((*article).clone());
                        }
                    });
                    ui.add_space(6.0);
                }

                if state.loading || state.translating {
                    ui.vertical_centered(|ui| ui.spinner());
                } else if state.has_more && !state.articles.is_empty() {
                    // scroll sentinel: asks for the next page once it comes into view
                    let (rect, _) = ui.allocate_exact_size(
                        egui::vec2(ui.available_width(), 1.0),
                        egui::Sense::hover(),
                    );
                    if ui.is_rect_visible(rect) {
                        let view = Arc::clone(&view);
                        self.spawn(&ctx, async move {
                            view.load_more().await;
                        });
                    }
                } else if !state.has_more && !state.articles.is_empty() && state.error.is_none() {
                    ui.vertical_centered(|ui| {
                        ui.add_space(8.0);
                        ui.label(RichText::new("You're all caught up.").weak());
                    });
                }
            });

        if let Some(article) = summarize {
            self.open_summary(&ctx, article);
        }
    }

    fn draw_summary(&mut self, ui: &mut egui::Ui) {
        let Screen::Summary(screen) = &self.screen else {
            return;
        };
        let ctx = ui.ctx().clone();
        let service = Arc::clone(&screen.service);
        let article = screen.article.clone();
        let notice = screen.notice.clone();
        let previous_language = screen.language;
        let mut language = previous_language;
        let mut back = false;
        let mut regenerate = false;
        let mut listen = false;
        let mut feedback = None;

        ui.horizontal(|ui| {
            if ui.button("← Back").clicked() {
                back = true;
            }
            ui.separator();
            ui.heading(RichText::new("✨ AI Summary").size(18.0));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                egui::ComboBox::from_id_source("summary_language")
                    .selected_text(language.native_name())
                    .show_ui(ui, |ui| {
                        for lang in Language::ALL {
                            ui.selectable_value(&mut language, lang, lang.native_name());
                        }
                    });
            });
        });
        ui.separator();

        let state = service.snapshot();
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                ui.label(RichText::new(article.title_or_empty()).strong().size(20.0));
                if let Some(source) = article.source_name() {
                    ui.label(RichText::new(source).color(color_for_source(source)));
                }
                ui.add_space(8.0);

                if article.description_or_empty().trim().is_empty() {
                    ui.label(RichText::new("This article has no description to summarize.").weak());
                } else if state.loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Generating summary…");
                    });
                } else if let Some(error) = &state.error {
                    ui.label(RichText::new(error.as_str()).color(ERROR_COLOR));
                    if ui.button("⟳ Retry").clicked() {
                        regenerate = true;
                    }
                } else if let Some(result) = &state.result {
                    draw_summary_result(ui, result);
                    ui.add_space(8.0);
                    ui.horizontal_wrapped(|ui| {
                        if ui.button("🔊 Listen").clicked() {
                            listen = true;
                        }
                        if ui.button("📋 Copy").clicked() {
                            ui.output_mut(|o| o.copied_text = summary_text(result));
                            notice.set(true, "Summary copied to the clipboard.");
                        }
                        match share_links(&result.summary.event, &article.url) {
                            Ok(links) => {
                                if ui.link("Share on X").clicked() {
                                    open_link(&links.x);
                                }
                                if ui.link("Share on LinkedIn").clicked() {
                                    open_link(&links.linkedin);
                                }
                            }
                            Err(e) => debug!(error = %e, "no share links for article"),
                        }
                    });
                    ui.add_space(4.0);
                    ui.horizontal(|ui| {
                        if state.feedback_sent {
                            ui.label(RichText::new("Thanks for your feedback!").weak());
                        } else {
                            ui.label("Was this summary useful?");
                            if ui.small_button("👍").clicked() {
                                feedback = Some(true);
                            }
                            if ui.small_button("👎").clicked() {
                                feedback = Some(false);
                            }
                        }
                    });
                }
                notice.show(ui);
                ui.add_space(8.0);
                if ui.small_button("🔗 Read the full article").clicked() {
                    open_link(&article.url);
                }
            });

        if back {
            self.show(&ctx, Screen::Feed);
            return;
        }
        if language != previous_language || regenerate {
            notice.clear();
            if let Screen::Summary(screen) = &mut self.screen {
                screen.language = language;
            }
            if let Screen::Summary(screen) = &self.screen {
                self.request_summary(&ctx, screen);
            }
        }
        if listen {
            let text = state
                .result
                .as_ref()
                .map(|r| r.summary.event.clone())
                .unwrap_or_default();
            let title = article.title_or_empty().to_string();
            let service = Arc::clone(&service);
            let notice = notice.clone();
            notice.set(true, "Preparing audio…");
            self.spawn(&ctx, async move {
                match service.speak(&title, &text, language).await {
                    Ok(audio) => match play_audio(&audio).await {
                        Ok(()) => notice.clear(),
                        Err(e) => {
                            warn!(error = %e, "could not play summary audio");
                            notice.set(false, "Could not play the audio.");
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "text-to-speech failed");
                        notice.set(false, "Could not generate audio.");
                    }
                }
            });
        }
        if let Some(useful) = feedback {
            let title = article.title_or_empty().to_string();
            let url = article.url.clone();
            self.spawn(&ctx, async move {
                if let Err(e) = service.send_feedback(&title, &url, useful).await {
                    warn!(error = %e, "failed to send feedback");
                    notice.set(false, "Could not send feedback.");
                }
            });
        }
    }

    fn draw_search(&mut self, ui: &mut egui::Ui) {
        let ctx = ui.ctx().clone();
        let state = self.search.snapshot();
        let mut submit = false;
        let mut reindex = false;

        ui.heading(RichText::new("🤖 AI Search").size(18.0));
        ui.label(RichText::new("Ask a question about the latest indexed news.").weak());
        ui.separator();

        ui.horizontal(|ui| {
            let width = (ui.available_width() - 220.0).max(200.0);
            let input = ui.add(
                egui::TextEdit::singleline(&mut self.search_input)
                    .hint_text("What happened in the markets today?")
                    .desired_width(width),
            );
            if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                submit = true;
            }
            if ui
                .add_enabled(!state.loading, egui::Button::new("Ask"))
                .clicked()
            {
                submit = true;
            }
            if ui
                .button("⟳ Update index")
                .on_hover_text("Re-index the latest articles")
                .clicked()
            {
                reindex = true;
            }
        });
        self.search_notice.show(ui);
        ui.add_space(6.0);

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                if state.loading {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Searching…");
                    });
                }
                if let Some(error) = &state.error {
                    ui.label(RichText::new(error.as_str()).color(ERROR_COLOR));
                }
                if let Some(answer) = &state.result {
                    egui::Frame::group(ui.style()).show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.label(RichText::new("Answer").strong().size(15.0));
                        ui.label(answer.answer.as_str());
                    });
                    if !answer.sources.is_empty() {
                        ui.add_space(6.0);
                        ui.label(RichText::new("Sources").strong().size(15.0));
                    }
                    for (index, source) in answer.sources.iter().enumerate() {
                        ui.push_id(index, |ui| {
                            egui::Frame::group(ui.style()).show(ui, |ui| {
                                ui.set_width(ui.available_width());
                                let title = if source.title.is_empty() {
                                    source.url.as_str()
                                } else {
                                    source.title.as_str()
                                };
                                if ui.link(RichText::new(title).strong()).clicked() {
                                    open_link(&source.url);
                                }
                                ui.label(RichText::new(excerpt(&source.content, 280)).weak().size(13.0));
                            });
                        });
                        ui.add_space(4.0);
                    }
                }
            });

        if submit {
            self.search_notice.clear();
            let search = Arc::clone(&self.search);
            let notice = self.search_notice.clone();
            let query = self.search_input.clone();
            self.spawn(&ctx, async move {
                if let Err(ApiError::EmptyQuery) = search.search(&query).await {
                    notice.set(false, "Please enter a question.");
                }
            });
        }
        if reindex {
            let search = Arc::clone(&self.search);
            let notice = self.search_notice.clone();
            notice.set(true, "Updating the index…");
            self.spawn(&ctx, async move {
                match search.trigger_indexing().await {
                    Ok(_) => notice.set(true, "Index update started."),
                    Err(e) => {
                        warn!(error = %e, "index update failed");
                        notice.set(false, "Could not start the index update.");
                    }
                }
            });
        }
    }
}

impl Drop for NewzApp {
    fn drop(&mut self) {
        if self.filters_dirty_since.take().is_some() {
            let query = self.query.clone();
            let source = self.source.clone();
            if let Err(e) = self.prefs.update(|p| {
                p.query = query;
                p.source = source;
            }) {
                warn!(error = %e, "failed to persist feed filters");
            }
        }
        self.unmount_feed();
        self.search.cancel();
        if let Screen::Summary(screen) = &self.screen {
            screen.service.cancel();
        }
    }
}

impl eframe::App for NewzApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.crashed {
            self.draw_crashed(ctx);
            return;
        }
        let drawn = panic::catch_unwind(AssertUnwindSafe(|| {
            self.draw_top_bar(ctx);
            egui::CentralPanel::default().show(ctx, |ui| match self.screen {
                Screen::Feed => self.draw_feed(ui),
                Screen::Summary(_) => self.draw_summary(ui),
                Screen::Search => self.draw_search(ui),
                Screen::About => draw_about(ui),
            });
        }));
        if let Err(payload) = drawn {
            error!(panic = %panic_message(payload.as_ref()), "screen rendering failed");
            self.crashed = true;
            self.unmount_feed();
            ctx.request_repaint();
            return;
        }
        self.flush_filters(ctx);
        if self.is_busy() {
            ctx.request_repaint_after(BUSY_REPAINT);
        }
    }
}

fn draw_card(ui: &mut egui::Ui, article: &Article) -> bool {
    let mut summarize = false;
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.vertical(|ui| {
            let title = ui.add(
                egui::Label::new(RichText::new(article.title_or_empty()).strong().size(17.0))
                    .wrap(true)
                    .sense(egui::Sense::click()),
            );
            if title.on_hover_text(article.url.as_str()).clicked() {
                open_link(&article.url);
            }

            ui.horizontal_wrapped(|ui| {
                if let Some(source) = article.source_name() {
                    ui.label(RichText::new(source).color(color_for_source(source)).size(12.0));
                    ui.separator();
                }
                if let Some(author) = article.author.as_deref().filter(|a| !a.is_empty()) {
                    ui.label(RichText::new(format!("👤 {author}")).weak().size(12.0));
                    ui.separator();
                }
                if let Some(date) = &article.published_at {
                    ui.label(RichText::new(format!("📅 {}", format_date(date))).weak().size(12.0));
                }
            });

            let description = article.description_or_empty();
            if !description.is_empty() {
                ui.add_space(3.0);
                ui.label(RichText::new(description).size(13.0));
            }

            ui.add_space(4.0);
            ui.horizontal(|ui| {
                if ui.small_button("🔗 Read more").clicked() {
                    open_link(&article.url);
                }
                if ui.small_button("✨ Summary").clicked() {
                    summarize = true;
                }
            });
        });
    });
    summarize
}

fn draw_summary_result(ui: &mut egui::Ui, result: &SummaryResult) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_width(ui.available_width());
        ui.label(RichText::new("What happened").strong().size(15.0));
        ui.label(result.summary.event.as_str());
        if !result.summary.background.is_empty() {
            ui.add_space(6.0);
            ui.label(RichText::new("Background").strong().size(15.0));
            ui.label(result.summary.background.as_str());
        }
    });
    ui.add_space(6.0);

    let insights = &result.insights;
    let sentiment_color = match Sentiment::classify(&insights.sentiment) {
        Sentiment::Positive => OK_COLOR,
        Sentiment::Negative => ERROR_COLOR,
        Sentiment::Neutral => Color32::from_rgb(117, 117, 117),
    };
    ui.label(RichText::new("Quick insights").strong().size(15.0));
    egui::Grid::new("insights")
        .num_columns(2)
        .spacing([16.0, 4.0])
        .show(ui, |ui| {
            ui.label("Sentiment");
            ui.label(RichText::new(insights.sentiment.as_str()).color(sentiment_color));
            ui.end_row();
            for (label, value) in [
                ("Read time", &insights.read_time),
                ("Context", &insights.context),
                ("Relevance", &insights.relevance),
                ("Bias", &insights.bias),
                ("What's next", &insights.next),
            ] {
                ui.label(label);
                ui.label(value.as_str());
                ui.end_row();
            }
            ui.label("Words");
            ui.label(insights.word_count.to_string());
            ui.end_row();
        });

    if let Some(model) = &result.model {
        let confidence = result
            .confidence
            .map(|c| format!(" · {:.0}% confidence", c * 100.0))
            .unwrap_or_default();
        ui.label(RichText::new(format!("Generated by {model}{confidence}")).weak().size(12.0));
    }
}

fn draw_about(ui: &mut egui::Ui) {
    ui.heading(RichText::new("ℹ About Newz").size(18.0));
    ui.separator();
    ui.label("Newz shows the top headlines by category and keeps scrolling as long as there is more news.");
    ui.add_space(6.0);
    for line in [
        "• Read the news in English, हिन्दी, मराठी, Español or Français.",
        "• Get an AI summary of any article with quick insights, and listen to it.",
        "• Ask questions about recent news with AI Search.",
        "• Filter loaded articles by keyword or source.",
    ] {
        ui.label(line);
    }
}

fn chip(ui: &mut egui::Ui, text: String) {
    egui::Frame::none()
        .fill(Color32::from_rgb(232, 240, 254))
        .rounding(Rounding::same(10.0))
        .inner_margin(egui::Margin::symmetric(8.0, 2.0))
        .show(ui, |ui| {
            ui.label(RichText::new(text).size(12.0).color(ACCENT_COLOR));
        });
}

fn summary_text(result: &SummaryResult) -> String {
    if result.summary.background.is_empty() {
        result.summary.event.clone()
    } else {
        format!("{}\n\n{}", result.summary.event, result.summary.background)
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

/// RFC 3339 timestamps are shown as e.g. "Mar 4, 2025 09:30"; anything else verbatim.
fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.format("%b %-d, %Y %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn open_link(url: &str) {
    if let Err(e) = webbrowser::open(url) {
        warn!(url, error = %e, "could not open link");
    }
}

/// Writes the audio to the temp dir and hands it to the system player.
async fn play_audio(audio: &[u8]) -> std::io::Result<()> {
    let path = std::env::temp_dir().join("newz-summary.mp3");
    tokio::fs::write(&path, audio).await?;
    info!(path = %path.display(), bytes = audio.len(), "playing summary audio");
    webbrowser::open(file_url(&path)?.as_str())
}

fn file_url(path: &Path) -> std::io::Result<Url> {
    Url::from_file_path(path).map_err(|()| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not an absolute path: {}", path.display()),
        )
    })
}

fn apply_theme(ctx: &egui::Context, theme: Theme, font_size: f32) {
    match theme {
        Theme::Light => setup_light_theme(ctx),
        Theme::Dark => ctx.set_visuals(egui::Visuals::dark()),
    }
    let mut style = (*ctx.style()).clone();
    for (text_style, font) in style.text_styles.iter_mut() {
        if matches!(text_style, egui::TextStyle::Body | egui::TextStyle::Button) {
            font.size = font_size;
        }
    }
    ctx.set_style(style);
}

fn setup_light_theme(ctx: &egui::Context) {
    let mut style = (*ctx.style()).clone();

    let panel_color = Color32::from_rgb(248, 249, 250);
    let border_color = Color32::from_rgb(218, 220, 224);
    let text_color = Color32::from_rgb(32, 33, 36);
    let hover_color = Color32::from_rgb(232, 240, 254);

    style.visuals = egui::Visuals::light();
    style.visuals.panel_fill = panel_color;
    style.visuals.window_fill = Color32::WHITE;
    style.visuals.extreme_bg_color = Color32::WHITE;
    style.visuals.faint_bg_color = Color32::from_rgb(241, 243, 244);
    style.visuals.override_text_color = Some(text_color);

    style.visuals.widgets.noninteractive.bg_fill = Color32::WHITE;
    style.visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, border_color);
    style.visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, text_color);

    style.visuals.widgets.inactive.bg_fill = Color32::from_rgb(241, 243, 244);
    style.visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, border_color);
    style.visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, text_color);

    style.visuals.widgets.hovered.bg_fill = hover_color;
    style.visuals.widgets.hovered.bg_stroke = Stroke::new(1.0, ACCENT_COLOR);
    style.visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, text_color);

    style.visuals.widgets.active.bg_fill = ACCENT_COLOR;
    style.visuals.widgets.active.bg_stroke = Stroke::new(1.0, ACCENT_COLOR);
    style.visuals.widgets.active.fg_stroke = Stroke::new(1.0, Color32::WHITE);

    style.visuals.selection.bg_fill = Color32::from_rgba_unmultiplied(0, 122, 204, 60);
    style.visuals.selection.stroke = Stroke::new(1.0, ACCENT_COLOR);

    for widget in [
        &mut style.visuals.widgets.noninteractive,
        &mut style.visuals.widgets.inactive,
        &mut style.visuals.widgets.hovered,
        &mut style.visuals.widgets.active,
    ] {
        widget.rounding = Rounding::same(4.0);
    }

    style.spacing.item_spacing = egui::vec2(10.0, 8.0);
    style.spacing.button_padding = egui::vec2(10.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(10.0);
    style.spacing.interact_size = egui::vec2(36.0, 28.0);

    ctx.set_style(style);
}

/// Text of a caught panic, for the log.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
