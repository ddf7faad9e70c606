//! Application state: the view-state controller.
//!
//! `App` composes the three asynchronous sources (the catalog load, the
//! identity bootstrap and the favorite subscription) into one renderable
//! state. Background work reports through [`AppEvent`]s that the event
//! loop feeds to [`App::handle_event`] one at a time, so every state
//! transition happens on the task that owns `App`.

mod tasks;
mod view;

pub use view::{
    level_distribution, page_slice, page_window, search, total_pages, LevelCount, Screen,
    ViewState, DEFAULT_PAGE_SIZE, MAX_SEARCH_RESULTS,
};

use anyhow::Result;
use ratatui::style::Style;
use reqwest::redirect::Policy;
use secrecy::SecretString;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::catalog::{CatalogState, Entity, FetchError};
use crate::config::Config;
use crate::favorites::FavoriteSync;
use crate::identity::{IdentityService, SessionState};
use crate::storage::{Document, DocumentStore, StoreError};
use crate::theme::{StyleMap, ThemeVariant};

// ============================================================================
// Events
// ============================================================================

#[derive(Debug)]
pub enum AppEvent {
    /// The startup catalog fetch finished.
    CatalogLoaded(Result<Vec<Entity>, FetchError>),
    /// The identity bootstrap finished (possibly without an identity).
    SessionReady(SessionState),
    /// A favorite subscription notification.
    ///
    /// `generation` identifies the listener that produced it, so
    /// notifications from a torn-down listener can be dropped.
    FavoritesSnapshot {
        generation: u64,
        result: Result<Vec<Document>, StoreError>,
    },
    /// A background task panicked.
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// HTTP Client Configuration
// ============================================================================

/// At most three redirect hops, refusing loops.
fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        if attempt.previous().iter().any(|prev| prev == attempt.url()) {
            return attempt.error("Redirect loop detected");
        }
        tracing::debug!(to = %attempt.url(), hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    /// No request timeout: the listing service's own errors are the only
    /// failure signal.
    pub http_client: reqwest::Client,
    pub catalog_url: String,

    // Core state
    pub(crate) catalog: CatalogState,
    pub(crate) session: SessionState,
    pub(crate) favorites: FavoriteSync,
    pub(crate) view: ViewState,

    // Presentation
    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,
    /// Highlighted row on the list screens (Home, Favorites, Search).
    pub cursor: usize,
    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub show_help: bool,

    catalog_handle: Option<JoinHandle<()>>,
    session_handle: Option<JoinHandle<()>>,
}

impl App {
    /// Build the initial state. Nothing runs until [`App::start`].
    ///
    /// `store` is `None` when no document store is configured or it could
    /// not be opened; favorites are then disabled for the whole session.
    pub fn new(config: &Config, store: Option<Arc<dyn DocumentStore>>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(redirect_policy())
            .user_agent(concat!("digidex/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(2)
            .build()?;

        let theme_variant = ThemeVariant::from_str_name(&config.theme).unwrap_or_else(|| {
            tracing::warn!(theme = %config.theme, "Unknown theme, using dark");
            ThemeVariant::Dark
        });

        Ok(Self {
            http_client,
            catalog_url: config.catalog_url.clone(),
            catalog: CatalogState::new(),
            session: SessionState::pending(),
            favorites: FavoriteSync::new(&config.app_id, store),
            view: ViewState::new(config.page_size),
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            cursor: 0,
            status_message: None,
            needs_redraw: true,
            show_help: false,
            catalog_handle: None,
            session_handle: None,
        })
    }

    /// Kick off the catalog load and the identity bootstrap concurrently.
    ///
    /// Without a store, or without an identity service, no identity is
    /// requested and the session is ready immediately.
    pub fn start(
        &mut self,
        identity: Option<Arc<dyn IdentityService>>,
        token: Option<SecretString>,
        tx: &mpsc::Sender<AppEvent>,
    ) {
        self.catalog_handle = Some(tasks::spawn_catalog_load(
            self.http_client.clone(),
            self.catalog_url.clone(),
            tx.clone(),
        ));

        match identity {
            Some(service) if self.favorites.has_store() => {
                self.session_handle = Some(tasks::spawn_identity_bootstrap(
                    service,
                    token,
                    tx.clone(),
                ));
            }
            _ => {
                tracing::info!("No document store; favorites disabled");
                self.session = SessionState::unresolved();
            }
        }
    }

    /// Apply one background event.
    pub fn handle_event(&mut self, event: AppEvent, tx: &mpsc::Sender<AppEvent>) {
        match event {
            AppEvent::CatalogLoaded(result) => {
                if self.catalog.complete(result) {
                    let total = self.total_pages();
                    self.view.clamp_page(total);
                    self.clamp_cursor();
                }
            }
            AppEvent::SessionReady(state) => {
                if self.session.ready {
                    tracing::debug!("Session already resolved; ignoring");
                    return;
                }
                self.session = state;
                if let Some(identity) = self.session.identity.clone() {
                    if let Err(e) = self.favorites.activate(identity, tx) {
                        tracing::warn!(error = %e, "Favorites not activated");
                    }
                }
            }
            AppEvent::FavoritesSnapshot { generation, result } => {
                if self.favorites.apply_snapshot(generation, result) {
                    self.clamp_cursor();
                }
            }
            AppEvent::TaskPanicked { task, error } => {
                tracing::error!(task, error = %error, "Task panicked");
                self.set_status(format!("Background task failed: {task}"));
            }
        }
        self.needs_redraw = true;
    }

    // ========================================================================
    // Read access
    // ========================================================================

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn favorites(&self) -> &FavoriteSync {
        &self.favorites
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Resolve a semantic role name to its `Style`.
    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    pub fn cycle_theme(&mut self) {
        self.theme_variant = self.theme_variant.next();
        self.theme = StyleMap::from_palette(&self.theme_variant.palette());
        self.set_status(format!("Theme: {}", self.theme_variant.name()));
    }

    // ========================================================================
    // Intents
    // ========================================================================

    pub fn navigate(&mut self, screen: Screen) {
        self.view.navigate(screen);
        self.cursor = 0;
    }

    pub fn select(&mut self, entity: Entity) {
        self.view.select(entity);
    }

    /// Open the highlighted entity on the Details screen.
    pub fn select_highlighted(&mut self) -> bool {
        match self.highlighted_entity() {
            Some(entity) => {
                self.select(entity);
                true
            }
            None => false,
        }
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.view.set_search_term(term);
        self.cursor = 0;
    }

    pub fn go_to_page(&mut self, n: usize) -> bool {
        let total = self.total_pages();
        let moved = self.view.go_to_page(n, total);
        if moved {
            self.cursor = 0;
        }
        moved
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.view.page_index() + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.go_to_page(self.view.page_index().saturating_sub(1))
    }

    pub fn first_page(&mut self) -> bool {
        self.go_to_page(1)
    }

    pub fn last_page(&mut self) -> bool {
        self.go_to_page(self.total_pages())
    }

    /// Toggle `entity`'s favorite membership.
    ///
    /// The write runs on a spawned task; the mirror changes only when the
    /// subscription reports back. When favorites are unavailable this is a
    /// logged no-op.
    ///
    /// # Returns
    ///
    /// `true` if a write was dispatched.
    pub fn toggle_favorite(&mut self, entity: &Entity, tx: &mpsc::Sender<AppEvent>) -> bool {
        match self.favorites.plan_toggle(entity) {
            Ok(write) => {
                tasks::spawn_favorite_write(write, tx.clone());
                true
            }
            Err(e) => {
                tracing::info!(entity = %entity.name, error = %e, "Favorite toggle ignored");
                false
            }
        }
    }

    /// Toggle the entity on the Details screen, or the highlighted row.
    pub fn toggle_current_favorite(&mut self, tx: &mpsc::Sender<AppEvent>) -> bool {
        let target = match self.view.selected() {
            Some(entity) => Some(entity.clone()),
            None => self.highlighted_entity(),
        };
        match target {
            Some(entity) => self.toggle_favorite(&entity, tx),
            None => false,
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_entities().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_cursor(&mut self) {
        let len = self.visible_entities().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
        self.needs_redraw = true;
    }

    /// Clear the status message once it is older than 3 seconds.
    /// Returns true if a message was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= 3 {
                self.status_message = None;
                return true;
            }
        }
        false
    }

    // ========================================================================
    // Derived state
    // ========================================================================

    /// True until both the catalog has loaded and the session is ready.
    pub fn is_loading(&self) -> bool {
        self.catalog.is_loading() || !self.session.ready
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.catalog.entities().len(), self.view.page_size())
    }

    pub fn current_page_slice(&self) -> &[Entity] {
        page_slice(
            self.catalog.entities(),
            self.view.page_index(),
            self.view.page_size(),
        )
    }

    pub fn search_results(&self) -> Vec<&Entity> {
        search(self.catalog.entities(), self.view.search_term())
    }

    /// Favorites in mirror order, resolved to catalog entities.
    ///
    /// A favorite whose entity is not in the catalog (e.g. the fetch failed)
    /// is shown from the fields saved in its record.
    pub fn favorite_list(&self) -> Vec<Entity> {
        self.favorites
            .records()
            .iter()
            .map(|record| match self.catalog.find(&record.key) {
                Some(entity) => entity.clone(),
                None => Entity::new(
                    &record.name,
                    record.level.as_deref(),
                    record.image.as_deref(),
                ),
            })
            .collect()
    }

    pub fn level_distribution(&self) -> Vec<LevelCount> {
        level_distribution(self.catalog.entities())
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.contains(name)
    }

    /// Rows of the current list screen; empty on the other screens.
    pub fn visible_entities(&self) -> Vec<Entity> {
        match self.view.screen() {
            Screen::Home => self.current_page_slice().to_vec(),
            Screen::Favorites => self.favorite_list(),
            Screen::Search => self.search_results().into_iter().cloned().collect(),
            Screen::Details | Screen::Stats | Screen::Info => Vec::new(),
        }
    }

    pub fn highlighted_entity(&self) -> Option<Entity> {
        self.visible_entities().into_iter().nth(self.cursor)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.catalog_handle.take() {
            handle.abort();
            tracing::debug!("Aborted catalog task on App drop");
        }
        if let Some(handle) = self.session_handle.take() {
            handle.abort();
            tracing::debug!("Aborted identity task on App drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::storage::Database;
    use pretty_assertions::assert_eq;

    fn test_app(store: Option<Arc<dyn DocumentStore>>) -> App {
        let config = Config {
            page_size: 20,
            ..Config::default()
        };
        App::new(&config, store).unwrap()
    }

    fn entities(n: usize) -> Vec<Entity> {
        (0..n)
            .map(|i| Entity::new(&format!("Mon{i:02}"), Some("Rookie"), None))
            .collect()
    }

    #[tokio::test]
    async fn test_loading_until_both_sources_resolve() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        assert!(app.is_loading());

        app.handle_event(AppEvent::SessionReady(SessionState::unresolved()), &tx);
        assert!(app.is_loading(), "catalog still loading");

        app.handle_event(AppEvent::CatalogLoaded(Ok(entities(3))), &tx);
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_catalog_before_session_still_loading() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);

        app.handle_event(AppEvent::CatalogLoaded(Ok(entities(3))), &tx);
        assert!(app.is_loading(), "session not ready");

        app.handle_event(AppEvent::SessionReady(SessionState::unresolved()), &tx);
        assert!(!app.is_loading());
    }

    #[tokio::test]
    async fn test_catalog_failure_is_empty_not_blocking() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.handle_event(AppEvent::SessionReady(SessionState::unresolved()), &tx);
        app.handle_event(AppEvent::CatalogLoaded(Err(FetchError::HttpStatus(500))), &tx);

        assert!(!app.is_loading());
        assert!(app.current_page_slice().is_empty());
        assert_eq!(app.total_pages(), 0);
        assert!(!app.go_to_page(1));
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_paging_intents() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.handle_event(AppEvent::CatalogLoaded(Ok(entities(45))), &tx);

        assert_eq!(app.total_pages(), 3);
        assert!(app.last_page());
        assert_eq!(app.current_page_slice().len(), 5);
        assert!(!app.next_page());
        assert!(app.prev_page());
        assert_eq!(app.view().page_index(), 2);
        assert!(app.first_page());
        assert!(!app.prev_page());
        assert_eq!(app.view().page_index(), 1);
    }

    #[tokio::test]
    async fn test_second_session_event_ignored() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.handle_event(AppEvent::SessionReady(SessionState::unresolved()), &tx);
        app.handle_event(
            AppEvent::SessionReady(SessionState::resolved(Identity::parse("late").unwrap())),
            &tx,
        );
        assert_eq!(app.session().identity, None);
    }

    #[tokio::test]
    async fn test_start_without_store_is_ready() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.catalog_url = "http://127.0.0.1:9/never".into();
        app.start(None, None, &tx);
        assert!(app.session().ready);
        assert!(app.session().identity.is_none());
    }

    #[tokio::test]
    async fn test_toggle_without_identity_is_noop() {
        let (tx, _rx) = mpsc::channel(8);
        let store: Arc<dyn DocumentStore> = Arc::new(Database::open(":memory:").await.unwrap());
        let mut app = test_app(Some(store));
        app.handle_event(AppEvent::SessionReady(SessionState::unresolved()), &tx);

        let agumon = Entity::new("Agumon", Some("Rookie"), None);
        assert!(!app.toggle_favorite(&agumon, &tx));
        assert!(!app.is_favorite("Agumon"));
    }

    #[tokio::test]
    async fn test_cursor_and_selection() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.handle_event(AppEvent::CatalogLoaded(Ok(entities(4))), &tx);

        app.move_cursor(2);
        assert_eq!(app.highlighted_entity().map(|e| e.name.to_string()), Some("Mon02".into()));
        app.move_cursor(10);
        assert_eq!(app.cursor, 3);
        app.move_cursor(-10);
        assert_eq!(app.cursor, 0);

        assert!(app.select_highlighted());
        assert_eq!(app.view().screen(), Screen::Details);
        assert!(app.visible_entities().is_empty());

        app.navigate(Screen::Home);
        assert!(app.view().selected().is_none());
    }

    #[tokio::test]
    async fn test_search_screen_rows() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.handle_event(
            AppEvent::CatalogLoaded(Ok(vec![
                Entity::new("Agumon", Some("Rookie"), None),
                Entity::new("Greymon", Some("Champion"), None),
            ])),
            &tx,
        );
        app.set_search_term("grey");
        app.navigate(Screen::Search);

        let rows: Vec<String> = app.visible_entities().iter().map(|e| e.name.to_string()).collect();
        assert_eq!(rows, vec!["Greymon".to_string()]);
    }

    #[tokio::test]
    async fn test_task_panic_sets_status() {
        let (tx, _rx) = mpsc::channel(8);
        let mut app = test_app(None);
        app.handle_event(
            AppEvent::TaskPanicked {
                task: "catalog_load",
                error: "boom".into(),
            },
            &tx,
        );
        let (msg, _) = app.status_message.as_ref().unwrap();
        assert!(msg.contains("catalog_load"));
    }

    #[tokio::test]
    async fn test_status_expires() {
        let mut app = test_app(None);
        app.set_status("hello");
        assert!(!app.clear_expired_status());
        app.status_message = Some(("old".into(), Instant::now() - std::time::Duration::from_secs(5)));
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }
}
