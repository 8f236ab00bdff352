//! The prompt collection store.
//!
//! Holds two projections of the remote collection: every prompt from the last
//! full fetch ("all known", newest first) and the subset currently on screen
//! ("displayed"). Filters other than favorites are computed locally from the
//! snapshot; search and favorites come verbatim from the remote store.
//!
//! Every operation that replaces the displayed projection takes a new view
//! generation. A response that arrives after a newer view was requested is
//! dropped instead of overwriting it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::entity::{sort_newest_first, Prompt, Viewer};
use crate::error::{PromptBayError, Result};
use crate::filter::{FilterDescriptor, FilterKind};
use crate::notify::{messages, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    /// The last load failed. Any earlier snapshot is still held.
    Error,
}

/// What the displayed projection currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Browse,
    Filtered(FilterDescriptor),
    Search(String),
    Favorites,
}

impl View {
    /// The active filter descriptor; search and browse have none.
    pub fn filter(&self) -> FilterDescriptor {
        match self {
            View::Filtered(filter) => filter.clone(),
            View::Favorites => FilterDescriptor::new(FilterKind::Favorites, None),
            View::Browse | View::Search(_) => FilterDescriptor::new(FilterKind::None, None),
        }
    }
}

/// Whether an operation's result reached the displayed projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer view was requested while this one was in flight.
    Superseded,
}

struct StoreState {
    all_known: Vec<Prompt>,
    displayed: Vec<Prompt>,
    view: View,
    load_state: LoadState,
    last_error: Option<String>,
    viewer: Option<Viewer>,
    view_generation: u64,
    load_generation: u64,
}

impl StoreState {
    fn next_view(&mut self) -> u64 {
        self.view_generation += 1;
        self.view_generation
    }

    fn identity(&self) -> Option<&str> {
        self.viewer.as_ref().and_then(Viewer::identity)
    }

    fn show_all(&mut self) {
        self.view = View::Browse;
        self.displayed = self.all_known.clone();
    }

    /// Recompute a locally derivable view from `all_known`.
    fn rederive(&mut self) {
        match &self.view {
            View::Browse => self.displayed = self.all_known.clone(),
            View::Filtered(filter) => {
                let displayed = filter.select(&self.all_known, self.identity());
                self.displayed = displayed;
            }
            View::Search(_) | View::Favorites => {}
        }
    }
}

/// Notification text for a failed read.
fn read_failure(err: &ApiError, fallback: &'static str) -> &'static str {
    match err {
        ApiError::Network(_) => messages::NETWORK,
        ApiError::Unauthorized => messages::SIGN_IN_REQUIRED,
        _ => fallback,
    }
}

/// Shared handle to the collection state. Cloning shares the state.
#[derive(Clone)]
pub struct PromptStore {
    api: ApiClient,
    notifier: Notifier,
    state: Arc<Mutex<StoreState>>,
}

impl PromptStore {
    pub fn new(api: ApiClient, notifier: Notifier) -> Self {
        Self {
            api,
            notifier,
            state: Arc::new(Mutex::new(StoreState {
                all_known: Vec::new(),
                displayed: Vec::new(),
                view: View::Browse,
                load_state: LoadState::Uninitialized,
                last_error: None,
                viewer: None,
                view_generation: 0,
                load_generation: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Fetch the full collection and show it newest first.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn load(&self) -> Result<Outcome> {
        let (view_gen, load_gen) = {
            let mut state = self.lock();
            state.load_generation += 1;
            state.load_state = LoadState::Loading;
            (state.next_view(), state.load_generation)
        };
        info!(generation = view_gen, "Loading prompts");

        let result = self.api.list_prompts().await;
        let mut state = self.lock();

        if state.load_generation != load_gen {
            debug!(generation = load_gen, "Dropping superseded load");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(mut prompts) => {
                sort_newest_first(&mut prompts);
                info!(count = prompts.len(), "Loaded prompts");
                state.all_known = prompts;
                state.load_state = LoadState::Ready;
                state.last_error = None;

                if state.view_generation == view_gen {
                    state.show_all();
                    Ok(Outcome::Applied)
                } else {
                    // The snapshot is fresh even though the view moved on.
                    state.rederive();
                    Ok(Outcome::Superseded)
                }
            }
            Err(e) => {
                state.load_state = LoadState::Error;
                state.last_error = Some(e.to_string());
                drop(state);
                self.notifier.error(read_failure(&e, messages::FETCH_FAILED));
                Err(e.into())
            }
        }
    }

    /// Free-text search. A blank query shows everything without a request.
    pub async fn search(&self, query: &str) -> Result<Outcome> {
        let query = query.trim();
        if query.is_empty() {
            let mut state = self.lock();
            state.next_view();
            state.show_all();
            return Ok(Outcome::Applied);
        }

        let generation = {
            let mut state = self.lock();
            state.view = View::Search(query.to_string());
            state.next_view()
        };

        let result = self.api.search(query).await;
        let mut state = self.lock();

        if state.view_generation != generation {
            debug!(generation, query, "Dropping superseded search");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(results) => {
                info!(query, count = results.len(), "Search results");
                state.displayed = results;
                Ok(Outcome::Applied)
            }
            Err(e) => {
                drop(state);
                self.notifier.error(read_failure(&e, messages::SEARCH_FAILED));
                Err(e.into())
            }
        }
    }

    /// Replace the active filter and recompute the displayed projection.
    pub async fn apply_filter(&self, kind: FilterKind, value: Option<&str>) -> Result<Outcome> {
        match kind {
            FilterKind::None | FilterKind::Clear => {
                let mut state = self.lock();
                state.next_view();
                state.show_all();
                Ok(Outcome::Applied)
            }
            FilterKind::Favorites => self.show_favorites().await,
            FilterKind::Tag | FilterKind::Tool | FilterKind::Username | FilterKind::MyPrompts => {
                let value = value.filter(|v| !v.is_empty());
                if kind.needs_value() && value.is_none() {
                    self.notifier
                        .error(PromptBayError::MissingFilterValue(kind).to_string());
                    return Err(PromptBayError::MissingFilterValue(kind));
                }

                let mut state = self.lock();
                if kind == FilterKind::MyPrompts && state.identity().is_none() {
                    drop(state);
                    self.notifier.error(messages::SIGN_IN_REQUIRED);
                    return Err(PromptBayError::NoViewerIdentity);
                }

                let filter = if kind == FilterKind::MyPrompts {
                    FilterDescriptor::new(kind, None)
                } else {
                    FilterDescriptor::new(kind, value)
                };
                state.next_view();
                state.view = View::Filtered(filter);
                state.rederive();
                debug!(filter = %state.view.filter(), count = state.displayed.len(), "Applied filter");
                Ok(Outcome::Applied)
            }
        }
    }

    async fn show_favorites(&self) -> Result<Outcome> {
        let generation = {
            let mut state = self.lock();
            state.view = View::Favorites;
            state.next_view()
        };

        let result = self.api.favorites().await;
        let mut state = self.lock();

        if state.view_generation != generation {
            debug!(generation, "Dropping superseded favorites listing");
            return Ok(Outcome::Superseded);
        }

        match result {
            Ok(page) => {
                state.displayed = page.favorites;
                Ok(Outcome::Applied)
            }
            Err(e) => {
                drop(state);
                self.notifier
                    .error(read_failure(&e, messages::FAVORITES_FETCH_FAILED));
                Err(e.into())
            }
        }
    }

    /// Apply `patch` to prompt `id` in both projections.
    ///
    /// Returns whether the prompt was found in either.
    pub fn patch_entity<F>(&self, id: &str, patch: F) -> bool
    where
        F: Fn(&Prompt) -> Prompt,
    {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut found = false;
        for prompt in state.all_known.iter_mut().chain(state.displayed.iter_mut()) {
            if prompt.id == id {
                *prompt = patch(prompt);
                found = true;
            }
        }
        found
    }

    /// Look a prompt up, preferring the displayed copy.
    pub fn get(&self, id: &str) -> Option<Prompt> {
        let state = self.lock();
        state
            .displayed
            .iter()
            .chain(state.all_known.iter())
            .find(|p| p.id == id)
            .cloned()
    }

    /// Set the viewer used by the my-prompts filter.
    pub fn set_viewer(&self, viewer: Option<Viewer>) {
        let mut state = self.lock();
        state.viewer = viewer;
        if matches!(&state.view, View::Filtered(f) if f.kind == FilterKind::MyPrompts) {
            state.rederive();
        }
    }

    pub fn viewer(&self) -> Option<Viewer> {
        self.lock().viewer.clone()
    }

    pub fn all_known(&self) -> Vec<Prompt> {
        self.lock().all_known.clone()
    }

    pub fn displayed(&self) -> Vec<Prompt> {
        self.lock().displayed.clone()
    }

    pub fn view(&self) -> View {
        self.lock().view.clone()
    }

    pub fn filter(&self) -> FilterDescriptor {
        self.lock().view.filter()
    }

    pub fn load_state(&self) -> LoadState {
        self.lock().load_state
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn view_generation(&self) -> u64 {
        self.lock().view_generation
    }

    #[cfg(test)]
    fn seed(&self, mut prompts: Vec<Prompt>) {
        sort_newest_first(&mut prompts);
        let mut state = self.lock();
        state.all_known = prompts;
        state.load_state = LoadState::Ready;
        state.show_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ToolList;
    use crate::notify::{drain, Level, Notification};
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc::UnboundedReceiver;

    // Nothing listens here; local operations must never reach it.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn prompt(id: &str, day: Option<u32>, tags: &[&str], tools: &[&str]) -> Prompt {
        let mut p = Prompt::new(id, format!("Prompt {}", id));
        p.created_at = day.map(|d| Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap());
        p.tags = tags.iter().map(|t| t.to_string()).collect();
        p.tools = ToolList::new(tools.iter().copied());
        p
    }

    fn seeded_store() -> (PromptStore, UnboundedReceiver<Notification>) {
        let (notifier, rx) = Notifier::channel();
        let store = PromptStore::new(ApiClient::new(UNREACHABLE), notifier);
        store.seed(vec![
            prompt("a", Some(1), &["python"], &["Cursor"]),
            prompt("b", Some(3), &["python", "testing"], &["ChatGPT"]),
            prompt("c", None, &["writing"], &["Cursor", "Claude"]),
        ]);
        (store, rx)
    }

    fn ids(prompts: &[Prompt]) -> Vec<String> {
        prompts.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_new_store_is_uninitialized() {
        let store = PromptStore::new(ApiClient::new(UNREACHABLE), Notifier::silent());
        assert_eq!(store.load_state(), LoadState::Uninitialized);
        assert!(store.displayed().is_empty());
        assert_eq!(store.filter().kind, FilterKind::None);
    }

    #[tokio::test]
    async fn test_local_filters_replace_each_other() {
        let (store, _rx) = seeded_store();

        store.apply_filter(FilterKind::Tag, Some("python")).await.unwrap();
        assert_eq!(ids(&store.displayed()), vec!["b", "a"]);

        store.apply_filter(FilterKind::Tool, Some("Cursor")).await.unwrap();
        assert_eq!(ids(&store.displayed()), vec!["a", "c"]);
        assert_eq!(
            store.filter(),
            FilterDescriptor::new(FilterKind::Tool, Some("Cursor"))
        );
    }

    #[tokio::test]
    async fn test_clear_restores_all_known() {
        let (store, _rx) = seeded_store();
        store.apply_filter(FilterKind::Tag, Some("writing")).await.unwrap();
        assert_eq!(store.displayed().len(), 1);

        store.apply_filter(FilterKind::Clear, None).await.unwrap();
        assert_eq!(store.displayed(), store.all_known());
        assert_eq!(store.view(), View::Browse);
    }

    #[tokio::test]
    async fn test_blank_search_is_local() {
        let (store, mut rx) = seeded_store();
        store.apply_filter(FilterKind::Tool, Some("Claude")).await.unwrap();

        assert_eq!(store.search("   ").await.unwrap(), Outcome::Applied);
        assert_eq!(ids(&store.displayed()), vec!["b", "a", "c"]);
        assert_eq!(store.filter().kind, FilterKind::None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_my_prompts_without_viewer_is_error() {
        let (store, mut rx) = seeded_store();
        store.apply_filter(FilterKind::Tag, Some("python")).await.unwrap();

        let err = store
            .apply_filter(FilterKind::MyPrompts, None)
            .await
            .unwrap_err();
        assert!(matches!(err, PromptBayError::NoViewerIdentity));
        // The previous view is left alone.
        assert_eq!(ids(&store.displayed()), vec!["b", "a"]);

        let notes = drain(&mut rx);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, Level::Error);
    }

    #[tokio::test]
    async fn test_my_prompts_with_viewer() {
        let (store, _rx) = seeded_store();
        store.patch_entity("c", |p| Prompt {
            owner_id: Some("ana@example.com".to_string()),
            ..p.clone()
        });
        store.set_viewer(Some(Viewer::new("ana@example.com")));

        store.apply_filter(FilterKind::MyPrompts, None).await.unwrap();
        assert_eq!(ids(&store.displayed()), vec!["c"]);

        store.set_viewer(Some(Viewer::new("bo@example.com")));
        assert!(store.displayed().is_empty());
    }

    #[tokio::test]
    async fn test_missing_value_rejected() {
        let (store, _rx) = seeded_store();
        let err = store.apply_filter(FilterKind::Tag, None).await.unwrap_err();
        assert!(matches!(err, PromptBayError::MissingFilterValue(FilterKind::Tag)));
        assert_eq!(store.view(), View::Browse);
    }

    #[test]
    fn test_patch_entity_updates_both_projections() {
        let (store, _rx) = seeded_store();
        let found = store.patch_entity("a", |p| Prompt {
            upvotes: 9,
            is_upvoted: true,
            ..p.clone()
        });
        assert!(found);
        assert_eq!(store.get("a").unwrap().upvotes, 9);
        assert!(store.all_known().iter().any(|p| p.id == "a" && p.is_upvoted));
        assert!(store.displayed().iter().any(|p| p.id == "a" && p.is_upvoted));

        assert!(!store.patch_entity("missing", |p| p.clone()));
    }

    #[test]
    fn test_view_filter_descriptor() {
        assert_eq!(View::Favorites.filter().kind, FilterKind::Favorites);
        assert_eq!(View::Search("x".into()).filter().kind, FilterKind::None);
    }
}
