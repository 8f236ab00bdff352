//! Application shell: wires the store, toggles and favorites count to one
//! API client and carries the write flows that sit outside the store.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, CreatedPrompt, ToolUpdate};
use crate::cache::LocalState;
use crate::config::Config;
use crate::entity::{Prompt, PromptDraft, ToolList, ValidationError, Viewer};
use crate::error::{PromptBayError, Result};
use crate::favorites::FavoritesCounter;
use crate::mutation::{Mutations, ToggleOutcome, UpvoteState};
use crate::notify::{messages, Notifier};
use crate::store::PromptStore;
use crate::tools::{ToolDirectory, ToolStatistics};

/// Queries offered before the first search.
pub const SEARCH_SUGGESTIONS: [&str; 6] = [
    "refactor python code",
    "write unit tests",
    "professional email writing",
    "debug javascript errors",
    "generate API documentation",
    "creative writing prompts",
];

/// Notification text for a rejected write.
fn write_failure(err: &ApiError, fallback: &str) -> String {
    match err {
        ApiError::Network(_) => messages::NETWORK.to_string(),
        ApiError::Unauthorized => messages::SIGN_IN_REQUIRED.to_string(),
        _ => err.reason().unwrap_or(fallback).to_string(),
    }
}

pub struct App {
    config: Config,
    api: ApiClient,
    notifier: Notifier,
    store: PromptStore,
    mutations: Mutations,
    favorites: FavoritesCounter,
    tools: ToolDirectory,
    local: Mutex<LocalState>,
}

impl App {
    /// Build the shell with local state under the configured state directory.
    pub fn new(config: Config, notifier: Notifier) -> Result<Self> {
        let local = LocalState::open(&config.state_dir())?;
        Self::with_local_state(config, notifier, local)
    }

    pub fn with_local_state(config: Config, notifier: Notifier, local: LocalState) -> Result<Self> {
        let api = ApiClient::from_config(&config);
        let store = PromptStore::new(api.clone(), notifier.clone());
        Ok(Self {
            mutations: Mutations::new(store.clone()),
            favorites: FavoritesCounter::new(api.clone()),
            tools: ToolDirectory::builtin()?,
            local: Mutex::new(local),
            config,
            api,
            notifier,
            store,
        })
    }

    fn local(&self) -> MutexGuard<'_, LocalState> {
        self.local.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn store(&self) -> &PromptStore {
        &self.store
    }

    pub fn mutations(&self) -> &Mutations {
        &self.mutations
    }

    pub fn favorites(&self) -> &FavoritesCounter {
        &self.favorites
    }

    pub fn tools(&self) -> &ToolDirectory {
        &self.tools
    }

    /// True the first time it is called for a state directory.
    pub fn first_run(&self) -> Result<bool> {
        let local = self.local();
        if local.has_visited()? {
            return Ok(false);
        }
        local.mark_visited()?;
        Ok(true)
    }

    /// Ask the remote store who the session belongs to.
    ///
    /// Without a session cookie there is no viewer and nothing is requested.
    pub async fn sign_in(&self) -> Result<Option<Viewer>> {
        let viewer = if self.api.has_session() {
            match self.api.me().await {
                Ok(viewer) => viewer,
                Err(e) => {
                    self.notifier.error(write_failure(&e, messages::SIGN_IN_REQUIRED));
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        match &viewer {
            Some(v) => info!(email = %v.email, "Signed in"),
            None => info!("No viewer"),
        }
        self.store.set_viewer(viewer.clone());
        self.favorites.set_viewer(viewer.as_ref()).await;
        Ok(viewer)
    }

    fn validated(&self, draft: &PromptDraft) -> Result<PromptDraft> {
        draft.validate().map_err(|e| {
            self.notifier.error(e.to_string());
            PromptBayError::from(e)
        })
    }

    /// Validate and submit a new prompt, then reload the collection.
    pub async fn submit(&self, draft: &PromptDraft) -> Result<CreatedPrompt> {
        let draft = self.validated(draft)?;

        let created = match self.api.create_prompt(&draft).await {
            Ok(created) => created,
            Err(e) => {
                self.notifier.error(write_failure(&e, messages::SAVE_FAILED));
                return Err(e.into());
            }
        };

        if let Err(e) = self.local().record_created(&created.id) {
            warn!(id = %created.id, error = %e, "Could not remember created prompt");
        }
        self.notifier.success(messages::PROMPT_SAVED);
        // Reload failures have already been reported.
        let _ = self.store.load().await;
        Ok(created)
    }

    /// Whether the viewer appears to own `prompt`.
    ///
    /// Only a hint for offering the edit flow; the remote store decides.
    pub fn can_edit(&self, prompt: &Prompt) -> bool {
        let owns = self
            .store
            .viewer()
            .as_ref()
            .and_then(Viewer::identity)
            .is_some_and(|id| prompt.is_owned_by(id));
        owns || self.local().is_created_here(&prompt.id).unwrap_or(false)
    }

    fn known_prompt(&self, id: &str) -> Result<Prompt> {
        self.store.get(id).ok_or_else(|| {
            self.notifier.error(messages::PROMPT_NOT_FOUND);
            PromptBayError::PromptNotFound(id.to_string())
        })
    }

    /// Replace the content of a prompt the viewer owns.
    pub async fn edit(&self, id: &str, draft: &PromptDraft) -> Result<Prompt> {
        let prompt = self.known_prompt(id)?;
        if !self.can_edit(&prompt) {
            let err = PromptBayError::NotOwner(id.to_string());
            self.notifier.error(err.to_string());
            return Err(err);
        }
        let draft = self.validated(draft)?;

        match self.api.update_prompt(id, &draft).await {
            Ok(updated) => {
                self.notifier.success(messages::PROMPT_UPDATED);
                let _ = self.store.load().await;
                Ok(updated)
            }
            Err(e) => {
                self.notifier.error(write_failure(&e, messages::SAVE_FAILED));
                Err(e.into())
            }
        }
    }

    /// Replace a prompt's tool list.
    pub async fn update_tools(&self, id: &str, tools: &[String]) -> Result<ToolUpdate> {
        let tools = ToolList::new(tools.iter().cloned());
        if tools.is_empty() {
            self.notifier.error(ValidationError::NoToolSelected.to_string());
            return Err(ValidationError::NoToolSelected.into());
        }

        match self.api.update_tools(id, tools.as_slice()).await {
            Ok(update) => {
                self.notifier.success(messages::TOOLS_UPDATED);
                let _ = self.store.load().await;
                Ok(update)
            }
            Err(e) => {
                self.notifier.error(write_failure(&e, messages::SAVE_FAILED));
                Err(e.into())
            }
        }
    }

    pub async fn toggle_upvote(&self, id: &str) -> Result<ToggleOutcome<UpvoteState>> {
        self.mutations.toggle_upvote(id).await
    }

    /// Toggle a favorite and refresh the favorites count when it lands.
    pub async fn toggle_favorite(&self, id: &str) -> Result<ToggleOutcome<bool>> {
        let outcome = self.mutations.toggle_favorite(id).await?;
        if matches!(outcome, ToggleOutcome::Applied(_)) {
            self.favorites.refetch().await;
        }
        Ok(outcome)
    }

    /// Usage statistics for a tool over the loaded collection.
    pub fn tool_statistics(&self, tool: &str) -> Option<ToolStatistics> {
        self.tools
            .statistics(tool, &self.store.all_known(), Utc::now())
    }
}
