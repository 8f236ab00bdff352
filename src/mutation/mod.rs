//! Optimistic upvote and favorite toggles.
//!
//! The store is the only holder of engagement flags. A toggle reads the
//! current flag from it, picks the verb from that flag, and on success writes
//! the next state back through [`PromptStore::patch_entity`]. Nothing is
//! changed locally before the server answers, so a failure needs no rollback.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use crate::api::{reasons, ApiError};
use crate::entity::Prompt;
use crate::error::{PromptBayError, Result};
use crate::notify::messages;
use crate::store::PromptStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleKind {
    Upvote,
    Favorite,
}

/// The upvote fields of one prompt, as the viewer sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpvoteState {
    pub upvotes: u32,
    pub is_upvoted: bool,
}

impl UpvoteState {
    pub fn of(prompt: &Prompt) -> Self {
        Self {
            upvotes: prompt.upvotes,
            is_upvoted: prompt.is_upvoted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome<S> {
    /// The server accepted the toggle; this is the new local state.
    Applied(S),
    /// A toggle of the same kind on the same prompt is still outstanding.
    /// No request was sent.
    InFlight,
}

/// State after an accepted upvote toggle. The count is always the server's.
pub fn next_upvote_state(current: UpvoteState, server_upvotes: u32) -> UpvoteState {
    UpvoteState {
        upvotes: server_upvotes,
        is_upvoted: !current.is_upvoted,
    }
}

/// Notification text for a rejected upvote toggle.
pub fn upvote_failure_message(err: &ApiError) -> String {
    if err.is_reason(400, reasons::ALREADY_UPVOTED) {
        return messages::ALREADY_UPVOTED.to_string();
    }
    if err.is_reason(400, reasons::NOT_UPVOTED) {
        return messages::NOT_UPVOTED.to_string();
    }
    match err {
        ApiError::Status { status: 404, .. } => messages::PROMPT_NOT_FOUND.to_string(),
        ApiError::Network(_) => messages::UPVOTE_RETRY.to_string(),
        ApiError::Unauthorized => messages::SIGN_IN_REQUIRED.to_string(),
        _ => err
            .reason()
            .map(String::from)
            .unwrap_or_else(|| messages::UPVOTE_FAILED.to_string()),
    }
}

/// Notification text for a rejected favorite toggle.
pub fn favorite_failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Network(_) => messages::FAVORITE_ERROR.to_string(),
        ApiError::Unauthorized => messages::SIGN_IN_REQUIRED.to_string(),
        _ => err
            .reason()
            .map(String::from)
            .unwrap_or_else(|| messages::FAVORITE_FAILED.to_string()),
    }
}

type InFlightKey = (ToggleKind, String);

/// Set of toggles with a request outstanding.
#[derive(Clone, Default)]
struct InFlight {
    keys: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl InFlight {
    fn try_acquire(&self, kind: ToggleKind, id: &str) -> Option<InFlightGuard> {
        let key = (kind, id.to_string());
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    fn contains(&self, kind: ToggleKind, id: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(kind, id.to_string()))
    }
}

/// Releases its key when the toggle finishes, however it finishes.
struct InFlightGuard {
    keys: Arc<Mutex<HashSet<InFlightKey>>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Toggle controllers bound to one store. Cloning shares the in-flight set.
#[derive(Clone)]
pub struct Mutations {
    store: PromptStore,
    in_flight: InFlight,
}

impl Mutations {
    pub fn new(store: PromptStore) -> Self {
        Self {
            store,
            in_flight: InFlight::default(),
        }
    }

    pub fn is_pending(&self, kind: ToggleKind, id: &str) -> bool {
        self.in_flight.contains(kind, id)
    }

    fn current(&self, id: &str) -> Result<Prompt> {
        self.store.get(id).ok_or_else(|| {
            self.store.notifier().error(messages::PROMPT_NOT_FOUND);
            PromptBayError::PromptNotFound(id.to_string())
        })
    }

    /// Upvote, or withdraw the viewer's upvote if it is already set.
    pub async fn toggle_upvote(&self, id: &str) -> Result<ToggleOutcome<UpvoteState>> {
        let Some(_guard) = self.in_flight.try_acquire(ToggleKind::Upvote, id) else {
            debug!(id, "Upvote already in flight");
            return Ok(ToggleOutcome::InFlight);
        };

        let current = UpvoteState::of(&self.current(id)?);
        let api = self.store.api();
        let result = if current.is_upvoted {
            api.remove_upvote(id).await
        } else {
            api.upvote(id).await
        };

        match result {
            Ok(upvotes) => {
                let next = next_upvote_state(current, upvotes);
                self.store.patch_entity(id, |p| Prompt {
                    upvotes: next.upvotes,
                    is_upvoted: next.is_upvoted,
                    ..p.clone()
                });
                info!(id, upvotes = next.upvotes, is_upvoted = next.is_upvoted, "Upvote toggled");
                self.store.notifier().success(if next.is_upvoted {
                    messages::UPVOTED
                } else {
                    messages::UPVOTE_REMOVED
                });
                Ok(ToggleOutcome::Applied(next))
            }
            Err(e) => {
                self.store.notifier().error(upvote_failure_message(&e));
                Err(e.into())
            }
        }
    }

    /// Add to or remove from the viewer's favorites.
    pub async fn toggle_favorite(&self, id: &str) -> Result<ToggleOutcome<bool>> {
        let Some(_guard) = self.in_flight.try_acquire(ToggleKind::Favorite, id) else {
            debug!(id, "Favorite already in flight");
            return Ok(ToggleOutcome::InFlight);
        };

        let was_favorited = self.current(id)?.is_favorited;
        let result = self.store.api().set_favorite(id, !was_favorited).await;

        match result {
            Ok(()) => {
                let is_favorited = !was_favorited;
                self.store.patch_entity(id, |p| Prompt {
                    is_favorited,
                    ..p.clone()
                });
                info!(id, is_favorited, "Favorite toggled");
                self.store.notifier().success(if is_favorited {
                    messages::FAVORITED
                } else {
                    messages::UNFAVORITED
                });
                Ok(ToggleOutcome::Applied(is_favorited))
            }
            Err(e) => {
                self.store.notifier().error(favorite_failure_message(&e));
                Err(e.into())
            }
        }
    }
}
