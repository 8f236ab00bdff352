//! Favorites count for the current viewer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::entity::Viewer;

/// Observable state of the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FavoritesCount {
    pub count: u32,
    pub loading: bool,
}

#[derive(Default)]
struct CounterState {
    identity: Option<String>,
    identity_generation: u64,
    pending: usize,
}

/// Keeps the viewer's favorites count current.
///
/// Refetches when the viewer identity changes and on demand. Overlapping
/// fetches are coalesced by the API client's request cache, not here.
#[derive(Clone)]
pub struct FavoritesCounter {
    api: ApiClient,
    tx: Arc<watch::Sender<FavoritesCount>>,
    state: Arc<Mutex<CounterState>>,
}

impl FavoritesCounter {
    pub fn new(api: ApiClient) -> Self {
        let (tx, _rx) = watch::channel(FavoritesCount::default());
        Self {
            api,
            tx: Arc::new(tx),
            state: Arc::new(Mutex::new(CounterState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesCount> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> FavoritesCount {
        *self.tx.borrow()
    }

    /// React to a viewer change. Does nothing if the identity is unchanged.
    pub async fn set_viewer(&self, viewer: Option<&Viewer>) -> u32 {
        let identity = viewer.and_then(Viewer::identity).map(String::from);
        {
            let mut state = self.lock();
            if state.identity == identity && state.identity_generation > 0 {
                return self.current().count;
            }
            state.identity = identity;
            state.identity_generation += 1;
        }
        self.refetch().await
    }

    /// Fetch the count for the current identity and return it.
    ///
    /// Without a viewer the count is reset to 0 and nothing is requested.
    /// Any failure also resets it to 0.
    pub async fn refetch(&self) -> u32 {
        let generation = {
            let mut state = self.lock();
            if state.identity.is_none() {
                drop(state);
                self.tx.send_modify(|c| c.count = 0);
                return 0;
            }
            state.pending += 1;
            state.identity_generation
        };
        self.tx.send_modify(|c| c.loading = true);

        let count = match self.api.favorites().await {
            Ok(page) => page.count(),
            Err(e) => {
                warn!(error = %e, "Failed to fetch favorites count");
                0
            }
        };

        let (current, still_loading) = {
            let mut state = self.lock();
            state.pending -= 1;
            (state.identity_generation == generation, state.pending > 0)
        };

        self.tx.send_modify(|c| {
            if current {
                c.count = count;
            } else {
                debug!(generation, "Dropping favorites count for previous viewer");
            }
            c.loading = still_loading;
        });
        self.current().count
    }
}
