//! User-facing notifications.
//!
//! Operations report their outcome here rather than to the caller alone; the
//! shell decides how to present them. Each notification is mirrored to
//! `tracing` as well.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

/// Notification texts.
pub mod messages {
    pub const UPVOTED: &str = "Upvoted!";
    pub const UPVOTE_REMOVED: &str = "Upvote removed!";
    pub const ALREADY_UPVOTED: &str = "You have already upvoted this prompt";
    pub const NOT_UPVOTED: &str = "You have not upvoted this prompt";
    pub const PROMPT_NOT_FOUND: &str = "Prompt not found";
    pub const UPVOTE_FAILED: &str = "Failed to update upvote";
    pub const UPVOTE_RETRY: &str = "Failed to update upvote. Please try again.";

    pub const FAVORITED: &str = "Added to favorites!";
    pub const UNFAVORITED: &str = "Removed from favorites!";
    pub const FAVORITE_FAILED: &str = "Failed to update favorites";
    pub const FAVORITE_ERROR: &str = "Error updating favorites";

    pub const PROMPT_SAVED: &str = "Prompt saved successfully!";
    pub const PROMPT_UPDATED: &str = "Prompt updated successfully!";
    pub const SAVE_FAILED: &str = "Failed to save prompt.";
    pub const TOOLS_UPDATED: &str = "Tools updated!";

    pub const FETCH_FAILED: &str = "Failed to fetch prompts.";
    pub const SEARCH_FAILED: &str = "Failed to search prompts.";
    pub const FAVORITES_FETCH_FAILED: &str = "Failed to fetch favorites.";
    pub const NETWORK: &str = "Could not reach the server. Check your connection.";
    pub const SIGN_IN_REQUIRED: &str = "Please sign in first";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_notification(self))
    }
}

/// Sending half of the notification channel. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<UnboundedSender<Notification>>,
}

impl Notifier {
    pub fn channel() -> (Self, UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that only logs.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn notify(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        debug!(?level, %message, "notification");

        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is showing notifications.
            let _ = tx.send(Notification { level, message });
        }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(Level::Success, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(Level::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(Level::Error, message);
    }
}

/// Everything queued on `rx` so far.
pub fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut pending = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        pending.push(notification);
    }
    pending
}

/// Format a notification for a terminal.
pub fn format_notification(notification: &Notification) -> String {
    match notification.level {
        Level::Success => format!("✓ {}", notification.message),
        Level::Info => notification.message.clone(),
        Level::Error => format!("✗ {}", notification.message),
    }
}
