// src/entity/viewer.rs
use serde::{Deserialize, Serialize};

/// The currently authenticated user, as reported by `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Viewer {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: None,
        }
    }

    /// Identity the remote store stamps as owner on this viewer's prompts.
    pub fn identity(&self) -> Option<&str> {
        let email = self.email.trim();
        if email.is_empty() {
            None
        } else {
            Some(email)
        }
    }
}
