use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PromptBayError, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SESSION_COOKIE: &str = "session_token";
pub const DEFAULT_DEDUP_TTL_MS: u64 = 2000;

const APP_DIR: &str = "promptbay";
const CONFIG_FILE: &str = "config.yaml";

/// Client configuration.
///
/// Layered as defaults, then the YAML file, then `PROMPTBAY_*` environment
/// variables. Command-line flags are applied last by the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote prompt store.
    pub api_url: String,
    /// Session cookie value; absent means signed out.
    pub session_token: Option<String>,
    /// Name of the session cookie.
    pub session_cookie: String,
    /// How long identical reads are coalesced.
    pub dedup_ttl_ms: u64,
    /// Where local state lives. Defaults to the platform data directory.
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_token: None,
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
            dedup_ttl_ms: DEFAULT_DEDUP_TTL_MS,
            state_dir: None,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist; the default location may be missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_yaml_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config.normalized())
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Reading config");
        let contents = fs::read_to_string(path).map_err(|e| {
            PromptBayError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// `<config_dir>/promptbay/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Overlay `PROMPTBAY_*` variables read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("PROMPTBAY_API_URL") {
            self.api_url = url;
        }
        if let Some(token) = lookup("PROMPTBAY_SESSION") {
            self.session_token = Some(token);
        }
        if let Some(name) = lookup("PROMPTBAY_SESSION_COOKIE") {
            self.session_cookie = name;
        }
        if let Some(ttl) = lookup("PROMPTBAY_DEDUP_TTL_MS") {
            self.dedup_ttl_ms = ttl.trim().parse().map_err(|_| {
                PromptBayError::Config(format!("PROMPTBAY_DEDUP_TTL_MS is not a number: {}", ttl))
            })?;
        }
        if let Some(dir) = lookup("PROMPTBAY_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Strip the trailing slash from the URL and drop a blank session.
    pub fn normalized(mut self) -> Self {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        self.session_token = self
            .session_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::from_millis(self.dedup_ttl_ms)
    }

    pub fn state_dir(&self) -> PathBuf {
        match &self.state_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".promptbay")),
        }
    }
}
