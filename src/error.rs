use thiserror::Error;

use crate::api::ApiError;
use crate::entity::ValidationError;
use crate::filter::FilterKind;

#[derive(Error, Debug)]
pub enum PromptBayError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Sign in to see your prompts")]
    NoViewerIdentity,

    #[error("Filter '{0}' requires a value")]
    MissingFilterValue(FilterKind),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Only the owner can edit prompt {0}")]
    NotOwner(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Local state error: {0}")]
    LocalState(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, PromptBayError>;
