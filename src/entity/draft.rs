// src/entity/draft.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::prompt::{normalize_tags, Prompt, ToolList};

/// Rejections raised before anything is sent to the remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Please select at least one tool")]
    NoToolSelected,
}

/// User-entered content for a new or edited prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDraft {
    pub title: String,
    pub description: String,
    pub prompt_text: String,
    #[serde(rename = "tool_used")]
    pub tools: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl PromptDraft {
    /// Start an edit from an existing record's content fields.
    pub fn from_prompt(prompt: &Prompt) -> Self {
        Self {
            title: prompt.title.clone(),
            description: prompt.description.clone(),
            prompt_text: prompt.prompt_text.clone(),
            tools: prompt.tools.as_slice().to_vec(),
            tags: prompt.tags.clone(),
            username: prompt.username.clone(),
        }
    }

    /// Split a comma-separated tag field.
    pub fn parse_tags(input: &str) -> Vec<String> {
        normalize_tags(input.split(','))
    }

    /// Check required fields and return the normalized draft to submit.
    pub fn validate(&self) -> Result<PromptDraft, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("Title"));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(ValidationError::MissingField("Description"));
        }
        if self.prompt_text.trim().is_empty() {
            return Err(ValidationError::MissingField("Prompt text"));
        }

        let tools = ToolList::new(self.tools.iter().cloned());
        if tools.is_empty() {
            return Err(ValidationError::NoToolSelected);
        }

        Ok(PromptDraft {
            title: title.to_string(),
            description: description.to_string(),
            prompt_text: self.prompt_text.clone(),
            tools: tools.into_vec(),
            tags: normalize_tags(self.tags.iter().cloned()),
            username: self
                .username
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from),
        })
    }
}
