//! View narrowing: filter descriptors and the local matching rules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entity::Prompt;
use crate::error::{PromptBayError, Result};

/// The kinds of narrowing the browse view supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    None,
    Tag,
    Tool,
    Username,
    MyPrompts,
    Favorites,
    Clear,
}

impl FilterKind {
    /// Whether the kind narrows by a caller-supplied value.
    pub fn needs_value(self) -> bool {
        matches!(self, FilterKind::Tag | FilterKind::Tool | FilterKind::Username)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::None => write!(f, "none"),
            FilterKind::Tag => write!(f, "tag"),
            FilterKind::Tool => write!(f, "tool"),
            FilterKind::Username => write!(f, "username"),
            FilterKind::MyPrompts => write!(f, "my-prompts"),
            FilterKind::Favorites => write!(f, "favorites"),
            FilterKind::Clear => write!(f, "clear"),
        }
    }
}

impl FromStr for FilterKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" => Ok(FilterKind::None),
            "tag" | "by-tag" => Ok(FilterKind::Tag),
            "tool" | "by-tool" => Ok(FilterKind::Tool),
            "username" | "user" | "by-username" => Ok(FilterKind::Username),
            "my-prompts" | "mine" => Ok(FilterKind::MyPrompts),
            "favorites" | "favourites" => Ok(FilterKind::Favorites),
            "clear" => Ok(FilterKind::Clear),
            _ => Err(format!("Invalid filter kind: {}", s)),
        }
    }
}

/// The single active narrowing criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub kind: FilterKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl FilterDescriptor {
    pub fn new(kind: FilterKind, value: Option<&str>) -> Self {
        Self {
            kind,
            value: value.map(String::from),
        }
    }

    /// Local membership test. `viewer` is the identity used for `my-prompts`.
    ///
    /// Favorites and the resetting kinds are not membership tests; they always
    /// match so the caller decides what to show.
    pub fn matches(&self, prompt: &Prompt, viewer: Option<&str>) -> bool {
        let value = self.value.as_deref().unwrap_or_default();
        match self.kind {
            FilterKind::Tag => prompt.has_tag(value),
            FilterKind::Tool => prompt.tools.contains(value),
            FilterKind::Username => prompt.username.as_deref() == Some(value),
            FilterKind::MyPrompts => viewer.is_some_and(|id| prompt.is_owned_by(id)),
            FilterKind::None | FilterKind::Favorites | FilterKind::Clear => true,
        }
    }

    /// Apply the filter to a snapshot, preserving its order.
    pub fn select(&self, prompts: &[Prompt], viewer: Option<&str>) -> Vec<Prompt> {
        prompts
            .iter()
            .filter(|p| self.matches(p, viewer))
            .cloned()
            .collect()
    }
}

impl fmt::Display for FilterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:{}", self.kind, value),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Parse a filter from its shell form.
///
/// Accepts `kind value`, `kind:value`, or a bare kind:
///
/// ```ignore
/// let filter = parse_filter("tag:python", None)?;
/// assert_eq!(filter.kind, FilterKind::Tag);
/// assert_eq!(filter.value.as_deref(), Some("python"));
/// ```
pub fn parse_filter(raw: &str, value: Option<&str>) -> Result<FilterDescriptor> {
    let raw = raw.trim();
    let (kind_str, inline_value) = match raw.split_once(':') {
        Some((kind, rest)) => (kind, Some(rest.trim())),
        None => (raw, None),
    };

    let kind: FilterKind = kind_str.parse().map_err(PromptBayError::InvalidFilter)?;
    let value = inline_value
        .or(value.map(str::trim))
        .filter(|v| !v.is_empty());

    if kind.needs_value() && value.is_none() {
        return Err(PromptBayError::MissingFilterValue(kind));
    }

    Ok(FilterDescriptor::new(kind, value))
}
