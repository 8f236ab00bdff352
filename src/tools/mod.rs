//! Static directory of known AI tools.
//!
//! Used to enrich prompt listings with tool metadata. Everything here is
//! computed from the built-in table and the local prompt snapshot; nothing
//! touches the network.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Prompt;
use crate::error::Result;

const BUILTIN_TOOLS: &str = include_str!("tools.json");
const FALLBACK_CATEGORY: &str = "coding";
const TOP_CONTRIBUTORS: usize = 5;
const RECENT_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub display_name: String,
    pub description: String,
    #[serde(default)]
    pub detailed_description: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub access_url: String,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getting_started_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub popular_prompts: Vec<String>,
    /// Set on entries made up for names the directory does not know.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_fallback: bool,
}

impl Tool {
    fn mentions(&self, needle: &str) -> bool {
        self.description.to_lowercase().contains(needle)
            || self.detailed_description.to_lowercase().contains(needle)
            || self
                .use_cases
                .iter()
                .any(|u| u.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Deserialize)]
struct ToolData {
    categories: BTreeMap<String, Category>,
    tools: Vec<Tool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contributor {
    pub name: String,
    pub count: usize,
}

/// Usage of one tool across a prompt snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatistics {
    pub tool_id: String,
    pub display_name: String,
    pub prompt_count: usize,
    pub total_upvotes: u64,
    pub unique_contributors: usize,
    pub weekly_prompts: usize,
    pub weekly_upvotes: u64,
    pub top_contributors: Vec<Contributor>,
}

/// Placeholder entry for a tool name the directory does not know.
pub fn fallback_tool(name: &str) -> Tool {
    let name = name.trim();
    Tool {
        id: name
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-"),
        display_name: name.to_string(),
        description: format!("AI tool: {}", name),
        detailed_description: format!(
            "{} is an AI tool. More information may be available on their official website.",
            name
        ),
        category: FALLBACK_CATEGORY.to_string(),
        icon: None,
        access_url: "#".to_string(),
        use_cases: vec!["General AI assistance".to_string()],
        getting_started_url: None,
        popular_prompts: Vec::new(),
        is_fallback: true,
    }
}

pub struct ToolDirectory {
    tools: Vec<Tool>,
    categories: BTreeMap<String, Category>,
    by_id: HashMap<String, usize>,
}

impl ToolDirectory {
    /// The directory shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TOOLS)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let data: ToolData = serde_json::from_str(json)?;
        let by_id = data
            .tools
            .iter()
            .enumerate()
            .map(|(i, tool)| (tool.id.clone(), i))
            .collect();
        Ok(Self {
            tools: data.tools,
            categories: data.categories,
            by_id,
        })
    }

    pub fn all(&self) -> &[Tool] {
        &self.tools
    }

    pub fn categories(&self) -> &BTreeMap<String, Category> {
        &self.categories
    }

    pub fn by_id(&self, id: &str) -> Option<&Tool> {
        self.by_id.get(id).map(|&i| &self.tools[i])
    }

    /// Case-insensitive display name lookup.
    pub fn by_display_name(&self, name: &str) -> Option<&Tool> {
        let name = name.trim().to_lowercase();
        self.tools
            .iter()
            .find(|t| t.display_name.to_lowercase() == name)
    }

    pub fn by_category(&self, category: &str) -> Vec<&Tool> {
        self.tools.iter().filter(|t| t.category == category).collect()
    }

    /// Every category with its tools, including empty categories.
    pub fn grouped_by_category(&self) -> BTreeMap<&str, Vec<&Tool>> {
        let mut grouped: BTreeMap<&str, Vec<&Tool>> = self
            .categories
            .keys()
            .map(|name| (name.as_str(), Vec::new()))
            .collect();
        for tool in &self.tools {
            if let Some(group) = grouped.get_mut(tool.category.as_str()) {
                group.push(tool);
            }
        }
        grouped
    }

    /// Substring search over names, descriptions and use cases.
    ///
    /// A blank query returns every tool.
    pub fn search(&self, query: &str) -> Vec<&Tool> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.tools.iter().collect();
        }
        self.tools
            .iter()
            .filter(|t| t.display_name.to_lowercase().contains(&query) || t.mentions(&query))
            .collect()
    }

    /// Up to `limit` tools for a category name, or else for a use case.
    pub fn suggested(&self, context: &str, limit: usize) -> Vec<&Tool> {
        let context = context.trim().to_lowercase();
        let in_category = self.by_category(&context);
        if !in_category.is_empty() {
            return in_category.into_iter().take(limit).collect();
        }
        self.tools
            .iter()
            .filter(|t| t.mentions(&context))
            .take(limit)
            .collect()
    }

    /// Map a free-form tool name to a directory id.
    ///
    /// Exact display names win; then common spellings; then either name
    /// containing the other.
    pub fn normalize_name(&self, name: &str) -> Option<&str> {
        let lower = name.trim().to_lowercase();
        if lower.is_empty() {
            return None;
        }
        if let Some(tool) = self.by_display_name(&lower) {
            return Some(&tool.id);
        }

        let alias = if lower.contains("chatgpt") || lower.contains("chat gpt") {
            Some("chatgpt")
        } else if lower.contains("github copilot") {
            Some("copilot")
        } else if lower.contains("dall-e") || lower.contains("dalle") {
            Some("dall-e")
        } else {
            None
        };
        if let Some(tool) = alias.and_then(|id| self.by_id(id)) {
            return Some(&tool.id);
        }

        self.tools
            .iter()
            .find(|t| {
                let display = t.display_name.to_lowercase();
                display.contains(&lower) || lower.contains(&display)
            })
            .map(|t| t.id.as_str())
    }

    /// Directory entry for a tool name as stored on a prompt.
    pub fn resolve(&self, name: &str) -> Tool {
        self.by_id(name)
            .or_else(|| self.normalize_name(name).and_then(|id| self.by_id(id)))
            .cloned()
            .unwrap_or_else(|| fallback_tool(name))
    }

    /// Directory entries for every tool on `prompt`.
    pub fn tools_for(&self, prompt: &Prompt) -> Vec<Tool> {
        prompt.tools.iter().map(|name| self.resolve(name)).collect()
    }

    /// Usage statistics for a tool id or display name over `prompts`.
    ///
    /// Prompts match when one of their tool names equals the tool's display
    /// name, ignoring case. Returns `None` for unknown tools.
    pub fn statistics(
        &self,
        tool: &str,
        prompts: &[Prompt],
        now: DateTime<Utc>,
    ) -> Option<ToolStatistics> {
        let tool = self.by_id(tool).or_else(|| self.by_display_name(tool))?;
        let display = tool.display_name.to_lowercase();
        let week_ago = now - Duration::days(RECENT_DAYS);

        let matching: Vec<&Prompt> = prompts
            .iter()
            .filter(|p| p.tools.iter().any(|t| t.to_lowercase() == display))
            .collect();

        let mut contributors: Vec<Contributor> = Vec::new();
        let mut weekly_prompts = 0;
        let mut weekly_upvotes = 0u64;

        for prompt in &matching {
            if prompt.created_at.is_some_and(|ts| ts >= week_ago) {
                weekly_prompts += 1;
                weekly_upvotes += u64::from(prompt.upvotes);
            }

            let name = prompt.username.as_deref().or(prompt.owner_id.as_deref());
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                match contributors.iter_mut().find(|c| c.name == name) {
                    Some(c) => c.count += 1,
                    None => contributors.push(Contributor {
                        name: name.to_string(),
                        count: 1,
                    }),
                }
            }
        }

        let unique_contributors = contributors.len();
        // Stable, so ties keep first-seen order.
        contributors.sort_by(|a, b| b.count.cmp(&a.count));
        contributors.truncate(TOP_CONTRIBUTORS);

        Some(ToolStatistics {
            tool_id: tool.id.clone(),
            display_name: tool.display_name.clone(),
            prompt_count: matching.len(),
            total_upvotes: matching.iter().map(|p| u64::from(p.upvotes)).sum(),
            unique_contributors,
            weekly_prompts,
            weekly_upvotes,
            top_contributors: contributors,
        })
    }
}
