//! Plain-text rendering of prompts for the terminal.

use serde::Serialize;

use crate::entity::Prompt;
use crate::error::Result;
use crate::tools::ToolDirectory;

#[derive(Serialize)]
struct PromptFrontmatter<'a> {
    id: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    upvotes: u32,
    tools: &'a [String],
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    tags: &'a [String],
    upvoted: bool,
    favorited: bool,
}

impl<'a> PromptFrontmatter<'a> {
    fn from_prompt(prompt: &'a Prompt) -> Self {
        Self {
            id: &prompt.id,
            title: &prompt.title,
            username: prompt.username.as_deref(),
            created: prompt.created_at.as_ref().map(format_date),
            upvotes: prompt.upvotes,
            tools: prompt.tools.as_slice(),
            tags: &prompt.tags,
            upvoted: prompt.is_upvoted,
            favorited: prompt.is_favorited,
        }
    }
}

pub fn format_date(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// Serialize `data` as a YAML front matter block.
pub fn yaml_frontmatter<T: Serialize>(data: &T) -> Result<String> {
    let yaml = serde_yaml::to_string(data)?;
    Ok(format!("---\n{}---\n", yaml))
}

/// Full view of one prompt: front matter, then a markdown body.
pub fn render_prompt(prompt: &Prompt, tools: &ToolDirectory) -> Result<String> {
    let mut out = yaml_frontmatter(&PromptFrontmatter::from_prompt(prompt))?;

    out.push_str(&format!("\n# {}\n", prompt.title));
    if !prompt.description.is_empty() {
        out.push_str(&format!("\n{}\n", prompt.description));
    }

    out.push_str("\n## Prompt\n\n```\n");
    out.push_str(&prompt.prompt_text);
    if !prompt.prompt_text.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("```\n");

    let entries = tools.tools_for(prompt);
    if !entries.is_empty() {
        out.push_str("\n## Tools\n\n");
        for tool in entries {
            match &tool.icon {
                Some(icon) => out.push_str(&format!(
                    "- {} {}: {}\n",
                    icon, tool.display_name, tool.description
                )),
                None => out.push_str(&format!("- {}: {}\n", tool.display_name, tool.description)),
            }
        }
    }

    Ok(out)
}

/// One line per prompt for listings.
pub fn render_line(prompt: &Prompt) -> String {
    let mut line = format!("{}  {}", prompt.id, prompt.title);
    if !prompt.tools.is_empty() {
        line.push_str(&format!("  [{}]", prompt.tools.as_slice().join(", ")));
    }
    line.push_str(&format!("  ▲{}", prompt.upvotes));
    if prompt.is_upvoted {
        line.push_str(" (upvoted)");
    }
    if prompt.is_favorited {
        line.push_str(" ★");
    }
    line
}

pub fn render_list(prompts: &[Prompt]) -> String {
    if prompts.is_empty() {
        return "No prompts found.\n".to_string();
    }
    let mut out = String::new();
    for prompt in prompts {
        out.push_str(&render_line(prompt));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ToolList;
    use chrono::{TimeZone, Utc};

    fn sample() -> Prompt {
        let mut prompt = Prompt::new("p1", "Refactor Python");
        prompt.description = "Cleans up legacy code".to_string();
        prompt.prompt_text = "Refactor the following code".to_string();
        prompt.tools = ToolList::new(["Cursor", "Stable Diffusion"]);
        prompt.tags = vec!["python".to_string()];
        prompt.created_at = Some(Utc.with_ymd_and_hms(2025, 6, 15, 10, 30, 0).unwrap());
        prompt.upvotes = 4;
        prompt.is_favorited = true;
        prompt
    }

    #[test]
    fn test_render_prompt() {
        let tools = ToolDirectory::builtin().unwrap();
        let out = render_prompt(&sample(), &tools).unwrap();

        assert!(out.starts_with("---\nid: p1\n"));
        assert!(out.contains("2025-06-15"));
        assert!(out.contains("favorited: true"));
        assert!(out.contains("# Refactor Python"));
        assert!(out.contains("```\nRefactor the following code\n```"));
        assert!(out.contains("- 📝 Cursor: AI-powered code editor"));
        assert!(out.contains("- Stable Diffusion: AI tool: Stable Diffusion"));
    }

    #[test]
    fn test_render_line() {
        let line = render_line(&sample());
        assert_eq!(line, "p1  Refactor Python  [Cursor, Stable Diffusion]  ▲4 ★");
    }

    #[test]
    fn test_render_empty_list() {
        assert_eq!(render_list(&[]), "No prompts found.\n");
    }
}
