use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "promptbay")]
#[command(version, about = "Browse, search and curate a shared library of AI prompts")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Base URL of the prompt server
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Session cookie value
    #[arg(long, global = true, value_name = "TOKEN")]
    pub session: Option<String>,

    /// Config file (defaults to <config dir>/promptbay/config.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every prompt, newest first
    Browse {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search prompts on the server
    Search {
        /// Search terms; an empty query lists everything
        query: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Narrow the listing (tag, tool, username, my-prompts, favorites, clear)
    Filter {
        /// Filter kind, or "kind:value"
        kind: String,

        /// Value for tag, tool and username filters
        value: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one prompt
    Show {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upvote a prompt, or remove your upvote
    Upvote {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a prompt to your favorites, or remove it
    Favorite {
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how many favorites you have
    Favorites {
        /// List the favorites too
        #[arg(long)]
        list: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a new prompt
    Submit(DraftArgs),

    /// Edit a prompt you own
    Edit {
        id: String,

        #[command(flatten)]
        draft: DraftArgs,
    },

    /// Replace the tools on a prompt
    Retool {
        id: String,

        /// Tool names (can be specified multiple times)
        #[arg(long = "tool", short = 't', required = true)]
        tools: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show who the session belongs to
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse the tool directory
    Tools {
        /// Search text, or a tool id with --stats
        query: Option<String>,

        /// Only tools in this category (coding, writing, design, automation)
        #[arg(long)]
        category: Option<String>,

        /// Show usage statistics for the tool named by QUERY
        #[arg(long, requires = "query")]
        stats: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Prompt content flags shared by `submit` and `edit`.
///
/// For `edit`, omitted fields keep their current value.
#[derive(Args, Debug, Default)]
pub struct DraftArgs {
    /// Prompt title
    #[arg(long)]
    pub title: Option<String>,

    /// Short description
    #[arg(long)]
    pub description: Option<String>,

    /// Prompt text
    #[arg(long = "text", conflicts_with = "stdin")]
    pub prompt_text: Option<String>,

    /// Read the prompt text from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Tool names (can be specified multiple times)
    #[arg(long = "tool", short = 't')]
    pub tools: Vec<String>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,

    /// Display name to show as the author
    #[arg(long)]
    pub username: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
