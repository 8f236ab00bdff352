use std::io::{self, Read};

use serde::Serialize;

use crate::app::{App, SEARCH_SUGGESTIONS};
use crate::entity::{Prompt, PromptDraft};
use crate::error::{PromptBayError, Result};
use crate::filter::{parse_filter, FilterKind};
use crate::mutation::ToggleOutcome;
use crate::render::{render_list, render_prompt};

use super::commands::DraftArgs;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_prompts(prompts: &[Prompt], json: bool) -> Result<()> {
    if json {
        print_json(prompts)
    } else {
        print!("{}", render_list(prompts));
        Ok(())
    }
}

/// Sign in and load the collection; most commands need both.
async fn prepare(app: &App) -> Result<()> {
    app.sign_in().await?;
    app.store().load().await?;
    Ok(())
}

pub async fn handle_browse(app: &App, json: bool) -> Result<()> {
    prepare(app).await?;
    print_prompts(&app.store().displayed(), json)?;

    if !json && app.first_run()? {
        println!("\nTry searching for:");
        for suggestion in SEARCH_SUGGESTIONS {
            println!("  promptbay search {}", suggestion);
        }
    }
    Ok(())
}

pub async fn handle_search(app: &App, query: Vec<String>, json: bool) -> Result<()> {
    let query = query.join(" ");
    app.sign_in().await?;
    if query.trim().is_empty() {
        app.store().load().await?;
    }
    app.store().search(&query).await?;
    print_prompts(&app.store().displayed(), json)
}

pub async fn handle_filter(
    app: &App,
    kind: String,
    value: Option<String>,
    json: bool,
) -> Result<()> {
    let filter = parse_filter(&kind, value.as_deref())?;
    if filter.kind == FilterKind::Favorites {
        app.sign_in().await?;
    } else {
        prepare(app).await?;
    }
    app.store()
        .apply_filter(filter.kind, filter.value.as_deref())
        .await?;
    print_prompts(&app.store().displayed(), json)
}

pub async fn handle_show(app: &App, id: String, json: bool) -> Result<()> {
    prepare(app).await?;
    let prompt = app
        .store()
        .get(&id)
        .ok_or(PromptBayError::PromptNotFound(id))?;

    if json {
        #[derive(Serialize)]
        struct ShowJson<'a> {
            #[serde(flatten)]
            prompt: &'a Prompt,
            tool_info: Vec<crate::tools::Tool>,
            can_edit: bool,
        }
        print_json(&ShowJson {
            tool_info: app.tools().tools_for(&prompt),
            can_edit: app.can_edit(&prompt),
            prompt: &prompt,
        })
    } else {
        print!("{}", render_prompt(&prompt, app.tools())?);
        Ok(())
    }
}

pub async fn handle_upvote(app: &App, id: String, json: bool) -> Result<()> {
    prepare(app).await?;
    match app.toggle_upvote(&id).await? {
        ToggleOutcome::Applied(state) if json => print_json(&state),
        ToggleOutcome::Applied(state) => {
            let verb = if state.is_upvoted { "Upvoted" } else { "Removed upvote on" };
            println!("{} {} ({} upvotes)", verb, id, state.upvotes);
            Ok(())
        }
        ToggleOutcome::InFlight => {
            println!("An upvote for {} is already in progress.", id);
            Ok(())
        }
    }
}

pub async fn handle_favorite(app: &App, id: String, json: bool) -> Result<()> {
    prepare(app).await?;
    match app.toggle_favorite(&id).await? {
        ToggleOutcome::Applied(favorited) if json => {
            #[derive(Serialize)]
            struct FavoriteJson<'a> {
                id: &'a str,
                is_favorited: bool,
                favorites_count: u32,
            }
            print_json(&FavoriteJson {
                id: &id,
                is_favorited: favorited,
                favorites_count: app.favorites().current().count,
            })
        }
        ToggleOutcome::Applied(favorited) => {
            let verb = if favorited { "Favorited" } else { "Unfavorited" };
            println!(
                "{} {} ({} favorites)",
                verb,
                id,
                app.favorites().current().count
            );
            Ok(())
        }
        ToggleOutcome::InFlight => {
            println!("A favorite change for {} is already in progress.", id);
            Ok(())
        }
    }
}

pub async fn handle_favorites(app: &App, list: bool, json: bool) -> Result<()> {
    let viewer = app.sign_in().await?;
    if viewer.is_none() {
        return Err(PromptBayError::NoViewerIdentity);
    }
    let count = app.favorites().current().count;

    if list {
        app.store().apply_filter(FilterKind::Favorites, None).await?;
    }
    let favorites = app.store().displayed();

    if json {
        #[derive(Serialize)]
        struct FavoritesJson<'a> {
            count: u32,
            #[serde(skip_serializing_if = "Option::is_none")]
            favorites: Option<&'a [Prompt]>,
        }
        return print_json(&FavoritesJson {
            count,
            favorites: list.then_some(favorites.as_slice()),
        });
    }

    println!("{} favorites", count);
    if list {
        print!("{}", render_list(&favorites));
    }
    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    io::stdin().read_to_string(&mut content)?;
    Ok(content)
}

/// Overlay the flags on `base`.
fn build_draft(args: &DraftArgs, base: PromptDraft) -> Result<PromptDraft> {
    let mut draft = base;
    if let Some(title) = &args.title {
        draft.title = title.clone();
    }
    if let Some(description) = &args.description {
        draft.description = description.clone();
    }
    if args.stdin {
        draft.prompt_text = read_stdin()?;
    } else if let Some(text) = &args.prompt_text {
        draft.prompt_text = text.clone();
    }
    if !args.tools.is_empty() {
        draft.tools = args.tools.clone();
    }
    if let Some(tags) = &args.tags {
        draft.tags = PromptDraft::parse_tags(tags);
    }
    if args.username.is_some() {
        draft.username = args.username.clone();
    }
    Ok(draft)
}

pub async fn handle_submit(app: &App, args: DraftArgs) -> Result<()> {
    let draft = build_draft(&args, PromptDraft::default())?;
    app.sign_in().await?;
    let created = app.submit(&draft).await?;

    if args.json {
        print_json(&created)
    } else {
        println!("Created prompt {}", created.id);
        Ok(())
    }
}

pub async fn handle_edit(app: &App, id: String, args: DraftArgs) -> Result<()> {
    prepare(app).await?;
    let current = app
        .store()
        .get(&id)
        .ok_or_else(|| PromptBayError::PromptNotFound(id.clone()))?;
    let draft = build_draft(&args, PromptDraft::from_prompt(&current))?;
    let updated = app.edit(&id, &draft).await?;

    if args.json {
        print_json(&updated)
    } else {
        println!("Updated prompt {}", updated.id);
        Ok(())
    }
}

pub async fn handle_retool(app: &App, id: String, tools: Vec<String>, json: bool) -> Result<()> {
    app.sign_in().await?;
    let update = app.update_tools(&id, &tools).await?;

    if json {
        print_json(&update)
    } else {
        println!(
            "Tools for {}: {} -> {}",
            update.prompt_id,
            update.old_tool_names.join(", "),
            update.new_tool_names.join(", ")
        );
        Ok(())
    }
}

pub async fn handle_whoami(app: &App, json: bool) -> Result<()> {
    let viewer = app.sign_in().await?;
    if json {
        return print_json(&viewer);
    }
    match viewer {
        Some(viewer) => match &viewer.username {
            Some(username) => println!("Signed in as {} ({})", viewer.email, username),
            None => println!("Signed in as {}", viewer.email),
        },
        None => println!("Not signed in."),
    }
    Ok(())
}

pub async fn handle_tools(
    app: &App,
    query: Option<String>,
    category: Option<String>,
    stats: bool,
    json: bool,
) -> Result<()> {
    if stats {
        let tool = query.unwrap_or_default();
        app.store().load().await?;
        let statistics = app
            .tool_statistics(&tool)
            .ok_or(PromptBayError::UnknownTool(tool))?;

        if json {
            return print_json(&statistics);
        }
        println!("{} ({})", statistics.display_name, statistics.tool_id);
        println!("  prompts:      {}", statistics.prompt_count);
        println!("  upvotes:      {}", statistics.total_upvotes);
        println!("  contributors: {}", statistics.unique_contributors);
        println!(
            "  this week:    {} prompts, {} upvotes",
            statistics.weekly_prompts, statistics.weekly_upvotes
        );
        for contributor in &statistics.top_contributors {
            println!("    {} ({})", contributor.name, contributor.count);
        }
        return Ok(());
    }

    let directory = app.tools();
    let mut tools = directory.search(query.as_deref().unwrap_or_default());
    if let Some(category) = &category {
        tools.retain(|t| &t.category == category);
    }

    if json {
        return print_json(&tools);
    }
    if tools.is_empty() {
        println!("No tools found.");
        return Ok(());
    }
    for tool in tools {
        println!("{:<16} {:<20} {}", tool.id, tool.display_name, tool.description);
    }
    Ok(())
}
