use clap::Parser;
use promptbay::cli::{
    handle_browse, handle_edit, handle_favorite, handle_favorites, handle_filter, handle_retool,
    handle_search, handle_show, handle_submit, handle_tools, handle_upvote, handle_whoami, Cli,
    Commands,
};
use promptbay::notify::{drain, format_notification, Notifier};
use promptbay::{App, Config, Result};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_env("PROMPTBAY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (notifier, mut notifications) = Notifier::channel();

    let result = run(cli, notifier).await;

    for notification in drain(&mut notifications) {
        eprintln!("{}", format_notification(&notification));
    }

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, notifier: Notifier) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(session) = cli.session {
        config.session_token = Some(session);
    }
    let app = App::new(config.normalized(), notifier)?;

    match cli.command {
        Commands::Browse { json } => handle_browse(&app, json).await,
        Commands::Search { query, json } => handle_search(&app, query, json).await,
        Commands::Filter { kind, value, json } => handle_filter(&app, kind, value, json).await,
        Commands::Show { id, json } => handle_show(&app, id, json).await,
        Commands::Upvote { id, json } => handle_upvote(&app, id, json).await,
        Commands::Favorite { id, json } => handle_favorite(&app, id, json).await,
        Commands::Favorites { list, json } => handle_favorites(&app, list, json).await,
        Commands::Submit(draft) => handle_submit(&app, draft).await,
        Commands::Edit { id, draft } => handle_edit(&app, id, draft).await,
        Commands::Retool { id, tools, json } => handle_retool(&app, id, tools, json).await,
        Commands::Whoami { json } => handle_whoami(&app, json).await,
        Commands::Tools {
            query,
            category,
            stats,
            json,
        } => handle_tools(&app, query, category, stats, json).await,
    }
}
