mod common;

use common::{MockServer, SESSION, VIEWER_EMAIL};
use promptbay::cache::LocalState;
use promptbay::entity::PromptDraft;
use promptbay::mutation::ToggleOutcome;
use promptbay::notify::{drain, messages, Notification, Notifier};
use promptbay::{App, Config, PromptBayError};
use tokio::sync::mpsc::UnboundedReceiver;

fn app_with(server: &MockServer, local: LocalState) -> (App, UnboundedReceiver<Notification>) {
    let config = Config {
        api_url: server.url.clone(),
        session_token: Some(SESSION.to_string()),
        ..Config::default()
    };
    let (notifier, rx) = Notifier::channel();
    let app = App::with_local_state(config, notifier, local).unwrap();
    (app, rx)
}

async fn signed_in(server: &MockServer) -> (App, UnboundedReceiver<Notification>) {
    let (app, rx) = app_with(server, LocalState::open_in_memory().unwrap());
    app.sign_in().await.unwrap();
    app.store().load().await.unwrap();
    (app, rx)
}

fn draft(title: &str) -> PromptDraft {
    PromptDraft {
        title: title.to_string(),
        description: "Turns a diff into a changelog entry".to_string(),
        prompt_text: "Summarize this diff as a changelog entry.".to_string(),
        tools: vec!["Claude".to_string()],
        tags: PromptDraft::parse_tags("Release, changelog"),
        username: None,
    }
}

#[tokio::test]
async fn test_sign_in_sets_viewer_and_favorites_count() {
    let server = MockServer::with_samples().await;
    server.mark_favorite("legacy");
    let (app, _rx) = app_with(&server, LocalState::open_in_memory().unwrap());

    let viewer = app.sign_in().await.unwrap().unwrap();
    assert_eq!(viewer.email, VIEWER_EMAIL);
    assert_eq!(app.store().viewer(), Some(viewer));
    assert_eq!(app.favorites().current().count, 1);
}

#[tokio::test]
async fn test_submit_creates_and_reloads() {
    let server = MockServer::with_samples().await;
    let (app, mut rx) = signed_in(&server).await;
    drain(&mut rx);

    let created = app.submit(&draft("Changelog writer")).await.unwrap();
    assert_eq!(created.status.as_deref(), Some("success"));

    let stored = server.prompt(&created.id).unwrap();
    assert_eq!(stored["tags"], serde_json::json!(["Release", "changelog"]));

    let known = app.store().get(&created.id).unwrap();
    assert_eq!(known.title, "Changelog writer");
    assert_eq!(app.store().displayed()[0].id, created.id);
    assert!(app.can_edit(&known));
    assert_eq!(drain(&mut rx)[0].message, messages::PROMPT_SAVED);
}

#[tokio::test]
async fn test_edit_owned_prompt() {
    let server = MockServer::with_samples().await;
    let (app, mut rx) = signed_in(&server).await;
    drain(&mut rx);

    let current = app.store().get("newest").unwrap();
    let mut edit = PromptDraft::from_prompt(&current);
    edit.title = "Renamed".to_string();

    let updated = app.edit("newest", &edit).await.unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(server.prompt("newest").unwrap()["title"], "Renamed");
    assert_eq!(app.store().get("newest").unwrap().title, "Renamed");
    assert_eq!(drain(&mut rx)[0].message, messages::PROMPT_UPDATED);
}

#[tokio::test]
async fn test_edit_someone_elses_prompt_is_refused_locally() {
    let server = MockServer::with_samples().await;
    let (app, _rx) = signed_in(&server).await;

    let current = app.store().get("middle").unwrap();
    let err = app
        .edit("middle", &PromptDraft::from_prompt(&current))
        .await
        .unwrap_err();
    assert!(matches!(err, PromptBayError::NotOwner(_)));
    assert_eq!(server.hits("PUT /prompts/{id}"), 0);
}

#[tokio::test]
async fn test_edit_rejected_by_server_reports_reason() {
    let server = MockServer::with_samples().await;
    let local = LocalState::open_in_memory().unwrap();
    // Stale local record: the server owns the decision.
    local.record_created("middle").unwrap();
    let (app, mut rx) = app_with(&server, local);
    app.sign_in().await.unwrap();
    app.store().load().await.unwrap();
    drain(&mut rx);

    let current = app.store().get("middle").unwrap();
    assert!(app.edit("middle", &PromptDraft::from_prompt(&current)).await.is_err());
    assert_eq!(server.hits("PUT /prompts/{id}"), 1);
    assert_eq!(drain(&mut rx)[0].message, "Not authorized to edit this prompt");
}

#[tokio::test]
async fn test_update_tools_replaces_list() {
    let server = MockServer::with_samples().await;
    let (app, _rx) = signed_in(&server).await;

    let update = app
        .update_tools("legacy", &["Claude".to_string(), "Copilot".to_string()])
        .await
        .unwrap();
    assert_eq!(update.old_tool_names, ["Cursor"]);
    assert_eq!(update.new_tool_names, ["Claude", "Copilot"]);

    let reloaded = app.store().get("legacy").unwrap();
    assert_eq!(reloaded.tools.as_slice(), ["Claude".to_string(), "Copilot".to_string()]);
}

#[tokio::test]
async fn test_favorite_toggle_refreshes_count() {
    let server = MockServer::with_samples().await;
    let (app, _rx) = signed_in(&server).await;
    assert_eq!(app.favorites().current().count, 0);

    assert_eq!(
        app.toggle_favorite("middle").await.unwrap(),
        ToggleOutcome::Applied(true)
    );
    assert_eq!(app.favorites().current().count, 1);

    app.toggle_favorite("middle").await.unwrap();
    assert_eq!(app.favorites().current().count, 0);
    assert_eq!(server.hits("GET /users/me/favorites"), 3);
}

#[tokio::test]
async fn test_tool_statistics_over_loaded_collection() {
    let server = MockServer::with_samples().await;
    let (app, _rx) = signed_in(&server).await;

    let stats = app.tool_statistics("cursor").unwrap();
    assert_eq!(stats.display_name, "Cursor");
    assert_eq!(stats.prompt_count, 2);
    assert_eq!(stats.total_upvotes, 3);
    assert_eq!(stats.unique_contributors, 2);

    assert!(app.tool_statistics("not-a-tool").is_none());
}
