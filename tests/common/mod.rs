//! In-process stand-in for the remote prompt store.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use promptbay::ApiClient;

pub const SESSION: &str = "test-session";
pub const VIEWER_EMAIL: &str = "ana@example.com";
pub const VIEWER_NAME: &str = "ana";

#[derive(Default)]
pub struct MockState {
    prompts: Mutex<Vec<Value>>,
    upvoted: Mutex<HashSet<String>>,
    favorites: Mutex<HashSet<String>>,
    favorites_override: Mutex<Option<Vec<Value>>>,
    hits: Mutex<HashMap<String, usize>>,
    delays: Mutex<HashMap<String, Duration>>,
    failures: Mutex<HashMap<String, (StatusCode, Value)>>,
}

impl MockState {
    fn record(&self, route: &str) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_insert(0) += 1;
    }

    /// Count the hit, apply any injected delay, then any injected failure.
    async fn gate(&self, route: &str) -> Option<Response> {
        self.record(route);
        let delay = self.delays.lock().unwrap().get(route).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.failures.lock().unwrap().get(route).cloned();
        failure.map(|(status, body)| (status, Json(body)).into_response())
    }

    fn decorate(&self, prompt: &Value) -> Value {
        let mut prompt = prompt.clone();
        let id = prompt["id"].as_str().unwrap_or_default().to_string();
        prompt["is_upvoted"] = json!(self.upvoted.lock().unwrap().contains(&id));
        prompt["is_favorited"] = json!(self.favorites.lock().unwrap().contains(&id));
        prompt
    }
}

fn signed_in(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|cookies| {
            cookies
                .split(';')
                .any(|c| c.trim() == format!("session_token={}", SESSION))
        })
}

fn detail(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn unauthorized() -> Response {
    detail(StatusCode::UNAUTHORIZED, "Not authenticated")
}

type Shared = State<Arc<MockState>>;

async fn list_prompts(State(state): Shared) -> Response {
    if let Some(failure) = state.gate("GET /prompts").await {
        return failure;
    }
    let prompts: Vec<Value> = state
        .prompts
        .lock()
        .unwrap()
        .iter()
        .map(|p| state.decorate(p))
        .collect();
    Json(json!({ "results": prompts })).into_response()
}

async fn create_prompt(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Some(failure) = state.gate("POST /prompts").await {
        return failure;
    }
    if !signed_in(&headers) {
        return unauthorized();
    }
    let id = uuid::Uuid::new_v4().to_string();
    let mut prompt = body;
    prompt["id"] = json!(id);
    prompt["owner_email"] = json!(VIEWER_EMAIL);
    prompt["upvotes"] = json!(0);
    prompt["created_at"] = json!(chrono::Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string());
    state.prompts.lock().unwrap().push(prompt);
    Json(json!({ "status": "success", "id": id })).into_response()
}

async fn update_prompt(
    State(state): Shared,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = state.gate("PUT /prompts/{id}").await {
        return failure;
    }
    if !signed_in(&headers) {
        return unauthorized();
    }
    let updated = {
        let mut prompts = state.prompts.lock().unwrap();
        let Some(prompt) = prompts.iter_mut().find(|p| p["id"] == json!(id)) else {
            return detail(StatusCode::NOT_FOUND, "Prompt not found");
        };
        if prompt["owner_email"] != json!(VIEWER_EMAIL) {
            return detail(StatusCode::FORBIDDEN, "Not authorized to edit this prompt");
        }
        for field in ["title", "description", "prompt_text", "tool_used", "tags", "username"] {
            if let Some(value) = body.get(field) {
                prompt[field] = value.clone();
            }
        }
        prompt.clone()
    };
    Json(state.decorate(&updated)).into_response()
}

async fn update_tools(
    State(state): Shared,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = state.gate("PATCH /prompts/{id}/tools").await {
        return failure;
    }
    if !signed_in(&headers) {
        return unauthorized();
    }
    let mut prompts = state.prompts.lock().unwrap();
    let Some(prompt) = prompts.iter_mut().find(|p| p["id"] == json!(id)) else {
        return detail(StatusCode::NOT_FOUND, "Prompt not found");
    };
    let old = match prompt["tool_used"].clone() {
        Value::String(name) => json!([name]),
        other => other,
    };
    prompt["tool_used"] = body["tool_names"].clone();
    Json(json!({
        "status": "success",
        "prompt_id": id,
        "old_tool_names": old,
        "new_tool_names": body["tool_names"],
    }))
    .into_response()
}

async fn search(State(state): Shared, Query(params): Query<HashMap<String, String>>) -> Response {
    if let Some(failure) = state.gate("GET /search").await {
        return failure;
    }
    let query = params.get("q").cloned().unwrap_or_default().to_lowercase();
    let mut results: Vec<Value> = state
        .prompts
        .lock()
        .unwrap()
        .iter()
        .filter(|p| {
            ["title", "description", "prompt_text"].iter().any(|f| {
                p[*f].as_str().unwrap_or_default().to_lowercase().contains(&query)
            })
        })
        .map(|p| state.decorate(p))
        .collect();
    // Ranked by upvotes, which differs from creation order.
    results.sort_by_key(|p| std::cmp::Reverse(p["upvotes"].as_u64().unwrap_or(0)));
    Json(json!({ "results": results })).into_response()
}

async fn list_favorites(State(state): Shared, headers: HeaderMap) -> Response {
    if let Some(failure) = state.gate("GET /users/me/favorites").await {
        return failure;
    }
    if !signed_in(&headers) {
        return unauthorized();
    }
    let favorites = match state.favorites_override.lock().unwrap().clone() {
        Some(favorites) => favorites,
        None => {
            let ids = state.favorites.lock().unwrap().clone();
            state
                .prompts
                .lock()
                .unwrap()
                .iter()
                .filter(|p| ids.contains(p["id"].as_str().unwrap_or_default()))
                .map(|p| state.decorate(p))
                .collect()
        }
    };
    Json(json!({ "count": favorites.len(), "favorites": favorites })).into_response()
}

async fn toggle_favorite(state: &MockState, route: &str, id: String, headers: &HeaderMap, add: bool) -> Response {
    if let Some(failure) = state.gate(route).await {
        return failure;
    }
    if !signed_in(headers) {
        return unauthorized();
    }
    let mut favorites = state.favorites.lock().unwrap();
    if add {
        favorites.insert(id);
    } else {
        favorites.remove(&id);
    }
    Json(json!({ "status": "success" })).into_response()
}

async fn add_favorite(State(state): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
    toggle_favorite(&state, "POST /users/me/favorites/{id}", id, &headers, true).await
}

async fn remove_favorite(State(state): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
    toggle_favorite(&state, "DELETE /users/me/favorites/{id}", id, &headers, false).await
}

async fn toggle_upvote(state: &MockState, route: &str, id: String, headers: &HeaderMap, add: bool) -> Response {
    if let Some(failure) = state.gate(route).await {
        return failure;
    }
    if !signed_in(headers) {
        return unauthorized();
    }
    let mut prompts = state.prompts.lock().unwrap();
    let Some(prompt) = prompts.iter_mut().find(|p| p["id"] == json!(id)) else {
        return detail(StatusCode::NOT_FOUND, "Prompt not found");
    };
    let mut upvoted = state.upvoted.lock().unwrap();
    let upvotes = prompt["upvotes"].as_u64().unwrap_or(0);
    let upvotes = if add {
        if !upvoted.insert(id) {
            return detail(StatusCode::BAD_REQUEST, "Already upvoted");
        }
        upvotes + 1
    } else {
        if !upvoted.remove(&id) {
            return detail(StatusCode::BAD_REQUEST, "Not upvoted");
        }
        upvotes.saturating_sub(1)
    };
    prompt["upvotes"] = json!(upvotes);
    Json(json!({ "upvotes": upvotes })).into_response()
}

async fn upvote(State(state): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
    toggle_upvote(&state, "POST /prompts/{id}/upvote", id, &headers, true).await
}

async fn remove_upvote(State(state): Shared, Path(id): Path<String>, headers: HeaderMap) -> Response {
    toggle_upvote(&state, "DELETE /prompts/{id}/upvote", id, &headers, false).await
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    if let Some(failure) = state.gate("GET /auth/me").await {
        return failure;
    }
    if !signed_in(&headers) {
        return unauthorized();
    }
    Json(json!({ "email": VIEWER_EMAIL, "username": VIEWER_NAME })).into_response()
}

pub struct MockServer {
    pub url: String,
    pub state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let router = Router::new()
            .route("/prompts", get(list_prompts).post(create_prompt))
            .route("/prompts/{id}", put(update_prompt))
            .route("/prompts/{id}/tools", patch(update_tools))
            .route("/prompts/{id}/upvote", post(upvote).delete(remove_upvote))
            .route("/search", get(search))
            .route("/users/me/favorites", get(list_favorites))
            .route(
                "/users/me/favorites/{id}",
                post(add_favorite).delete(remove_favorite),
            )
            .route("/auth/me", get(me))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    /// Start with the standard sample collection.
    pub async fn with_samples() -> Self {
        let server = Self::start().await;
        for prompt in sample_prompts() {
            server.add_prompt(prompt);
        }
        server
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.url).with_session("session_token", SESSION)
    }

    pub fn anonymous_client(&self) -> ApiClient {
        ApiClient::new(&self.url)
    }

    pub fn hits(&self, route: &str) -> usize {
        self.state.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn delay(&self, route: &str, delay: Duration) {
        self.state.delays.lock().unwrap().insert(route.to_string(), delay);
    }

    pub fn fail(&self, route: &str, status: u16, reason: Option<&str>) {
        let body = match reason {
            Some(reason) => json!({ "detail": reason }),
            None => json!({}),
        };
        self.state.failures.lock().unwrap().insert(
            route.to_string(),
            (StatusCode::from_u16(status).unwrap(), body),
        );
    }

    pub fn clear_failure(&self, route: &str) {
        self.state.failures.lock().unwrap().remove(route);
    }

    pub fn add_prompt(&self, prompt: Value) {
        self.state.prompts.lock().unwrap().push(prompt);
    }

    pub fn prompt(&self, id: &str) -> Option<Value> {
        self.state
            .prompts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p["id"] == json!(id))
            .cloned()
    }

    pub fn mark_upvoted(&self, id: &str) {
        self.state.upvoted.lock().unwrap().insert(id.to_string());
    }

    pub fn mark_favorite(&self, id: &str) {
        self.state.favorites.lock().unwrap().insert(id.to_string());
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.state.favorites.lock().unwrap().contains(id)
    }

    /// Serve exactly `favorites` from the favorites endpoint.
    pub fn set_favorites_response(&self, favorites: Vec<Value>) {
        *self.state.favorites_override.lock().unwrap() = Some(favorites);
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn prompt_json(id: &str, title: &str, created_at: Option<&str>, tools: Value, tags: &[&str]) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{} description", title),
        "prompt_text": format!("{} text", title),
        "tool_used": tools,
        "tags": tags,
        "username": null,
        "owner_email": null,
        "created_at": created_at,
        "upvotes": 0,
    })
}

/// Five prompts in scrambled creation order, with one legacy scalar tool
/// field and two unusable timestamps.
pub fn sample_prompts() -> Vec<Value> {
    let mut undated = prompt_json("undated", "Undated email helper", None, json!(["ChatGPT"]), &["writing"]);
    undated["upvotes"] = json!(7);

    let mut legacy = prompt_json(
        "legacy",
        "Legacy python refactor",
        Some("2024-01-10T08:00:00.000000"),
        json!("Cursor"),
        &["python"],
    );
    legacy["username"] = json!("bo");

    let mut newest = prompt_json(
        "newest",
        "Newest python tests",
        Some("2025-06-15T10:30:00.123456"),
        json!(["Claude", "Cursor"]),
        &["python", "testing"],
    );
    newest["owner_email"] = json!(VIEWER_EMAIL);
    newest["username"] = json!(VIEWER_NAME);
    newest["upvotes"] = json!(3);

    let garbled = prompt_json("garbled", "Garbled date docs", Some("last tuesday"), json!(["Gemini"]), &["docs"]);

    let mut middle = prompt_json(
        "middle",
        "Middle debug javascript",
        Some("2025-02-01T12:00:00Z"),
        json!(["ChatGPT"]),
        &["javascript", "debug"],
    );
    middle["upvotes"] = json!(12);

    vec![undated, legacy, newest, garbled, middle]
}
