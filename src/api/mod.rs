//! HTTP boundary to the remote prompt store.
//!
//! Reads of shared collections (`/prompts`, `/users/me/favorites`) go through
//! the client's [`RequestDeduplicator`]; writes always hit the network and
//! invalidate the cached reads they make stale.

pub mod error;

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::COOKIE;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::{RequestDeduplicator, RequestHandle, DEFAULT_TTL};
use crate::config::Config;
use crate::entity::{Prompt, PromptDraft, Viewer};

pub use error::{reasons, ApiError};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const PROMPTS_PATH: &str = "/prompts";
const FAVORITES_PATH: &str = "/users/me/favorites";

/// A response as received, before its status is interpreted.
///
/// Non-success statuses are kept as responses so the deduplicator caches them
/// exactly like successes.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn into_success(self) -> ApiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_response(self.status, &self.body))
        }
    }

    fn json<T: DeserializeOwned>(&self) -> ApiResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Request options folded into the deduplication key.
#[derive(Serialize)]
struct RequestOptions<'a> {
    method: &'a str,
    credentials: &'a str,
}

#[derive(Deserialize)]
struct ResultsPage {
    #[serde(default)]
    results: Vec<Prompt>,
}

/// The viewer's favorites listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoritesPage {
    #[serde(default)]
    pub favorites: Vec<Prompt>,
    #[serde(default)]
    pub count: Option<u32>,
}

impl FavoritesPage {
    /// The server's count, or the listing length when the count is missing.
    pub fn count(&self) -> u32 {
        self.count.unwrap_or(self.favorites.len() as u32)
    }
}

#[derive(Deserialize)]
struct UpvoteResponse {
    upvotes: u32,
}

/// Acknowledgement of a new prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPrompt {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Acknowledgement of a tool re-tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUpdate {
    #[serde(default)]
    pub status: Option<String>,
    pub prompt_id: String,
    #[serde(default)]
    pub old_tool_names: Vec<String>,
    #[serde(default)]
    pub new_tool_names: Vec<String>,
}

#[derive(Serialize)]
struct ToolNames<'a> {
    tool_names: &'a [String],
}

#[derive(Debug, Clone)]
struct SessionCookie {
    name: String,
    value: String,
}

/// Client for the remote prompt store.
///
/// Cloning shares the HTTP connection pool and the request cache.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<SessionCookie>,
    dedup: RequestDeduplicator<ApiResult<RawResponse>>,
    dedup_ttl: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session: None,
            dedup: RequestDeduplicator::new(),
            dedup_ttl: DEFAULT_TTL,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let client = Self::new(&config.api_url).with_dedup_ttl(config.dedup_ttl());
        match &config.session_token {
            Some(token) => client.with_session(&config.session_cookie, token),
            None => client,
        }
    }

    pub fn with_session(mut self, cookie_name: &str, value: &str) -> Self {
        self.set_session(Some((cookie_name, value)));
        self
    }

    pub fn with_dedup_ttl(mut self, ttl: Duration) -> Self {
        self.dedup_ttl = ttl;
        self
    }

    /// Replace the session. Cached responses belong to the old viewer and are dropped.
    pub fn set_session(&mut self, session: Option<(&str, &str)>) {
        self.session = session
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| SessionCookie {
                name: name.to_string(),
                value: value.trim().to_string(),
            });
        self.dedup.clear();
    }

    /// Cookie presence test.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match &self.session {
            Some(cookie) => builder.header(COOKIE, format!("{}={}", cookie.name, cookie.value)),
            None => builder,
        }
    }

    /// GET `path` through the deduplicator.
    fn get_deduped(&self, path: &str) -> RequestHandle<ApiResult<RawResponse>> {
        let key = cache_key(&self.url(path), "GET");
        let request = self.request(Method::GET, path);
        self.dedup
            .fetch_deduped(&key, move || execute(request), self.dedup_ttl)
    }

    /// Drop cached reads of `path` and everything below it.
    pub fn invalidate(&self, path: &str) {
        debug!(path, "Invalidating cached responses");
        self.dedup.clear_prefix(&self.url(path));
    }

    /// `GET /prompts`, newest data for the current viewer.
    pub async fn list_prompts(&self) -> ApiResult<Vec<Prompt>> {
        let page: ResultsPage = self.get_deduped(PROMPTS_PATH).await?.into_success()?.json()?;
        Ok(page.results)
    }

    /// `GET /search?q=`, results in server rank order.
    pub async fn search(&self, query: &str) -> ApiResult<Vec<Prompt>> {
        info!(query, "Searching prompts");
        let request = self.request(Method::GET, "/search").query(&[("q", query)]);
        let page: ResultsPage = execute(request).await?.into_success()?.json()?;
        Ok(page.results)
    }

    /// `POST /prompts` with an already validated draft.
    pub async fn create_prompt(&self, draft: &PromptDraft) -> ApiResult<CreatedPrompt> {
        info!(title = %draft.title, "Creating prompt");
        let request = self.request(Method::POST, PROMPTS_PATH).json(draft);
        let created: CreatedPrompt = execute(request).await?.into_success()?.json()?;
        self.invalidate(PROMPTS_PATH);
        Ok(created)
    }

    /// `PUT /prompts/{id}`. Only the owner succeeds.
    pub async fn update_prompt(&self, id: &str, draft: &PromptDraft) -> ApiResult<Prompt> {
        info!(id, "Updating prompt");
        let request = self
            .request(Method::PUT, &format!("{}/{}", PROMPTS_PATH, id))
            .json(draft);
        let updated: Prompt = execute(request).await?.into_success()?.json()?;
        self.invalidate(PROMPTS_PATH);
        Ok(updated)
    }

    /// `PATCH /prompts/{id}/tools`.
    pub async fn update_tools(&self, id: &str, tools: &[String]) -> ApiResult<ToolUpdate> {
        info!(id, ?tools, "Updating prompt tools");
        let request = self
            .request(Method::PATCH, &format!("{}/{}/tools", PROMPTS_PATH, id))
            .json(&ToolNames { tool_names: tools });
        let update: ToolUpdate = execute(request).await?.into_success()?.json()?;
        self.invalidate(PROMPTS_PATH);
        Ok(update)
    }

    /// `GET /users/me/favorites`.
    pub async fn favorites(&self) -> ApiResult<FavoritesPage> {
        self.get_deduped(FAVORITES_PATH).await?.into_success()?.json()
    }

    /// `POST` or `DELETE /users/me/favorites/{id}`.
    pub async fn set_favorite(&self, id: &str, favorite: bool) -> ApiResult<()> {
        let method = if favorite { Method::POST } else { Method::DELETE };
        info!(id, favorite, "Toggling favorite");
        let request = self.request(method, &format!("{}/{}", FAVORITES_PATH, id));
        execute(request).await?.into_success()?;
        self.invalidate(FAVORITES_PATH);
        self.invalidate(PROMPTS_PATH);
        Ok(())
    }

    /// `POST` or `DELETE /prompts/{id}/upvote`; returns the server's count.
    pub async fn set_upvote(&self, id: &str, upvote: bool) -> ApiResult<u32> {
        let method = if upvote { Method::POST } else { Method::DELETE };
        info!(id, upvote, "Toggling upvote");
        let request = self.request(method, &format!("{}/{}/upvote", PROMPTS_PATH, id));
        let body: UpvoteResponse = execute(request).await?.into_success()?.json()?;
        self.invalidate(PROMPTS_PATH);
        Ok(body.upvotes)
    }

    pub async fn upvote(&self, id: &str) -> ApiResult<u32> {
        self.set_upvote(id, true).await
    }

    pub async fn remove_upvote(&self, id: &str) -> ApiResult<u32> {
        self.set_upvote(id, false).await
    }

    /// `GET /auth/me`. A 401 means there is no viewer.
    pub async fn me(&self) -> ApiResult<Option<Viewer>> {
        let response = execute(self.request(Method::GET, "/auth/me")).await?;
        match response.into_success() {
            Ok(response) => response.json().map(Some),
            Err(ApiError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Deduplication key: the URL plus the serialized request options.
pub fn cache_key(url: &str, method: &str) -> String {
    let options = RequestOptions {
        method,
        credentials: "include",
    };
    format!(
        "{}-{}",
        url,
        serde_json::to_string(&options).unwrap_or_default()
    )
}

async fn execute(request: RequestBuilder) -> ApiResult<RawResponse> {
    let response = request
        .send()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    let status = response.status().as_u16();
    let body = response
        .bytes()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    debug!(status, bytes = body.len(), "Response received");
    Ok(RawResponse { status, body })
}
