// src/entity/prompt.rs
use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Ordered, de-duplicated list of tool names.
///
/// Legacy records store a single string where newer ones store a list. Both
/// shapes are normalized when a record is decoded, so read sites only ever see
/// a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolList(Vec<String>);

impl ToolList {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tools: Vec<String> = Vec::new();
        for name in names {
            let name: String = name.into();
            let name = name.trim();
            if !name.is_empty() && !tools.iter().any(|t| t == name) {
                tools.push(name.to_string());
            }
        }
        Self(tools)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|t| t == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawToolList {
    One(String),
    Many(Vec<String>),
}

impl<'de> Deserialize<'de> for ToolList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<RawToolList>::deserialize(deserializer)? {
            Some(RawToolList::One(name)) => ToolList::new([name]),
            Some(RawToolList::Many(names)) => ToolList::new(names),
            None => ToolList::default(),
        })
    }
}

/// Trim tags, drop empty ones and remove duplicates, keeping first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag: String = tag.into();
        let tag = tag.trim();
        if !tag.is_empty() && !normalized.iter().any(|t| t == tag) {
            normalized.push(tag.to_string());
        }
    }
    normalized
}

fn deserialize_tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let tags = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(normalize_tags(tags.unwrap_or_default()))
}

/// A stored prompt record as served by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PromptRecord")]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub description: String,
    pub prompt_text: String,
    #[serde(rename = "tool_used")]
    pub tools: ToolList,
    pub tags: Vec<String>,
    pub username: Option<String>,
    /// Stamped by the remote store; never set by the client.
    pub owner_id: Option<String>,
    #[serde(serialize_with = "lenient_timestamp::serialize")]
    pub created_at: Option<DateTime<Utc>>,
    pub upvotes: u32,
    /// Relative to the authenticated viewer.
    pub is_upvoted: bool,
    /// Relative to the authenticated viewer.
    pub is_favorited: bool,
}

/// Wire shape of a prompt. Older records name the owner `user_id`, newer
/// ones `owner_email`, and some carry both.
#[derive(Deserialize)]
struct PromptRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    prompt_text: String,
    #[serde(rename = "tool_used", default)]
    tools: ToolList,
    #[serde(default, deserialize_with = "deserialize_tags")]
    tags: Vec<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    owner_email: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    owner_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp::deserialize")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    upvotes: u32,
    #[serde(default)]
    is_upvoted: bool,
    #[serde(default)]
    is_favorited: bool,
}

impl From<PromptRecord> for Prompt {
    fn from(record: PromptRecord) -> Self {
        // The email is what `/auth/me` reports, so it wins.
        let owner_id = [record.owner_email, record.user_id, record.owner_id]
            .into_iter()
            .flatten()
            .find(|owner| !owner.trim().is_empty());

        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            prompt_text: record.prompt_text,
            tools: record.tools,
            tags: record.tags,
            username: record.username,
            owner_id,
            created_at: record.created_at,
            upvotes: record.upvotes,
            is_upvoted: record.is_upvoted,
            is_favorited: record.is_favorited,
        }
    }
}

impl Prompt {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            prompt_text: String::new(),
            tools: ToolList::default(),
            tags: Vec::new(),
            username: None,
            owner_id: None,
            created_at: None,
            upvotes: 0,
            is_upvoted: false,
            is_favorited: false,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn is_owned_by(&self, identity: &str) -> bool {
        self.owner_id.as_deref() == Some(identity)
    }
}

/// Comparator for the browse view: newest first, missing timestamps last.
pub fn newest_first(a: &Prompt, b: &Prompt) -> Ordering {
    // `None` orders below every `Some`, so reversing puts undated records at the bottom.
    b.created_at.cmp(&a.created_at)
}

pub fn sort_newest_first(prompts: &mut [Prompt]) {
    prompts.sort_by(newest_first);
}

/// Parse a creation timestamp the way the remote store writes it.
///
/// Accepts RFC 3339 and the offset-less ISO 8601 form (`2025-06-15T10:30:00.123456`),
/// which is read as UTC. Anything else yields `None`.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

mod lenient_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_some(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(Value::as_str)
            .and_then(super::parse_timestamp))
    }
}
