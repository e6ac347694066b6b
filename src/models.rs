use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Entity ids are opaque prefixed strings ("thread-<uuid>", "comment-<uuid>", ...).
pub type Id = String;

/// Shown in place of the stored text once a comment is soft-deleted.
pub const DELETED_COMMENT_PLACEHOLDER: &str = "**komentar telah dihapus**";
/// Shown in place of the stored text once a reply is soft-deleted.
pub const DELETED_REPLY_PLACEHOLDER: &str = "**balasan telah dihapus**";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payload is missing required property '{0}'")]
    MissingProperty(&'static str),
    #[error("property '{0}' does not meet the expected type")]
    InvalidType(&'static str),
}

/// Pull a required string field out of a raw JSON payload.
///
/// Absent or null keys report `MissingProperty`; present keys of any other
/// JSON type report `InvalidType`. Entity constructors run this before any
/// repository call so invalid payloads never reach a store.
fn required_str(payload: &Value, key: &'static str) -> Result<String, ValidationError> {
    match payload.get(key) {
        None | Some(Value::Null) => Err(ValidationError::MissingProperty(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ValidationError::InvalidType(key)),
    }
}

/// Validated thread-creation entity. `owner`/`username` come from the JWT
/// claims, never from the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThread {
    pub title: String,
    pub body: String,
    pub owner: Id,
    pub username: String,
}

impl NewThread {
    pub fn parse(payload: &Value, owner: &str, username: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            title: required_str(payload, "title")?,
            body: required_str(payload, "body")?,
            owner: owner.to_string(),
            username: username.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub thread_id: Id,
    pub content: String,
    pub owner: Id,
    pub username: String,
}

impl NewComment {
    pub fn parse(
        payload: &Value,
        thread_id: &str,
        owner: &str,
        username: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            thread_id: thread_id.to_string(),
            content: required_str(payload, "content")?,
            owner: owner.to_string(),
            username: username.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReply {
    pub thread_id: Id,
    pub comment_id: Id,
    pub content: String,
    pub owner: Id,
    pub username: String,
}

impl NewReply {
    pub fn parse(
        payload: &Value,
        thread_id: &str,
        comment_id: &str,
        owner: &str,
        username: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            thread_id: thread_id.to_string(),
            comment_id: comment_id.to_string(),
            content: required_str(payload, "content")?,
            owner: owner.to_string(),
            username: username.to_string(),
        })
    }
}

// ---------------- store-level records ----------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ThreadRecord {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CommentRecord {
    pub id: Id,
    pub owner: Id,
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct ReplyRecord {
    pub id: Id,
    pub comment_id: Id,
    pub owner: Id,
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
    pub is_deleted: bool,
}

// ---------------- creation confirmations ----------------
// Deliberately minimal: no derived fields such as the creation date.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AddedThread {
    pub id: Id,
    pub title: String,
    pub owner: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AddedComment {
    pub id: Id,
    pub content: String,
    pub owner: Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AddedReply {
    pub id: Id,
    pub content: String,
    pub owner: Id,
}

// ---------------- detail view (derived, never persisted) ----------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ThreadDetail {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub date: DateTime<Utc>,
    pub username: String,
    pub comments: Vec<CommentDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommentDetail {
    pub id: Id,
    pub username: String,
    pub date: DateTime<Utc>,
    pub content: String,
    #[serde(rename = "likeCount")]
    pub like_count: i64,
    pub replies: Vec<ReplyDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReplyDetail {
    pub id: Id,
    pub content: String,
    pub date: DateTime<Utc>,
    pub username: String,
}

/// Visible-or-redacted tag for soft-deleted text.
///
/// The substitution rule lives here and is materialized exactly once, at the
/// detail-assembly boundary. Stored text survives deletion but is never
/// rendered again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Visible(String),
    Redacted,
}

impl Content {
    pub fn of(text: String, is_deleted: bool) -> Self {
        if is_deleted {
            Content::Redacted
        } else {
            Content::Visible(text)
        }
    }

    pub fn render(self, placeholder: &'static str) -> String {
        match self {
            Content::Visible(text) => text,
            Content::Redacted => placeholder.to_string(),
        }
    }
}
