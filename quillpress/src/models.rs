//! Blog documents and their public projections.
//!
//! Stored documents (`User`, `Post`, `Comment`, `Category`) implement
//! [`Document`]; the view types are what the API serializes. Every JSON shape
//! uses camelCase names so stored documents and responses line up with what
//! the reader and admin clients expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{errors::EntityKind, origin::ServingOrigin};

/// A document persisted in one collection of the store.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection name used for key generation.
    const COLLECTION: &'static str;

    /// Which entity a missing document of this type reports.
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Derived fields written next to the document so the search index can
    /// filter and sort on them. They are ignored when reading back.
    fn index_mirrors(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub password_hash: String,
    #[serde(default)]
    pub liked_posts: Vec<String>,
    #[serde(default)]
    pub saved_posts: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_liked(&self, post_id: &str) -> bool {
        self.liked_posts.iter().any(|id| id == post_id)
    }

    pub fn has_saved(&self, post_id: &str) -> bool {
        self.saved_posts.iter().any(|id| id == post_id)
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            user_name: self.user_name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub reading_minutes: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub image: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn summary(&self, origin: &ServingOrigin) -> PostSummary {
        PostSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            reading_minutes: self.reading_minutes,
            slug: self.slug.clone(),
            tags: self.tags.clone(),
            created_at: self.created_at,
            image_url: origin.image_url(&self.image),
        }
    }
}

impl Document for Post {
    const COLLECTION: &'static str = "posts";
    const KIND: EntityKind = EntityKind::Post;

    fn id(&self) -> &str {
        &self.id
    }

    fn index_mirrors(&self) -> Vec<(&'static str, Value)> {
        vec![
            (TITLE_FOLDED_FIELD, Value::String(self.title.to_lowercase())),
            (CREATED_AT_MS_FIELD, Value::from(self.created_at.timestamp_millis())),
        ]
    }
}

/// Lowercased title mirror, matched by the title filter.
pub const TITLE_FOLDED_FIELD: &str = "titleFolded";
/// `createdAt` as epoch milliseconds, used for newest-first sorting.
pub const CREATED_AT_MS_FIELD: &str = "createdAtMs";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub user: String,
    pub post: String,
    #[serde(default)]
    pub replies: Vec<Reply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Comment {
    const COLLECTION: &'static str = "comments";
    const KIND: EntityKind = EntityKind::Comment;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Subdocument embedded in a [`Comment`]; it has no collection of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub content: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";
    const KIND: EntityKind = EntityKind::Category;

    fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Public profile fields embedded wherever a user is referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub content: String,
    pub reading_minutes: u32,
    pub slug: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: String,
    pub title: String,
    pub content: String,
    pub reading_minutes: u32,
    pub slug: String,
    pub tags: Vec<String>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: Option<PublicUser>,
    pub post: String,
    pub content: String,
    pub replies: Vec<ReplyView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyView {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: Option<PublicUser>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of posts plus the total number of matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostPage {
    pub count: u64,
    pub posts: Vec<PostSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStatus {
    pub is_liked: bool,
    pub is_saved: bool,
    pub likes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub is_liked: bool,
    pub likes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub is_saved: bool,
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewComment {
    pub user: String,
    pub post: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
    pub user: String,
    pub comment: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub reading_minutes: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub image: String,
    #[serde(default)]
    pub author: Option<String>,
}
