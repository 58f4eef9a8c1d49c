//! Document store abstraction.
//!
//! The repository talks to storage only through [`DocumentStore`]. Reads are
//! plain document fetches; every mutation that touches more than one
//! document (insert + unique claims, comment + post reference list,
//! membership + like counter) is a single store operation so each backend
//! can make it atomic.

use std::future::Future;

use crate::{
    errors::RepoError,
    models::{Comment, Document, Post, Reply},
    search::{SearchParams, SearchResult},
};

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// The two per-user membership sets a post can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Liked,
    Saved,
}

impl Membership {
    /// Field on the user document holding the set.
    pub const fn field(self) -> &'static str {
        match self {
            Membership::Liked => "likedPosts",
            Membership::Saved => "savedPosts",
        }
    }

    /// Whether changing this membership moves the post's `likes` counter.
    pub const fn counts_likes(self) -> bool {
        matches!(self, Membership::Liked)
    }
}

/// Result of moving a membership to its desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipChange {
    pub is_member: bool,
    /// False when the membership already matched the desired state.
    pub changed: bool,
    /// The post's like counter after the change (only for [`Membership::Liked`]).
    pub likes: Option<u64>,
}

/// A value a document claims exclusively within its collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueValue {
    pub field: &'static str,
    pub value: String,
}

impl UniqueValue {
    pub fn exact(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    /// Claims compare trimmed, lowercased values.
    pub fn case_insensitive(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.trim().to_lowercase(),
        }
    }
}

pub trait DocumentStore: Clone + Send + Sync + 'static {
    fn get<T: Document>(&self, id: &str) -> impl Future<Output = Result<Option<T>, RepoError>> + Send;

    /// Fetches several documents at once, in the order of `ids`. Ids that do
    /// not resolve are skipped.
    fn get_many<T: Document>(&self, ids: &[String]) -> impl Future<Output = Result<Vec<T>, RepoError>> + Send;

    fn list_all<T: Document>(&self) -> impl Future<Output = Result<Vec<T>, RepoError>> + Send;

    fn find_unique<T: Document>(&self, key: &UniqueValue) -> impl Future<Output = Result<Option<T>, RepoError>> + Send;

    /// Inserts a new document and claims its unique values. Fails with
    /// `UniqueConstraintViolation` if another document holds one of them.
    fn insert<T: Document>(&self, document: &T, unique: &[UniqueValue]) -> impl Future<Output = Result<(), RepoError>> + Send;

    fn search_posts(&self, params: &SearchParams) -> impl Future<Output = Result<SearchResult<Post>, RepoError>> + Send;

    /// Stores `comment` and appends its id to the comment list of the post
    /// it references, atomically. Fails with NotFound(Post) and stores
    /// nothing if the post is gone.
    fn attach_comment(&self, comment: &Comment) -> impl Future<Output = Result<(), RepoError>> + Send;

    /// Appends `reply` to the embedded replies of a comment.
    fn append_reply(&self, comment_id: &str, reply: &Reply) -> impl Future<Output = Result<(), RepoError>> + Send;

    /// Moves the membership of `post_id` in one of the user's sets to
    /// `desired`, adjusting the like counter when the set is `Liked`.
    /// Validates both user and post.
    fn set_membership(
        &self,
        user_id: &str,
        post_id: &str,
        membership: Membership,
        desired: bool,
    ) -> impl Future<Output = Result<MembershipChange, RepoError>> + Send;

    /// Like [`DocumentStore::get`], but a missing document is a NotFound error.
    fn require<T: Document>(&self, id: &str) -> impl Future<Output = Result<T, RepoError>> + Send {
        async move {
            self.get::<T>(id)
                .await?
                .ok_or_else(|| RepoError::not_found(T::KIND, id))
        }
    }
}
