//! The blog aggregate: posts, their comments and replies, and the like/save
//! memberships users hold on posts.
//!
//! [`BlogRepository`] is generic over the [`DocumentStore`] it runs on. Read
//! paths fetch documents and assemble views; every mutation that spans
//! documents is delegated to a single atomic store operation.

use chrono::Utc;

use crate::{
    errors::RepoError,
    id::generate_entity_id,
    models::{
        Comment, CommentView, Document, EngagementStatus, LikeOutcome, NewComment, NewReply, Post, PostDetail, PostPage,
        Reply, SaveOutcome, User,
    },
    origin::ServingOrigin,
    search::SearchParams,
    store::{DocumentStore, Membership, UniqueValue},
};

mod accounts;
mod population;
mod publishing;

pub use self::accounts::hash_password;
pub use self::publishing::{MAX_NUMBERED_SLUGS, normalize_tags, slug_candidates};

use self::population::{UserDirectory, comment_view, newest_first, post_detail};

/// Unique field claimed by every post.
pub const SLUG_FIELD: &str = "slug";

#[derive(Debug, Clone)]
pub struct BlogRepository<S> {
    store: S,
}

impl<S> BlogRepository<S>
where
    S: DocumentStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// One page of posts, newest first, optionally filtered by a
    /// case-insensitive title substring.
    pub async fn list_posts(&self, params: SearchParams, origin: &ServingOrigin) -> Result<PostPage, RepoError> {
        let result = self.store.search_posts(&params).await?;
        log::debug!(
            "listed page {} of posts ({} of {} matches)",
            result.page,
            result.items.len(),
            result.total
        );
        Ok(PostPage {
            count: result.total,
            posts: result.items.iter().map(|post| post.summary(origin)).collect(),
        })
    }

    /// The post with `slug`, its comments newest-first and every comment and
    /// reply author resolved to a public profile.
    pub async fn get_post_by_slug(&self, slug: &str, origin: &ServingOrigin) -> Result<PostDetail, RepoError> {
        let post: Post = self
            .store
            .find_unique(&UniqueValue::exact(SLUG_FIELD, slug))
            .await?
            .ok_or_else(|| RepoError::not_found(Post::KIND, slug))?;

        let comments: Vec<Comment> = self.store.get_many(&post.comments).await?;
        let users = UserDirectory::load(&self.store, &comments).await?;

        let comments = newest_first(comments, |comment| comment.created_at)
            .into_iter()
            .map(|comment| comment_view(comment, &users))
            .collect();

        Ok(post_detail(post, comments, origin))
    }

    /// Stores a comment on a post. Content is kept exactly as given.
    pub async fn add_comment(&self, input: NewComment) -> Result<CommentView, RepoError> {
        let user: User = self.store.require(&input.user).await?;

        let now = Utc::now();
        let comment = Comment {
            id: generate_entity_id(),
            content: input.content,
            user: user.id.clone(),
            post: input.post,
            replies: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.attach_comment(&comment).await?;
        log::debug!("comment {} attached to post {}", comment.id, comment.post);

        Ok(CommentView {
            id: comment.id,
            user: Some(user.public()),
            post: comment.post,
            content: comment.content,
            replies: Vec::new(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }

    /// Appends a reply and returns the whole comment, re-read after the
    /// write, with its author and every reply author populated.
    pub async fn add_reply(&self, input: NewReply) -> Result<CommentView, RepoError> {
        let user: User = self.store.require(&input.user).await?;

        let now = Utc::now();
        let reply = Reply {
            id: generate_entity_id(),
            content: input.content,
            user: user.id,
            created_at: now,
            updated_at: now,
        };
        self.store.append_reply(&input.comment, &reply).await?;
        log::debug!("reply {} appended to comment {}", reply.id, input.comment);

        let comment: Comment = self.store.require(&input.comment).await?;
        let users = UserDirectory::load(&self.store, std::slice::from_ref(&comment)).await?;
        Ok(comment_view(comment, &users))
    }

    pub async fn get_liked_and_saved(&self, post_id: &str, user_id: &str) -> Result<EngagementStatus, RepoError> {
        let user: User = self.store.require(user_id).await?;
        let post: Post = self.store.require(post_id).await?;
        Ok(EngagementStatus {
            is_liked: user.has_liked(&post.id),
            is_saved: user.has_saved(&post.id),
            likes: post.likes,
        })
    }

    /// Moves the user's like on the post to `is_liked`. Repeating the same
    /// target is a no-op; the counter never drops below zero.
    pub async fn set_like(&self, post_id: &str, user_id: &str, is_liked: bool) -> Result<LikeOutcome, RepoError> {
        let change = self
            .store
            .set_membership(user_id, post_id, Membership::Liked, is_liked)
            .await?;
        log::debug!(
            "like of post {post_id} by {user_id} -> {is_liked} (changed: {})",
            change.changed
        );
        Ok(LikeOutcome {
            is_liked: change.is_member,
            likes: change.likes.unwrap_or(0),
        })
    }

    pub async fn set_save(&self, post_id: &str, user_id: &str, is_saved: bool) -> Result<SaveOutcome, RepoError> {
        let change = self
            .store
            .set_membership(user_id, post_id, Membership::Saved, is_saved)
            .await?;
        log::debug!(
            "save of post {post_id} by {user_id} -> {is_saved} (changed: {})",
            change.changed
        );
        Ok(SaveOutcome {
            is_saved: change.is_member,
        })
    }

    /// Posts the user has saved, newest first. Saved ids whose post no
    /// longer resolves are skipped.
    pub async fn saved_posts(&self, user_id: &str, origin: &ServingOrigin) -> Result<PostPage, RepoError> {
        let user: User = self.store.require(user_id).await?;
        let posts: Vec<Post> = self.store.get_many(&user.saved_posts).await?;
        let posts = newest_first(posts, |post| post.created_at);
        Ok(PostPage {
            count: posts.len() as u64,
            posts: posts.iter().map(|post| post.summary(origin)).collect(),
        })
    }
}
