use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{
    errors::RepoError,
    models::{Comment, CommentView, Post, PostDetail, PublicUser, Reply, ReplyView, User},
    origin::ServingOrigin,
    store::DocumentStore,
};

/// Public profiles of every user a set of comments refers to, fetched in one
/// batch.
#[derive(Debug, Default)]
pub(crate) struct UserDirectory {
    users: HashMap<String, PublicUser>,
}

impl UserDirectory {
    pub(crate) async fn load<S: DocumentStore>(store: &S, comments: &[Comment]) -> Result<Self, RepoError> {
        let ids = referenced_user_ids(comments);
        if ids.is_empty() {
            return Ok(Self::default());
        }
        let users: Vec<User> = store.get_many(&ids).await?;
        log::debug!("resolved {} of {} referenced users", users.len(), ids.len());
        Ok(Self {
            users: users.into_iter().map(|user| (user.id.clone(), user.public())).collect(),
        })
    }

    pub(crate) fn lookup(&self, user_id: &str) -> Option<PublicUser> {
        self.users.get(user_id).cloned()
    }
}

/// Distinct user ids referenced by comments and their replies, first
/// occurrence first.
fn referenced_user_ids(comments: &[Comment]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for comment in comments {
        let authors = std::iter::once(&comment.user).chain(comment.replies.iter().map(|reply| &reply.user));
        for id in authors {
            if seen.insert(id.as_str()) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

/// Orders items newest-first. Items with equal timestamps keep reverse
/// insertion order, so the most recently appended one leads.
pub(crate) fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.reverse();
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    items
}

pub(crate) fn reply_view(reply: Reply, users: &UserDirectory) -> ReplyView {
    ReplyView {
        user: users.lookup(&reply.user),
        id: reply.id,
        content: reply.content,
        created_at: reply.created_at,
        updated_at: reply.updated_at,
    }
}

pub(crate) fn comment_view(comment: Comment, users: &UserDirectory) -> CommentView {
    let replies = newest_first(comment.replies, |reply| reply.created_at)
        .into_iter()
        .map(|reply| reply_view(reply, users))
        .collect();

    CommentView {
        user: users.lookup(&comment.user),
        id: comment.id,
        post: comment.post,
        content: comment.content,
        replies,
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

pub(crate) fn post_detail(post: Post, comments: Vec<CommentView>, origin: &ServingOrigin) -> PostDetail {
    PostDetail {
        image_url: origin.image_url(&post.image),
        id: post.id,
        title: post.title,
        content: post.content,
        reading_minutes: post.reading_minutes,
        slug: post.slug,
        tags: post.tags,
        comments,
        created_at: post.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    fn reply(id: &str, user: &str, minute: u32) -> Reply {
        Reply {
            id: id.to_string(),
            content: format!("reply {id}"),
            user: user.to_string(),
            created_at: at(minute),
            updated_at: at(minute),
        }
    }

    fn comment(id: &str, user: &str, replies: Vec<Reply>) -> Comment {
        Comment {
            id: id.to_string(),
            content: "hello".to_string(),
            user: user.to_string(),
            post: "p1".to_string(),
            replies,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    #[test]
    fn referenced_ids_are_distinct_in_first_seen_order() {
        let comments = vec![
            comment("c1", "ada", vec![reply("r1", "bob", 1), reply("r2", "ada", 2)]),
            comment("c2", "cy", vec![reply("r3", "bob", 3)]),
        ];
        assert_eq!(referenced_user_ids(&comments), ["ada", "bob", "cy"]);
    }

    #[test]
    fn newest_first_breaks_ties_by_latest_insertion() {
        let replies = vec![reply("old", "u", 1), reply("tie-a", "u", 5), reply("tie-b", "u", 5), reply("mid", "u", 3)];
        let ordered: Vec<_> = newest_first(replies, |r| r.created_at).into_iter().map(|r| r.id).collect();
        assert_eq!(ordered, ["tie-b", "tie-a", "mid", "old"]);
    }

    #[test]
    fn dangling_users_render_as_none() {
        let view = comment_view(comment("c1", "ghost", vec![reply("r1", "ghost", 1)]), &UserDirectory::default());
        assert!(view.user.is_none());
        assert!(view.replies[0].user.is_none());
    }
}
