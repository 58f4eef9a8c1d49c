//! Redis-backed store tests.
//!
//! These need a Redis Stack server (RedisJSON + RediSearch). Point `REDIS_URL`
//! at it and run with `cargo test -- --ignored`. Every test works in its own
//! key prefix and flushes it afterwards.

use chrono::{Duration, Utc};
use quillpress::{
    BlogRepository, Comment, DocumentStore, EntityKind, NewComment, NewPost, NewReply, Post, RedisStore, RepoError,
    SearchParams, ServingOrigin, User, id::generate_entity_id,
};

// ============ Helpers ============

async fn test_store() -> RedisStore {
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let prefix = format!("quill_test_{}", generate_entity_id().to_lowercase());
    RedisStore::connect(&redis_url, &prefix, "blog")
        .await
        .expect("connect to redis")
}

fn origin() -> ServingOrigin {
    ServingOrigin::new("http", "localhost:5000")
}

async fn seed_user(store: &RedisStore, user_name: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: generate_entity_id(),
        first_name: "Test".to_string(),
        last_name: "Reader".to_string(),
        user_name: user_name.to_string(),
        email: format!("{user_name}@example.com"),
        avatar: None,
        password_hash: "unused".to_string(),
        liked_posts: Vec::new(),
        saved_posts: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    store.insert(&user, &[]).await.expect("insert user");
    user
}

fn new_post(title: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: "<p>body</p>".to_string(),
        reading_minutes: 2,
        tags: vec!["redis".to_string()],
        categories: Vec::new(),
        image: "uploads/cover.png".to_string(),
        author: None,
    }
}

// ============ Posts ============

#[tokio::test]
#[ignore = "requires Redis Stack; set REDIS_URL"]
async fn search_filters_pages_and_sorts() {
    let store = test_store().await;
    let base = Utc::now() - Duration::hours(1);
    for i in 0..12 {
        let created_at = base + Duration::minutes(i);
        let title = if i % 2 == 0 { format!("Redis tip {i}") } else { format!("Other note {i}") };
        let post = Post {
            id: generate_entity_id(),
            slug: quillpress::validators::slugify(&title),
            title,
            content: String::new(),
            reading_minutes: 1,
            tags: Vec::new(),
            categories: Vec::new(),
            image: "uploads/x.png".to_string(),
            author: None,
            likes: 0,
            comments: Vec::new(),
            created_at,
            updated_at: created_at,
        };
        store.insert(&post, &[]).await.expect("insert post");
    }

    let all = store.search_posts(&SearchParams::new().with_page(1, 10)).await.expect("search");
    assert_eq!(all.total, 12);
    assert_eq!(all.items.len(), 10);
    assert!(all.items.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));

    let filtered = store
        .search_posts(&SearchParams::new().with_title_contains("REDIS"))
        .await
        .expect("search");
    assert_eq!(filtered.total, 6);
    assert_eq!(filtered.items[0].title, "Redis tip 10");

    let beyond_window = store
        .search_posts(&SearchParams::new().with_page(i64::MAX as u64, 10))
        .await
        .expect("search past the result window");
    assert_eq!(beyond_window.total, 12);
    assert!(beyond_window.items.is_empty());

    store.flush_namespace().await.expect("cleanup");
}

#[tokio::test]
#[ignore = "requires Redis Stack; set REDIS_URL"]
async fn slug_claims_are_enforced_by_redis() {
    let store = test_store().await;
    let repository = BlogRepository::new(store.clone());

    let first = repository.create_post(new_post("Same title"), &origin()).await.expect("first");
    let second = repository.create_post(new_post("Same title"), &origin()).await.expect("second");
    assert_eq!(first.slug, "same-title");
    assert_eq!(second.slug, "same-title-2");

    let detail = repository.get_post_by_slug("same-title-2", &origin()).await.expect("detail");
    assert_eq!(detail.id, second.id);

    store.flush_namespace().await.expect("cleanup");
}

// ============ Discussion ============

#[tokio::test]
#[ignore = "requires Redis Stack; set REDIS_URL"]
async fn comments_and_replies_persist_atomically() {
    let store = test_store().await;
    let repository = BlogRepository::new(store.clone());
    let ada = seed_user(&store, "ada").await;
    let post = repository.create_post(new_post("Threaded"), &origin()).await.expect("post");

    let comment = repository
        .add_comment(NewComment {
            user: ada.id.clone(),
            post: post.id.clone(),
            content: "hello".to_string(),
        })
        .await
        .expect("comment");
    let view = repository
        .add_reply(NewReply {
            user: ada.id.clone(),
            comment: comment.id.clone(),
            content: "hi back".to_string(),
        })
        .await
        .expect("reply");
    assert_eq!(view.replies.len(), 1);

    let stored: Post = store.require(&post.id).await.expect("post");
    assert_eq!(stored.comments, vec![comment.id.clone()]);

    let err = repository
        .add_comment(NewComment {
            user: ada.id.clone(),
            post: "missing".to_string(),
            content: "lost".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: EntityKind::Post, .. }));
    let comments: Vec<Comment> = store.list_all().await.expect("list comments");
    assert_eq!(comments.len(), 1);

    store.flush_namespace().await.expect("cleanup");
}

// ============ Engagement ============

#[tokio::test]
#[ignore = "requires Redis Stack; set REDIS_URL"]
async fn like_counter_is_idempotent_and_floored() {
    let store = test_store().await;
    let repository = BlogRepository::new(store.clone());
    let ada = seed_user(&store, "ada").await;
    let post = repository.create_post(new_post("Counted"), &origin()).await.expect("post");

    assert_eq!(repository.set_like(&post.id, &ada.id, false).await.expect("unlike").likes, 0);
    assert_eq!(repository.set_like(&post.id, &ada.id, true).await.expect("like").likes, 1);
    assert_eq!(repository.set_like(&post.id, &ada.id, true).await.expect("like again").likes, 1);
    repository.set_save(&post.id, &ada.id, true).await.expect("save");

    let status = repository.get_liked_and_saved(&post.id, &ada.id).await.expect("status");
    assert!(status.is_liked && status.is_saved);
    assert_eq!(status.likes, 1);

    let err = repository.set_save("missing", &ada.id, true).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: EntityKind::Post, .. }));

    store.flush_namespace().await.expect("cleanup");
}
