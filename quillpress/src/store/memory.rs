use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{DocumentStore, Membership, MembershipChange, UniqueValue};
use crate::{
    errors::{EntityKind, RepoError},
    models::{Comment, Document, Post, Reply, User},
    search::{SearchParams, SearchResult},
};

#[derive(Debug, Default)]
struct MemoryState {
    /// Documents by collection, then id.
    collections: HashMap<&'static str, BTreeMap<String, Value>>,
    /// `collection:field:value` -> owning document id.
    unique: HashMap<String, String>,
}

impl MemoryState {
    fn collection(&self, name: &str) -> Option<&BTreeMap<String, Value>> {
        self.collections.get(name)
    }

    fn document(&self, collection: &str, id: &str) -> Option<&Value> {
        self.collection(collection).and_then(|docs| docs.get(id))
    }

    fn document_mut(&mut self, collection: &str, id: &str) -> Option<&mut Value> {
        self.collections.get_mut(collection).and_then(|docs| docs.get_mut(id))
    }

    fn contains(&self, collection: &str, id: &str) -> bool {
        self.document(collection, id).is_some()
    }
}

fn unique_slot(collection: &str, key: &UniqueValue) -> String {
    format!("{}:{}:{}", collection, key.field, key.value)
}

fn decode<T: Document>(value: &Value) -> Result<T, RepoError> {
    Ok(serde_json::from_value(value.clone())?)
}

fn array_field<'a>(document: &'a mut Value, field: &str) -> Result<&'a mut Vec<Value>, RepoError> {
    let object = document
        .as_object_mut()
        .ok_or_else(|| RepoError::other("stored document is not an object"))?;
    object
        .entry(field)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| RepoError::other(format!("field {field} is not an array")))
}

fn touch(document: &mut Value) {
    if let Some(object) = document.as_object_mut() {
        object.insert("updatedAt".to_string(), serde_json::json!(Utc::now()));
    }
}

/// In-process document store.
///
/// A single `RwLock` guards every collection, so each mutation observes and
/// changes all the documents it touches without interleaving.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection.
    pub async fn count<T: Document>(&self) -> usize {
        let state = self.state.read().await;
        state.collection(T::COLLECTION).map_or(0, BTreeMap::len)
    }
}

impl DocumentStore for MemoryStore {
    async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, RepoError> {
        let state = self.state.read().await;
        state.document(T::COLLECTION, id).map(decode::<T>).transpose()
    }

    async fn get_many<T: Document>(&self, ids: &[String]) -> Result<Vec<T>, RepoError> {
        let state = self.state.read().await;
        ids.iter()
            .filter_map(|id| state.document(T::COLLECTION, id))
            .map(decode::<T>)
            .collect()
    }

    async fn list_all<T: Document>(&self) -> Result<Vec<T>, RepoError> {
        let state = self.state.read().await;
        match state.collection(T::COLLECTION) {
            Some(documents) => documents.values().map(decode::<T>).collect(),
            None => Ok(Vec::new()),
        }
    }

    async fn find_unique<T: Document>(&self, key: &UniqueValue) -> Result<Option<T>, RepoError> {
        let state = self.state.read().await;
        let Some(id) = state.unique.get(&unique_slot(T::COLLECTION, key)) else {
            return Ok(None);
        };
        state.document(T::COLLECTION, id).map(decode::<T>).transpose()
    }

    async fn insert<T: Document>(&self, document: &T, unique: &[UniqueValue]) -> Result<(), RepoError> {
        let value = serde_json::to_value(document)?;
        let mut state = self.state.write().await;

        for key in unique {
            if let Some(owner) = state.unique.get(&unique_slot(T::COLLECTION, key))
                && owner != document.id()
            {
                return Err(RepoError::UniqueConstraintViolation {
                    fields: vec![key.field.to_string()],
                    values: vec![key.value.clone()],
                    existing_entity_id: owner.clone(),
                });
            }
        }
        if state.contains(T::COLLECTION, document.id()) {
            return Err(RepoError::InvalidRequest {
                message: format!("document {} already exists", document.id()),
            });
        }

        state
            .collections
            .entry(T::COLLECTION)
            .or_default()
            .insert(document.id().to_string(), value);
        for key in unique {
            state
                .unique
                .insert(unique_slot(T::COLLECTION, key), document.id().to_string());
        }
        Ok(())
    }

    async fn search_posts(&self, params: &SearchParams) -> Result<SearchResult<Post>, RepoError> {
        let mut posts: Vec<Post> = self
            .list_all::<Post>()
            .await?
            .into_iter()
            .filter(|post| params.matches_title(&post.title))
            .collect();

        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = posts.len() as u64;
        let offset = usize::try_from(params.offset()).unwrap_or(usize::MAX);
        let items = posts
            .into_iter()
            .skip(offset)
            .take(params.page_size as usize)
            .collect();

        Ok(SearchResult {
            items,
            total,
            page: params.page,
            page_size: params.page_size,
        })
    }

    async fn attach_comment(&self, comment: &Comment) -> Result<(), RepoError> {
        let value = serde_json::to_value(comment)?;
        let mut state = self.state.write().await;

        let post = state
            .document_mut(Post::COLLECTION, &comment.post)
            .ok_or_else(|| RepoError::not_found(EntityKind::Post, comment.post.clone()))?;
        array_field(post, "comments")?.push(Value::String(comment.id.clone()));
        touch(post);

        state
            .collections
            .entry(Comment::COLLECTION)
            .or_default()
            .insert(comment.id.clone(), value);
        Ok(())
    }

    async fn append_reply(&self, comment_id: &str, reply: &Reply) -> Result<(), RepoError> {
        let value = serde_json::to_value(reply)?;
        let mut state = self.state.write().await;

        let comment = state
            .document_mut(Comment::COLLECTION, comment_id)
            .ok_or_else(|| RepoError::not_found(EntityKind::Comment, comment_id))?;
        array_field(comment, "replies")?.push(value);
        touch(comment);
        Ok(())
    }

    async fn set_membership(
        &self,
        user_id: &str,
        post_id: &str,
        membership: Membership,
        desired: bool,
    ) -> Result<MembershipChange, RepoError> {
        let mut state = self.state.write().await;

        if !state.contains(User::COLLECTION, user_id) {
            return Err(RepoError::not_found(EntityKind::User, user_id));
        }
        if !state.contains(Post::COLLECTION, post_id) {
            return Err(RepoError::not_found(EntityKind::Post, post_id));
        }

        let changed = {
            let user = state
                .document_mut(User::COLLECTION, user_id)
                .ok_or_else(|| RepoError::not_found(EntityKind::User, user_id))?;
            let set = array_field(user, membership.field())?;
            let position = set.iter().position(|id| id.as_str() == Some(post_id));
            let changed = match (desired, position) {
                (true, None) => {
                    set.push(Value::String(post_id.to_string()));
                    true
                }
                (false, Some(index)) => {
                    set.remove(index);
                    true
                }
                _ => false,
            };
            if changed {
                touch(user);
            }
            changed
        };

        let likes = if membership.counts_likes() {
            let post = state
                .document_mut(Post::COLLECTION, post_id)
                .ok_or_else(|| RepoError::not_found(EntityKind::Post, post_id))?;
            let current = post.get("likes").and_then(Value::as_u64).unwrap_or(0);
            let next = match (changed, desired) {
                (true, true) => current + 1,
                (true, false) => current.saturating_sub(1),
                (false, _) => current,
            };
            if let Some(object) = post.as_object_mut() {
                object.insert("likes".to_string(), Value::from(next));
            }
            Some(next)
        } else {
            None
        };

        Ok(MembershipChange {
            is_member: desired,
            changed,
            likes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::Utc;

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.to_string(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = MemoryStore::new();
        store.insert(&category("c1", "Rust"), &[]).await.unwrap();
        let fetched: Category = store.get("c1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Rust");
        assert!(store.get::<Category>("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unique_claims_reject_second_owner() {
        let store = MemoryStore::new();
        let claim = UniqueValue::case_insensitive("name", "Rust");
        store.insert(&category("c1", "Rust"), &[claim.clone()]).await.unwrap();

        let err = store
            .insert(&category("c2", "rust"), &[UniqueValue::case_insensitive("name", "rust")])
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UniqueConstraintViolation { ref existing_entity_id, .. } if existing_entity_id == "c1"));
        assert_eq!(store.count::<Category>().await, 1);

        let found: Category = store.find_unique(&claim).await.unwrap().unwrap();
        assert_eq!(found.id, "c1");
    }

    #[tokio::test]
    async fn get_many_preserves_order_and_skips_missing() {
        let store = MemoryStore::new();
        store.insert(&category("a", "A"), &[]).await.unwrap();
        store.insert(&category("b", "B"), &[]).await.unwrap();
        let ids = vec!["b".to_string(), "missing".to_string(), "a".to_string()];
        let found: Vec<Category> = store.get_many(&ids).await.unwrap();
        let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[tokio::test]
    async fn membership_requires_user_and_post() {
        let store = MemoryStore::new();
        let err = store
            .set_membership("ghost", "post", Membership::Saved, true)
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::NotFound { entity: EntityKind::User, .. }));
    }
}
