use chrono::{SecondsFormat, Utc};
use redis::{aio::ConnectionManager, cmd};
use serde_json::Value;

use super::{DocumentStore, Membership, MembershipChange, UniqueValue};
use crate::{
    errors::RepoError,
    keys::KeyContext,
    models::{Comment, Document, Post, Reply, User},
    runtime::{
        RedisExecutor,
        commands::{
            AppendReplyCommand, AttachCommentCommand, InsertDocumentCommand, ScriptCommand, SetMembershipCommand,
            UniqueClaim,
        },
    },
    search::{self, IndexDefinition, POST_INDEX_SCHEMA, SearchParams, SearchResult},
};

const SCAN_COUNT: usize = 1000;
const MGET_CHUNK: usize = 200;

/// Document store backed by Redis with the RedisJSON and RediSearch modules.
///
/// Documents live at `prefix:service:collection:id`. Multi-document
/// mutations run as Lua scripts so they apply atomically.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
    service: String,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
            service: service.into(),
        }
    }

    /// Opens a managed connection and makes sure the post index exists.
    pub async fn connect(url: &str, prefix: &str, service: &str) -> Result<Self, RepoError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let store = Self::new(conn, prefix, service);
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix, &self.service)
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }

    fn post_index(&self) -> IndexDefinition {
        let keys = self.keys();
        IndexDefinition {
            name: keys.index(Post::COLLECTION),
            prefixes: vec![keys.collection_prefix(Post::COLLECTION)],
            schema: POST_INDEX_SCHEMA,
        }
    }

    pub async fn ensure_indexes(&self) -> Result<(), RepoError> {
        let mut conn = self.conn.clone();
        search::ensure_index(&mut conn, &self.post_index()).await
    }

    /// Deletes every key under this store's `prefix:service` namespace and
    /// drops the post index. Returns the number of keys removed.
    pub async fn flush_namespace(&self) -> Result<u64, RepoError> {
        let mut conn = self.conn.clone();
        let index = self.keys().index(Post::COLLECTION);
        if let Err(err) = cmd("FT.DROPINDEX").arg(&index).query_async::<()>(&mut conn).await {
            log::debug!("dropping index {index}: {err}");
        }

        let pattern = format!("{}:{}:*", self.prefix, self.service);
        let mut cursor: u64 = 0;
        let mut total_deleted: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let deleted: u64 = cmd("DEL").arg(&keys).query_async(&mut conn).await?;
                total_deleted += deleted;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(total_deleted)
    }

    async fn scan_collection(&self, collection: &str) -> Result<Vec<String>, RepoError> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", self.keys().collection_prefix(collection));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn mget<T: Document>(&self, keys: &[String]) -> Result<Vec<T>, RepoError> {
        let mut conn = self.conn.clone();
        let mut documents = Vec::with_capacity(keys.len());
        for chunk in keys.chunks(MGET_CHUNK) {
            let raw: Vec<Option<String>> = cmd("JSON.MGET").arg(chunk).arg("$").query_async(&mut conn).await?;
            for payload in raw.into_iter().flatten() {
                if let Some(document) = decode_path_payload::<T>(&payload)? {
                    documents.push(document);
                }
            }
        }
        Ok(documents)
    }

    async fn run(&self, command: ScriptCommand) -> Result<crate::runtime::ScriptReply, RepoError> {
        let mut conn = self.conn.clone();
        let mut executor = RedisExecutor::new(&mut conn);
        executor.execute(command).await
    }
}

/// `$`-path replies wrap the document in a one-element array.
fn decode_path_payload<T: Document>(payload: &str) -> Result<Option<T>, RepoError> {
    let value: Value = serde_json::from_str(payload)?;
    let document = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) => return Ok(None),
        other => other,
    };
    Ok(Some(serde_json::from_value(document)?))
}

/// Serializes a document with its index mirrors merged in.
fn encode_document<T: Document>(document: &T) -> Result<String, RepoError> {
    let mut value = serde_json::to_value(document)?;
    if let Some(object) = value.as_object_mut() {
        for (field, mirror) in document.index_mirrors() {
            object.insert(field.to_string(), mirror);
        }
    }
    Ok(serde_json::to_string(&value)?)
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

impl DocumentStore for RedisStore {
    async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, RepoError> {
        let mut conn = self.conn.clone();
        let key = self.keys().entity(T::COLLECTION, id);
        let raw: Option<String> = cmd("JSON.GET").arg(&key).query_async(&mut conn).await?;
        raw.map(|payload| serde_json::from_str(&payload).map_err(RepoError::from))
            .transpose()
    }

    async fn get_many<T: Document>(&self, ids: &[String]) -> Result<Vec<T>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys = self.keys();
        let keys: Vec<String> = ids.iter().map(|id| keys.entity(T::COLLECTION, id)).collect();
        self.mget(&keys).await
    }

    async fn list_all<T: Document>(&self) -> Result<Vec<T>, RepoError> {
        let keys = self.scan_collection(T::COLLECTION).await?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        self.mget(&keys).await
    }

    async fn find_unique<T: Document>(&self, key: &UniqueValue) -> Result<Option<T>, RepoError> {
        let mut conn = self.conn.clone();
        let claim = self.keys().unique(T::COLLECTION, key.field, &key.value);
        let owner: Option<String> = cmd("GET").arg(&claim).query_async(&mut conn).await?;
        match owner {
            Some(id) => self.get(&id).await,
            None => Ok(None),
        }
    }

    async fn insert<T: Document>(&self, document: &T, unique: &[UniqueValue]) -> Result<(), RepoError> {
        let keys = self.keys();
        let command = InsertDocumentCommand {
            entity_key: keys.entity(T::COLLECTION, document.id()),
            entity_id: document.id().to_string(),
            document: encode_document(document)?,
            unique: unique
                .iter()
                .map(|claim| UniqueClaim {
                    key: keys.unique(T::COLLECTION, claim.field, &claim.value),
                    field: claim.field.to_string(),
                    value: claim.value.clone(),
                })
                .collect(),
        };
        self.run(ScriptCommand::InsertDocument(command)).await?;
        Ok(())
    }

    async fn search_posts(&self, params: &SearchParams) -> Result<SearchResult<Post>, RepoError> {
        let mut conn = self.conn.clone();
        let index = self.keys().index(Post::COLLECTION);
        search::execute_search(&mut conn, &index, params).await
    }

    async fn attach_comment(&self, comment: &Comment) -> Result<(), RepoError> {
        let keys = self.keys();
        let command = AttachCommentCommand {
            comment_key: keys.entity(Comment::COLLECTION, &comment.id),
            comment_id: comment.id.clone(),
            post_key: keys.entity(Post::COLLECTION, &comment.post),
            post_id: comment.post.clone(),
            document: encode_document(comment)?,
            updated_at: timestamp(),
        };
        self.run(ScriptCommand::AttachComment(command)).await?;
        Ok(())
    }

    async fn append_reply(&self, comment_id: &str, reply: &Reply) -> Result<(), RepoError> {
        let command = AppendReplyCommand {
            comment_key: self.keys().entity(Comment::COLLECTION, comment_id),
            comment_id: comment_id.to_string(),
            reply: serde_json::to_string(reply)?,
            updated_at: timestamp(),
        };
        self.run(ScriptCommand::AppendReply(command)).await?;
        Ok(())
    }

    async fn set_membership(
        &self,
        user_id: &str,
        post_id: &str,
        membership: Membership,
        desired: bool,
    ) -> Result<MembershipChange, RepoError> {
        let keys = self.keys();
        let command = SetMembershipCommand {
            user_key: keys.entity(User::COLLECTION, user_id),
            user_id: user_id.to_string(),
            post_key: keys.entity(Post::COLLECTION, post_id),
            post_id: post_id.to_string(),
            field: membership.field(),
            desired,
            count_likes: membership.counts_likes(),
            updated_at: timestamp(),
        };
        let reply = self.run(ScriptCommand::SetMembership(command)).await?;
        Ok(MembershipChange {
            is_member: reply.bool_field("is_member"),
            changed: reply.bool_field("changed"),
            likes: reply.u64_field("likes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn path_payload_unwraps_single_element_array() {
        let payload = r#"[{"id":"c1","name":"Rust","slug":"rust","createdAt":"2024-01-01T00:00:00Z"}]"#;
        let category: Category = decode_path_payload(payload).unwrap().unwrap();
        assert_eq!(category.id, "c1");
        assert!(decode_path_payload::<Category>("[]").unwrap().is_none());
    }

    #[test]
    fn encoded_posts_carry_index_mirrors() {
        let now = Utc::now();
        let post = Post {
            id: "p1".into(),
            title: "Hello World".into(),
            content: String::new(),
            slug: "hello-world".into(),
            reading_minutes: 3,
            tags: Vec::new(),
            categories: Vec::new(),
            image: "uploads/a.png".into(),
            author: None,
            likes: 0,
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let encoded: Value = serde_json::from_str(&encode_document(&post).unwrap()).unwrap();
        assert_eq!(encoded["titleFolded"], "hello world");
        assert_eq!(encoded["createdAtMs"], now.timestamp_millis());
        assert_eq!(encoded["slug"], "hello-world");
    }
}
