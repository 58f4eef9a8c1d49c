use serde::Serialize;

/// Payload of one script invocation. Each variant is serialized to JSON and
/// handed to its Lua script as `ARGV[1]`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ScriptCommand {
    InsertDocument(InsertDocumentCommand),
    AttachComment(AttachCommentCommand),
    AppendReply(AppendReplyCommand),
    SetMembership(SetMembershipCommand),
}

impl ScriptCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            ScriptCommand::InsertDocument(_) => "insert_document",
            ScriptCommand::AttachComment(_) => "attach_comment",
            ScriptCommand::AppendReply(_) => "append_reply",
            ScriptCommand::SetMembership(_) => "set_membership",
        }
    }
}

/// A unique value a document claims when it is inserted.
#[derive(Debug, Clone, Serialize)]
pub struct UniqueClaim {
    pub key: String,
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InsertDocumentCommand {
    pub entity_key: String,
    pub entity_id: String,
    /// The document as a JSON string, mirrors included.
    pub document: String,
    pub unique: Vec<UniqueClaim>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachCommentCommand {
    pub comment_key: String,
    pub comment_id: String,
    pub post_key: String,
    pub post_id: String,
    pub document: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppendReplyCommand {
    pub comment_key: String,
    pub comment_id: String,
    pub reply: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetMembershipCommand {
    pub user_key: String,
    pub user_id: String,
    pub post_key: String,
    pub post_id: String,
    pub field: &'static str,
    pub desired: bool,
    pub count_likes: bool,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn membership_payload_matches_script_fields() {
        let command = ScriptCommand::SetMembership(SetMembershipCommand {
            user_key: "q:b:users:u1".into(),
            user_id: "u1".into(),
            post_key: "q:b:posts:p1".into(),
            post_id: "p1".into(),
            field: "likedPosts",
            desired: true,
            count_likes: true,
            updated_at: "2024-01-01T00:00:00Z".into(),
        });
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["field"], json!("likedPosts"));
        assert_eq!(value["count_likes"], json!(true));
        assert_eq!(command.name(), "set_membership");
    }

    #[test]
    fn insert_payload_serializes_empty_claims_as_array() {
        let command = ScriptCommand::InsertDocument(InsertDocumentCommand {
            entity_key: "q:b:comments:c1".into(),
            entity_id: "c1".into(),
            document: "{}".into(),
            unique: Vec::new(),
        });
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(value["unique"], json!([]));
    }
}
