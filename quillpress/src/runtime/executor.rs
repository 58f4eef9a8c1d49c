use std::borrow::Cow;

use redis::aio::ConnectionLike;
use serde_json::Value;

use crate::{
    errors::{EntityKind, RepoError},
    runtime::{
        commands::ScriptCommand,
        scripts::{APPEND_REPLY_SCRIPT, ATTACH_COMMENT_SCRIPT, INSERT_DOCUMENT_SCRIPT, SET_MEMBERSHIP_SCRIPT},
    },
};

/// Successful script reply; the JSON object the script returned.
#[derive(Debug, Clone)]
pub struct ScriptReply(pub Value);

impl ScriptReply {
    pub fn bool_field(&self, name: &str) -> bool {
        self.0.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn u64_field(&self, name: &str) -> Option<u64> {
        let value = self.0.get(name)?;
        // Lua numbers come back as floats when they pass through cjson.
        value.as_u64().or_else(|| value.as_f64().map(|n| n.max(0.0) as u64))
    }
}

pub async fn execute_script<C>(conn: &mut C, command: &ScriptCommand) -> Result<ScriptReply, RepoError>
where
    C: ConnectionLike + Send,
{
    let script = match command {
        ScriptCommand::InsertDocument(_) => &*INSERT_DOCUMENT_SCRIPT,
        ScriptCommand::AttachComment(_) => &*ATTACH_COMMENT_SCRIPT,
        ScriptCommand::AppendReply(_) => &*APPEND_REPLY_SCRIPT,
        ScriptCommand::SetMembership(_) => &*SET_MEMBERSHIP_SCRIPT,
    };

    let payload = serde_json::to_string(command).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to serialize command: {err}")),
    })?;

    log::debug!("running {} script", command.name());

    let mut invocation = script.prepare_invoke();
    invocation.arg(payload);
    let raw: String = invocation.invoke_async(conn).await.map_err(RepoError::from)?;

    let value: Value = serde_json::from_str(&raw).map_err(|err| RepoError::Other {
        message: Cow::Owned(format!("failed to parse lua response: {err}")),
    })?;

    decode_reply(value)
}

/// Maps the `error` codes the scripts emit onto `RepoError`.
pub fn decode_reply(value: Value) -> Result<ScriptReply, RepoError> {
    if value.get("error").is_none() {
        return Ok(ScriptReply(value));
    }

    let Some(code) = value["error"].as_str() else {
        return Err(RepoError::other("lua_error"));
    };

    let entity_id = value.get("entity_id").and_then(|v| v.as_str()).map(|s| s.to_string());
    match code {
        "entity_not_found" => {
            let entity = value
                .get("entity")
                .and_then(|v| v.as_str())
                .and_then(EntityKind::from_tag)
                .ok_or_else(|| RepoError::other("entity_not_found without a known entity"))?;
            Err(RepoError::NotFound { entity, entity_id })
        }
        "entity_exists" => Err(RepoError::InvalidRequest {
            message: format!("document {} already exists", entity_id.unwrap_or_default()),
        }),
        "unique_constraint_violation" => {
            let strings = |name: &str| -> Vec<String> {
                value
                    .get(name)
                    .and_then(|v| v.as_array())
                    .map(|arr| {
                        arr.iter()
                            .map(|v| match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            };
            let existing_entity_id = value
                .get("existing_entity_id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_default();
            Err(RepoError::UniqueConstraintViolation {
                fields: strings("fields"),
                values: strings("values"),
                existing_entity_id,
            })
        }
        other => Err(RepoError::Other {
            message: Cow::Owned(other.to_string()),
        }),
    }
}

/// Runs script commands on a borrowed connection.
pub struct RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    connection: &'a mut C,
}

impl<'a, C> RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    pub fn new(connection: &'a mut C) -> Self {
        Self { connection }
    }

    pub async fn execute(&mut self, command: ScriptCommand) -> Result<ScriptReply, RepoError> {
        execute_script(self.connection, &command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_reply_names_entity() {
        let err = decode_reply(json!({"error": "entity_not_found", "entity": "post", "entity_id": "p9"})).unwrap_err();
        match err {
            RepoError::NotFound { entity, entity_id } => {
                assert_eq!(entity, EntityKind::Post);
                assert_eq!(entity_id.as_deref(), Some("p9"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unique_violation_reply_is_decoded() {
        let err = decode_reply(json!({
            "error": "unique_constraint_violation",
            "fields": ["userName"],
            "values": ["ada"],
            "existing_entity_id": "u1"
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            RepoError::UniqueConstraintViolation { ref fields, ref existing_entity_id, .. }
                if fields == &vec!["userName".to_string()] && existing_entity_id == "u1"
        ));
    }

    #[test]
    fn membership_reply_reads_float_counters() {
        let reply = decode_reply(json!({"is_member": true, "changed": true, "likes": 3.0})).unwrap();
        assert!(reply.bool_field("is_member"));
        assert_eq!(reply.u64_field("likes"), Some(3));
        assert_eq!(reply.u64_field("missing"), None);
    }
}
