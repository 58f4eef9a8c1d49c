use redis::Script;
use std::sync::LazyLock;

pub const INSERT_DOCUMENT_SCRIPT_BODY: &str = include_str!("../../lua/insert_document.lua");
pub const ATTACH_COMMENT_SCRIPT_BODY: &str = include_str!("../../lua/attach_comment.lua");
pub const APPEND_REPLY_SCRIPT_BODY: &str = include_str!("../../lua/append_reply.lua");
pub const SET_MEMBERSHIP_SCRIPT_BODY: &str = include_str!("../../lua/set_membership.lua");

pub static INSERT_DOCUMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(INSERT_DOCUMENT_SCRIPT_BODY));
pub static ATTACH_COMMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(ATTACH_COMMENT_SCRIPT_BODY));
pub static APPEND_REPLY_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(APPEND_REPLY_SCRIPT_BODY));
pub static SET_MEMBERSHIP_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(SET_MEMBERSHIP_SCRIPT_BODY));
