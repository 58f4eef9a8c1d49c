//! Server-side scripts for the mutations that touch more than one document.

pub mod commands;
pub mod executor;
pub mod scripts;

pub use executor::{RedisExecutor, ScriptReply, execute_script};
