//! QuillPress core library.
//!
//! Blog posts, threaded comments and per-user likes and saves over a
//! document store. [`BlogRepository`] holds the operations; [`api::router`]
//! exposes them over HTTP; [`RedisStore`] and [`MemoryStore`] are the two
//! storage backends.

pub mod api;
pub mod config;
pub mod errors;
pub mod id;
pub mod keys;
pub mod models;
pub mod origin;
pub mod repository;
pub mod runtime;
pub mod search;
pub mod store;
pub mod validators;

pub use errors::*;
pub use models::*;
pub use origin::ServingOrigin;
pub use repository::BlogRepository;
pub use search::{PostQuery, SearchParams, SearchResult};
pub use store::{DocumentStore, MemoryStore, Membership, MembershipChange, RedisStore, UniqueValue};

// Re-export redis so callers can build connections without pinning a version.
pub use redis;
pub use redis::aio::ConnectionManager;
