//! Storage implementations for the identity directory and session bridge.
//!
//! - **Key-Value Store** (Redis) - Identity records, uniqueness guards, id counter
//! - **Session Store** (Redis) - Ephemeral session storage with TTL

pub mod key_value_redis;
pub mod session_redis;

// Re-exports
pub use key_value_redis::RedisKeyValueStore;
pub use session_redis::RedisSessionStore;
