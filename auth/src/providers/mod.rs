//! Store capabilities and provider integrations.
//!
//! This module defines traits for the external stores the identity directory
//! and the session bridge depend on. Concrete handles are injected by the
//! application, never looked up from globals.
//!
//! - **Testing**: Use mocks (in-memory, deterministic)
//! - **Production**: Use the Redis stores in [`crate::stores`]

pub mod key_value;
pub mod profile;
pub mod session;

// Re-export provider traits
pub use key_value::{GuardedWrite, KeyValueStore};
pub use session::SessionStore;
