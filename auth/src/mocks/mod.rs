//! Mock store implementations for testing.
//!
//! This module provides simple, in-memory implementations of the store traits
//! for use in unit and integration tests.

pub mod key_value;
pub mod session;

pub use key_value::MockKeyValueStore;
pub use session::MockSessionStore;
