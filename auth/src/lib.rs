//! # SocialApp Identity Directory
//!
//! This crate maps third-party provider accounts (GitHub, Twitter) to
//! internally issued identities and application credentials, and defines the
//! session store shared between the conventional request layer and the
//! real-time handshake bridge.
//!
//! ## Features
//!
//! - **Atomic creation**: one record per provider account, across processes
//! - **Opaque credentials**: random secrets, stored only as Argon2id hashes
//! - **Injected stores**: Redis in production, in-memory mocks in tests
//! - **Tri-state lookups**: `Ok(Some)`, `Ok(None)`, or a classified error
//!
//! ## Architecture
//!
//! ```text
//! provider login → IdentityDirectory::login → find_or_create
//!                        │
//!                        ▼
//!                  KeyValueStore  (INCR ids, guarded create, SCAN lookups)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use socialapp_auth::stores::RedisKeyValueStore;
//! use socialapp_auth::{DirectoryConfig, IdentityDirectory, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedisKeyValueStore::new("redis://127.0.0.1:6379/0").await?;
//! let directory = IdentityDirectory::new(store, DirectoryConfig::default());
//!
//! let profile = serde_json::json!({ "id": 123445, "login": "jedi4ever" });
//! let identity = directory.login(Provider::GitHub, &profile).await?;
//! println!("internal id {}", identity.record().internal_id);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod keyspace;
pub mod providers;
pub mod state;
pub mod stores;

// Mock providers for testing
#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

// Re-export main types for convenience
pub use config::DirectoryConfig;
pub use directory::IdentityDirectory;
pub use error::{AuthError, Result};
pub use providers::{KeyValueStore, SessionStore};
pub use state::{
    AppCredentialId, Identity, IdentityQuery, IdentityRecord, InternalId, IssuedIdentity,
    Provider, ProviderAttributes, SessionId, SessionRecord,
};
