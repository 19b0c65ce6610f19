//! Identity directory.
//!
//! Maps provider accounts to internally issued identities. The directory owns
//! no state besides its store handle, so any number of instances (in one
//! process or many) may serve the same store concurrently. Isolation comes
//! from two store primitives only:
//!
//! - `INCR` on the id counter, so allocated ids are pairwise distinct
//! - a guarded create-if-absent on `identity:<provider>:<providerId>`, so a
//!   provider account maps to at most one record
//!
//! Lookups stay scan-based. The guard prevents new duplicates; scans detect
//! any that exist anyway and report them instead of picking one. Provider ids
//! may not contain the `:` key separator, and every scan hit is checked
//! against the query before it counts as a match.
//!
//! # Example
//!
//! ```
//! use socialapp_auth::{DirectoryConfig, IdentityDirectory, IdentityQuery, Provider, ProviderAttributes};
//! use socialapp_auth::mocks::MockKeyValueStore;
//!
//! # async fn example() -> socialapp_auth::Result<()> {
//! let directory = IdentityDirectory::new(MockKeyValueStore::new(), DirectoryConfig::default());
//!
//! let attributes = ProviderAttributes::new("123445", "jedi4ever");
//! let identity = directory.find_or_create(Provider::GitHub, &attributes).await?;
//!
//! let found = directory
//!     .find_one(Provider::GitHub, &IdentityQuery::ProviderId("123445".into()))
//!     .await?;
//! assert_eq!(found.as_ref(), Some(identity.record()));
//! # Ok(())
//! # }
//! ```

use crate::config::DirectoryConfig;
use crate::credentials;
use crate::error::{AuthError, Result};
use crate::keyspace;
use crate::providers::{GuardedWrite, KeyValueStore};
use crate::state::{
    Identity, IdentityQuery, IdentityRecord, InternalId, IssuedIdentity, Provider,
    ProviderAttributes, SessionRecord,
};
use std::future::Future;

/// Outcome of a single guarded create attempt.
enum CreateAttempt {
    Created(IssuedIdentity),
    Lost { winner_key: String },
}

/// Identity directory over an injected key-value store.
#[derive(Debug, Clone)]
pub struct IdentityDirectory<K> {
    store: K,
    config: DirectoryConfig,
}

impl<K: KeyValueStore> IdentityDirectory<K> {
    /// Create a directory over `store`.
    #[must_use]
    pub const fn new(store: K, config: DirectoryConfig) -> Self {
        Self { store, config }
    }

    /// Directory configuration.
    #[must_use]
    pub const fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Allocate the next internal id.
    ///
    /// # Errors
    ///
    /// Returns a transient error if the store is unavailable or slow.
    pub async fn next_id(&self) -> Result<InternalId> {
        self.bounded("next_id", self.store.increment(keyspace::USER_ID_COUNTER))
            .await
            .map(InternalId)
    }

    /// Look up the single identity matching `query`.
    ///
    /// An internal id addresses the identity regardless of `provider`; a
    /// provider id is scoped to `provider`.
    ///
    /// # Returns
    ///
    /// `None` if no record matches.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - More than one record matches (integrity violation)
    /// - The matching record is corrupt (integrity violation)
    /// - The store is unavailable or slow (transient)
    pub async fn find_one(
        &self,
        provider: Provider,
        query: &IdentityQuery,
    ) -> Result<Option<IdentityRecord>> {
        Ok(self
            .locate(&query_pattern(provider, query)?, |record| {
                selects(provider, query, record)
            })
            .await?
            .map(|(_, record)| record))
    }

    /// Create a new identity for a provider account.
    ///
    /// # Returns
    ///
    /// The stored record together with the raw application secret. The
    /// secret is not recoverable afterwards.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The provider is not enabled or the attributes are malformed
    /// - An identity for this provider account already exists
    /// - The store is unavailable or slow
    pub async fn create(
        &self,
        provider: Provider,
        attributes: &ProviderAttributes,
    ) -> Result<IssuedIdentity> {
        self.check_input(provider, attributes)?;

        match self.try_create(provider, attributes).await? {
            CreateAttempt::Created(issued) => Ok(issued),
            CreateAttempt::Lost { .. } => Err(AuthError::IdentityExists {
                provider,
                provider_id: attributes.provider_id.clone(),
            }),
        }
    }

    /// Return the identity of a provider account, creating it on first use.
    ///
    /// Safe under arbitrary concurrency: when two callers race, one creates
    /// and the other reads the winner's record.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The provider is not enabled or the attributes are malformed
    /// - Lookup hits an integrity violation
    /// - Every attempt lost the guard to a record that was gone by the time
    ///   it was read ([`AuthError::CreateContention`])
    /// - The store is unavailable or slow
    pub async fn find_or_create(
        &self,
        provider: Provider,
        attributes: &ProviderAttributes,
    ) -> Result<Identity> {
        self.check_input(provider, attributes)?;
        let query = IdentityQuery::ProviderId(attributes.provider_id.clone());
        let guard = keyspace::guard_key(provider, &attributes.provider_id);

        for attempt in 1..=self.config.max_create_attempts.max(1) {
            if let Some(record) = self.find_one(provider, &query).await? {
                return Ok(Identity::Existing(record));
            }

            match self.try_create(provider, attributes).await? {
                CreateAttempt::Created(issued) => return Ok(Identity::Created(issued)),
                CreateAttempt::Lost { winner_key } => {
                    let winner = self
                        .bounded("find_or_create", self.store.get_record(&winner_key))
                        .await?;
                    if let Some(stored) = winner {
                        tracing::debug!(
                            provider = %provider,
                            provider_id = %attributes.provider_id,
                            "Lost identity creation race, returning winner"
                        );
                        return IdentityRecord::from_fields(&winner_key, &stored)
                            .map(Identity::Existing);
                    }

                    // Stale guard: release it if it still points at the missing record
                    self.bounded("reclaim", self.store.delete_record(&winner_key, &guard))
                        .await?;
                    tracing::warn!(
                        provider = %provider,
                        provider_id = %attributes.provider_id,
                        attempt = attempt,
                        stale_key = %winner_key,
                        "Identity guard pointed at a missing record, released it"
                    );
                }
            }
        }

        Err(AuthError::CreateContention {
            attempts: self.config.max_create_attempts.max(1),
        })
    }

    /// Remove the single identity matching `query`.
    ///
    /// # Returns
    ///
    /// The removed record, or `None` if nothing matched.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - More than one record matches, or the delete count is not exactly 1
    /// - The store is unavailable or slow
    pub async fn remove(
        &self,
        provider: Provider,
        query: &IdentityQuery,
    ) -> Result<Option<IdentityRecord>> {
        let Some((key, record)) = self
            .locate(&query_pattern(provider, query)?, |record| {
                selects(provider, query, record)
            })
            .await?
        else {
            return Ok(None);
        };

        let guard = keyspace::guard_key(record.provider, &record.provider_id);
        let count = self
            .bounded("remove", self.store.delete_record(&key, &guard))
            .await?;

        if count != 1 {
            tracing::warn!(key = %key, count = count, "Identity removal count mismatch");
            return Err(AuthError::RemoveCountMismatch { key, count });
        }

        tracing::info!(
            internal_id = %record.internal_id,
            provider = %record.provider,
            "Removed identity"
        );

        Ok(Some(record))
    }

    /// Check a raw application secret against a record.
    #[must_use]
    pub fn verify_secret(&self, record: &IdentityRecord, raw_secret: &str) -> bool {
        credentials::verify_secret(raw_secret, &record.app_credential_secret_hash)
    }

    /// Resolve the identity a session is bound to.
    ///
    /// # Returns
    ///
    /// `None` for anonymous sessions and for identities removed since login.
    ///
    /// # Errors
    ///
    /// Same as [`Self::find_one`].
    pub async fn identity_for_session(
        &self,
        session: &SessionRecord,
    ) -> Result<Option<IdentityRecord>> {
        let Some(internal_id) = session.internal_id else {
            return Ok(None);
        };

        Ok(self
            .locate(&keyspace::internal_id_pattern(internal_id), |record| {
                record.internal_id == internal_id
            })
            .await?
            .map(|(_, record)| record))
    }

    /// Provider login callback: normalize the profile, then find or create.
    ///
    /// # Errors
    ///
    /// Returns error if the profile lacks required attributes, or any error
    /// of [`Self::find_or_create`].
    pub async fn login(&self, provider: Provider, profile: &serde_json::Value) -> Result<Identity> {
        let attributes = provider.attributes_from_profile(profile)?;
        let identity = self.find_or_create(provider, &attributes).await?;

        tracing::info!(
            internal_id = %identity.record().internal_id,
            provider = %provider,
            created = identity.is_created(),
            "Provider login resolved"
        );

        Ok(identity)
    }

    fn check_input(&self, provider: Provider, attributes: &ProviderAttributes) -> Result<()> {
        if !self.config.is_enabled(provider) {
            return Err(AuthError::ProviderDisabled(provider));
        }
        check_provider_id(&attributes.provider_id)
    }

    async fn try_create(
        &self,
        provider: Provider,
        attributes: &ProviderAttributes,
    ) -> Result<CreateAttempt> {
        let internal_id = self.next_id().await?;
        let credential = credentials::issue()?;

        let record = IdentityRecord {
            internal_id,
            provider,
            provider_id: attributes.provider_id.clone(),
            username: attributes.username.clone(),
            avatar_url: attributes.avatar_url.clone(),
            app_credential_id: credential.id,
            app_credential_secret_hash: credential.secret_hash,
        };
        let key = keyspace::record_key(
            internal_id,
            provider,
            &record.provider_id,
            record.app_credential_id,
        );
        let guard = keyspace::guard_key(provider, &record.provider_id);

        let write = self
            .bounded(
                "create",
                self.store.create_if_absent(&guard, &key, &record.to_fields()),
            )
            .await?;

        match write {
            GuardedWrite::Written => {
                tracing::info!(
                    internal_id = %internal_id,
                    provider = %provider,
                    provider_id = %record.provider_id,
                    "Created identity"
                );
                Ok(CreateAttempt::Created(IssuedIdentity {
                    record,
                    app_credential_secret: credential.secret,
                }))
            }
            GuardedWrite::Exists { record_key } => {
                tracing::debug!(
                    provider = %provider,
                    provider_id = %record.provider_id,
                    unused_id = %internal_id,
                    "Identity guard already taken"
                );
                Ok(CreateAttempt::Lost {
                    winner_key: record_key,
                })
            }
        }
    }

    /// Resolve a scan pattern to at most one record accepted by `selects`.
    ///
    /// Scan hits whose stored record belongs to another account are skipped.
    async fn locate(
        &self,
        pattern: &str,
        selects: impl Fn(&IdentityRecord) -> bool,
    ) -> Result<Option<(String, IdentityRecord)>> {
        let keys = self.bounded("scan", self.store.scan(pattern)).await?;

        let mut matches = Vec::new();
        for key in keys {
            // Removed between scan and read
            let Some(stored) = self.bounded("get", self.store.get_record(&key)).await? else {
                continue;
            };
            let record = IdentityRecord::from_fields(&key, &stored)?;
            if selects(&record) {
                matches.push((key, record));
            } else {
                tracing::debug!(key = %key, "Skipping scan hit of another account");
            }
        }

        if matches.len() > 1 {
            tracing::warn!(
                pattern = %pattern,
                matches = matches.len(),
                "Integrity violation: multiple identity records match"
            );
            return Err(AuthError::MultipleMatches {
                pattern: pattern.to_string(),
                matches: matches.len(),
            });
        }
        if matches.is_empty() {
            tracing::debug!(pattern = %pattern, "No identity record matches");
        }

        Ok(matches.pop())
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let timeout = self.config.store_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| AuthError::StoreTimeout { operation, timeout })?
    }
}

fn query_pattern(provider: Provider, query: &IdentityQuery) -> Result<String> {
    match query {
        IdentityQuery::InternalId(internal_id) => Ok(keyspace::internal_id_pattern(*internal_id)),
        IdentityQuery::ProviderId(provider_id) => {
            check_provider_id(provider_id)?;
            Ok(keyspace::provider_pattern(provider, provider_id))
        }
    }
}

fn check_provider_id(provider_id: &str) -> Result<()> {
    if provider_id.is_empty() {
        return Err(AuthError::InvalidQuery("provider id must not be empty".into()));
    }
    if provider_id.contains(keyspace::SEPARATOR) {
        return Err(AuthError::InvalidQuery(format!(
            "provider id must not contain '{}'",
            keyspace::SEPARATOR
        )));
    }
    Ok(())
}

/// Whether `record` is the identity `query` addresses.
fn selects(provider: Provider, query: &IdentityQuery, record: &IdentityRecord) -> bool {
    match query {
        IdentityQuery::InternalId(internal_id) => record.internal_id == *internal_id,
        IdentityQuery::ProviderId(provider_id) => {
            record.provider == provider && record.provider_id == *provider_id
        }
    }
}
