//! Integration tests for the identity directory.
//!
//! Several directory instances share one in-memory store to stand in for
//! independent processes behind a load balancer.

#![allow(clippy::unwrap_used)]

use futures::future::join_all;
use socialapp_auth::{
    credentials, mocks::MockKeyValueStore, DirectoryConfig, Identity, IdentityDirectory,
    IdentityQuery, InternalId, Provider, ProviderAttributes,
};
use std::collections::HashSet;

fn directory_over(store: &MockKeyValueStore) -> IdentityDirectory<MockKeyValueStore> {
    IdentityDirectory::new(store.clone(), DirectoryConfig::default())
}

#[tokio::test]
async fn test_login_lifecycle_end_to_end() {
    let store = MockKeyValueStore::new();
    let directory = directory_over(&store);
    let attributes = ProviderAttributes::new("123445", "jedi4ever");

    // 1. First login creates the identity
    let issued = directory.create(Provider::GitHub, &attributes).await.unwrap();
    assert_eq!(issued.app_credential_secret.len(), 36);
    assert!(issued.record.app_credential_secret_hash.starts_with("$argon2id$"));
    assert!(directory.verify_secret(&issued.record, &issued.app_credential_secret));

    // 2. Later logins resolve to the same identity
    let again = directory
        .find_or_create(Provider::GitHub, &attributes)
        .await
        .unwrap();
    assert!(matches!(again, Identity::Existing(_)));
    assert_eq!(again.record().internal_id, issued.record.internal_id);

    // 3. Removal makes it unreachable
    let query = IdentityQuery::ProviderId("123445".into());
    directory.remove(Provider::GitHub, &query).await.unwrap();
    assert!(directory.find_one(Provider::GitHub, &query).await.unwrap().is_none());
    assert!(
        directory
            .find_one(
                Provider::GitHub,
                &IdentityQuery::InternalId(issued.record.internal_id)
            )
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_secret_hashes_have_fixed_length() {
    let store = MockKeyValueStore::new();
    let directory = directory_over(&store);

    let a = directory
        .create(Provider::GitHub, &ProviderAttributes::new("1", "a"))
        .await
        .unwrap();
    let b = directory
        .create(Provider::Twitter, &ProviderAttributes::new("1", "b"))
        .await
        .unwrap();

    assert_eq!(
        a.record.app_credential_secret_hash.len(),
        b.record.app_credential_secret_hash.len()
    );
    assert_ne!(a.record.app_credential_id, b.record.app_credential_id);
    assert!(!credentials::verify_secret(
        &a.app_credential_secret,
        &b.record.app_credential_secret_hash
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_find_or_create_yields_one_identity() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init()
        .ok();

    let store = MockKeyValueStore::new();
    let attributes = ProviderAttributes::new("424242", "racer");

    // Every task gets its own directory, as separate processes would
    let tasks = (0..12).map(|_| {
        let directory = directory_over(&store);
        let attributes = attributes.clone();
        tokio::spawn(async move { directory.find_or_create(Provider::GitHub, &attributes).await })
    });

    let identities: Vec<Identity> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let created = identities.iter().filter(|i| i.is_created()).count();
    let ids: HashSet<InternalId> = identities.iter().map(|i| i.record().internal_id).collect();

    assert_eq!(created, 1);
    assert_eq!(ids.len(), 1);
    assert_eq!(store.record_count().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_allocate_distinct_ids() {
    let store = MockKeyValueStore::new();

    let tasks = (0..12).map(|n| {
        let directory = directory_over(&store);
        tokio::spawn(async move {
            directory
                .create(
                    Provider::Twitter,
                    &ProviderAttributes::new(format!("user-{n}"), format!("name-{n}")),
                )
                .await
        })
    });

    let ids: HashSet<InternalId> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap().record.internal_id)
        .collect();

    assert_eq!(ids.len(), 12);
    assert_eq!(store.record_count().unwrap(), 12);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_refuses_all_but_one() {
    let store = MockKeyValueStore::new();
    let attributes = ProviderAttributes::new("777", "twin");

    let tasks = (0..8).map(|_| {
        let directory = directory_over(&store);
        let attributes = attributes.clone();
        tokio::spawn(async move { directory.create(Provider::GitHub, &attributes).await })
    });

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, socialapp_auth::AuthError::IdentityExists { .. }))
    );
    assert_eq!(store.record_count().unwrap(), 1);
}

#[tokio::test]
async fn test_same_provider_id_on_two_providers_is_two_identities() {
    let store = MockKeyValueStore::new();
    let directory = directory_over(&store);
    let attributes = ProviderAttributes::new("1001", "twice");

    let github = directory
        .find_or_create(Provider::GitHub, &attributes)
        .await
        .unwrap();
    let twitter = directory
        .find_or_create(Provider::Twitter, &attributes)
        .await
        .unwrap();

    assert_ne!(github.record().internal_id, twitter.record().internal_id);
}

#[tokio::test]
async fn test_glob_characters_in_provider_id_match_literally() {
    let store = MockKeyValueStore::new();
    let directory = directory_over(&store);

    directory
        .create(Provider::GitHub, &ProviderAttributes::new("abc", "plain"))
        .await
        .unwrap();

    let wildcard = directory
        .find_one(Provider::GitHub, &IdentityQuery::ProviderId("*".into()))
        .await
        .unwrap();
    assert!(wildcard.is_none());

    let starred = directory
        .find_or_create(Provider::GitHub, &ProviderAttributes::new("*", "star"))
        .await
        .unwrap();
    assert!(starred.is_created());
    assert_eq!(store.record_count().unwrap(), 2);
}
