//! Mock key-value store for testing.

use crate::error::{AuthError, Result};
use crate::providers::{GuardedWrite, KeyValueStore};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Keyspace {
    records: HashMap<String, HashMap<String, String>>,
    strings: HashMap<String, String>,
    counters: HashMap<String, u64>,
}

/// Mock key-value store.
///
/// Uses in-memory storage with the same atomicity per call as the Redis
/// store. Clones share state, which makes it usable as "the same store seen
/// from several processes".
#[derive(Debug, Clone, Default)]
pub struct MockKeyValueStore {
    keyspace: Arc<Mutex<Keyspace>>,
    unavailable: Arc<AtomicBool>,
}

impl MockKeyValueStore {
    /// Create a new mock key-value store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored records (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn record_count(&self) -> Result<usize> {
        Ok(lock(&self.keyspace)?.records.len())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::StoreUnavailable(
                "Mock store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn lock(keyspace: &Mutex<Keyspace>) -> Result<std::sync::MutexGuard<'_, Keyspace>> {
    keyspace
        .lock()
        .map_err(|_| AuthError::InternalError("Mutex lock failed".to_string()))
}

fn owned_fields(fields: &[(&'static str, String)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(field, value)| ((*field).to_string(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GlobToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

fn glob_tokens(pattern: &str) -> Vec<GlobToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '*' => GlobToken::AnySequence,
            '?' => GlobToken::AnyChar,
            '\\' => GlobToken::Literal(chars.next().unwrap_or('\\')),
            c => GlobToken::Literal(c),
        });
    }
    tokens
}

/// Redis-style glob match supporting `*`, `?` and `\` escapes.
///
/// Iterative; only the most recent `*` is ever backtracked to.
fn glob_match(pattern: &str, text: &str) -> bool {
    let tokens = glob_tokens(pattern);
    let text: Vec<char> = text.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Last `*` seen and the text position it currently absorbs up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match tokens.get(p) {
            Some(GlobToken::AnySequence) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(GlobToken::AnyChar) => {
                p += 1;
                t += 1;
            }
            Some(GlobToken::Literal(c)) if *c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, absorbed)) => {
                    backtrack = Some((star, absorbed + 1));
                    p = star + 1;
                    t = absorbed + 1;
                }
                None => return false,
            },
        }
    }

    tokens[p..].iter().all(|token| *token == GlobToken::AnySequence)
}

impl KeyValueStore for MockKeyValueStore {
    fn get_record(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<HashMap<String, String>>>> + Send {
        let available = self.check_available();
        let keyspace = Arc::clone(&self.keyspace);
        let key = key.to_string();

        async move {
            available?;
            Ok(lock(&keyspace)?
                .records
                .get(&key)
                .filter(|fields| !fields.is_empty())
                .cloned())
        }
    }

    fn put_record(
        &self,
        key: &str,
        fields: &[(&'static str, String)],
    ) -> impl Future<Output = Result<()>> + Send {
        let available = self.check_available();
        let keyspace = Arc::clone(&self.keyspace);
        let key = key.to_string();
        let fields = owned_fields(fields);

        async move {
            available?;
            lock(&keyspace)?
                .records
                .entry(key)
                .or_default()
                .extend(fields);
            Ok(())
        }
    }

    fn scan(&self, pattern: &str) -> impl Future<Output = Result<Vec<String>>> + Send {
        let available = self.check_available();
        let keyspace = Arc::clone(&self.keyspace);
        let pattern = pattern.to_string();

        async move {
            available?;
            let guard = lock(&keyspace)?;
            let mut keys: Vec<String> = guard
                .records
                .keys()
                .chain(guard.strings.keys())
                .chain(guard.counters.keys())
                .filter(|key| glob_match(&pattern, key))
                .cloned()
                .collect();
            keys.sort_unstable();
            Ok(keys)
        }
    }

    fn increment(&self, key: &str) -> impl Future<Output = Result<u64>> + Send {
        let available = self.check_available();
        let keyspace = Arc::clone(&self.keyspace);
        let key = key.to_string();

        async move {
            available?;
            let mut guard = lock(&keyspace)?;
            let counter = guard.counters.entry(key).or_insert(0);
            *counter += 1;
            Ok(*counter)
        }
    }

    fn create_if_absent(
        &self,
        guard_key: &str,
        record_key: &str,
        fields: &[(&'static str, String)],
    ) -> impl Future<Output = Result<GuardedWrite>> + Send {
        let available = self.check_available();
        let keyspace = Arc::clone(&self.keyspace);
        let guard_key = guard_key.to_string();
        let record_key = record_key.to_string();
        let fields = owned_fields(fields);

        async move {
            available?;
            let mut guard = lock(&keyspace)?;

            if let Some(existing) = guard.strings.get(&guard_key) {
                return Ok(GuardedWrite::Exists {
                    record_key: existing.clone(),
                });
            }

            guard.strings.insert(guard_key, record_key.clone());
            guard
                .records
                .entry(record_key)
                .or_default()
                .extend(fields);
            Ok(GuardedWrite::Written)
        }
    }

    fn delete_record(
        &self,
        record_key: &str,
        guard_key: &str,
    ) -> impl Future<Output = Result<u64>> + Send {
        let available = self.check_available();
        let keyspace = Arc::clone(&self.keyspace);
        let record_key = record_key.to_string();
        let guard_key = guard_key.to_string();

        async move {
            available?;
            let mut guard = lock(&keyspace)?;

            let deleted = u64::from(guard.records.remove(&record_key).is_some());
            if guard.strings.get(&guard_key) == Some(&record_key) {
                guard.strings.remove(&guard_key);
            }
            Ok(deleted)
        }
    }
}
