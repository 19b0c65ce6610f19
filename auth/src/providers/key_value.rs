//! Key-value store capability.

use crate::error::Result;
use std::collections::HashMap;

/// Outcome of a guarded create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedWrite {
    /// Guard and record were written together.
    Written,
    /// The guard already existed; nothing was written.
    Exists {
        /// Record key the existing guard points at.
        record_key: String,
    },
}

/// Key-value store holding identity records.
///
/// Records are flat field sets addressed by exact key. Every method is a
/// single atomic store operation; callers rely on that for correctness
/// across processes and never add in-process locking of their own.
///
/// # Implementation Notes
///
/// - `scan` must not block the store (cursor-based iteration)
/// - `increment` and `create_if_absent` are the only synchronization points
pub trait KeyValueStore: Send + Sync {
    /// Read all fields of a record.
    ///
    /// # Returns
    ///
    /// `None` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn get_record(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<HashMap<String, String>>>> + Send;

    /// Write fields of a record unconditionally.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn put_record(
        &self,
        key: &str,
        fields: &[(&'static str, String)],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// List keys matching a glob pattern (`*`, `?`, `\` escapes).
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn scan(
        &self,
        pattern: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Atomically increment a counter and return the new value.
    ///
    /// Missing counters start at zero, so the first value is 1.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn increment(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Write `guard_key → record_key` and the record fields, only if the
    /// guard does not exist yet.
    ///
    /// # Returns
    ///
    /// `GuardedWrite::Exists` with the guarded record key if another writer
    /// got there first.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn create_if_absent(
        &self,
        guard_key: &str,
        record_key: &str,
        fields: &[(&'static str, String)],
    ) -> impl std::future::Future<Output = Result<GuardedWrite>> + Send;

    /// Delete a record, and its guard if the guard points at it.
    ///
    /// The guard is compared and released even when the record is already
    /// gone, which is how a stale guard is reclaimed.
    ///
    /// # Returns
    ///
    /// Number of records deleted (0 or 1).
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn delete_record(
        &self,
        record_key: &str,
        guard_key: &str,
    ) -> impl std::future::Future<Output = Result<u64>> + Send;
}
