//! Durable key-value storage contract.

use crate::error::StorageError;

/// A synchronous, persistent string key-value store.
///
/// Mirrors the semantics of a browser's local storage: calls complete before
/// returning and a full store reports [`StorageError::QuotaExceeded`].
pub trait KeyValueStore: Send + Sync {
    /// Returns the value under `key`, or `None` if absent.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}
