use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use activation_core::error::StorageError;
use activation_core::storage::KeyValueStore;

/// In-process key-value store with an optional byte quota.
///
/// Usage counts key and value bytes. A replacement has to fit alongside the
/// value it replaces, so removing a key first can make room for a write that
/// would otherwise be refused.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<u64>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently held.
    pub fn usage_bytes(&self) -> u64 {
        Self::usage(&self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn usage(entries: &HashMap<String, String>) -> u64 {
        entries
            .iter()
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.lock();
        if let Some(quota) = self.quota_bytes {
            let required = Self::usage(&entries) + (key.len() + value.len()) as u64;
            if required > quota {
                return Err(StorageError::quota_exceeded(key));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.get_item("k").unwrap(), None);

        store.set_item("k", "v1").unwrap();
        store.set_item("k", "v2").unwrap();
        assert_eq!(store.get_item("k").unwrap(), Some("v2".to_string()));
        assert_eq!(store.len(), 1);

        store.remove_item("k").unwrap();
        store.remove_item("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_quota_refuses_oversized_write() {
        let store = MemoryKeyValueStore::with_quota(8);
        let err = store.set_item("key", "too-long-value").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.is_empty());
    }

    #[test]
    fn test_replacement_must_fit_alongside_old_value() {
        // "k" + 10 bytes = 11; a second 10-byte value needs 22
        let store = MemoryKeyValueStore::with_quota(16);
        store.set_item("k", "0123456789").unwrap();

        assert!(store.set_item("k", "abcdefghij").unwrap_err().is_quota_exceeded());
        assert_eq!(store.get_item("k").unwrap(), Some("0123456789".to_string()));

        store.remove_item("k").unwrap();
        store.set_item("k", "abcdefghij").unwrap();
        assert_eq!(store.usage_bytes(), 11);
    }
}
