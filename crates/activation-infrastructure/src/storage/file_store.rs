//! Directory-backed key-value store.
//!
//! One file per key. Writes go to a temporary file in the same directory,
//! are fsynced, then renamed over the old value, all under an exclusive
//! lock file.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write as IoWrite};
use std::path::{Path, PathBuf};

use activation_core::error::StorageError;
use activation_core::storage::KeyValueStore;

const VALUE_EXTENSION: &str = "json";

/// Persistent key-value store rooted in a directory.
///
/// With a quota configured, the temporary file must fit next to every value
/// already on disk (including the one being replaced).
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileKeyValueStore {
    /// Creates a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {}", dir.display(), e))
        })?;
        Ok(Self {
            dir,
            quota_bytes: None,
        })
    }

    pub fn with_quota(mut self, quota_bytes: Option<u64>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Bytes held by stored values.
    pub fn usage_bytes(&self) -> Result<u64, StorageError> {
        let mut total = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == VALUE_EXTENSION) {
                total += fs::metadata(&path)?.len();
            }
        }
        Ok(total)
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_key(key), VALUE_EXTENSION))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.tmp", sanitize_key(key)))
    }

    fn lock(&self, key: &str) -> Result<KeyLock, StorageError> {
        KeyLock::acquire(&self.dir.join(format!("{}.lock", sanitize_key(key))))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.value_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _lock = self.lock(key)?;

        if let Some(quota) = self.quota_bytes {
            let required = self.usage_bytes()? + value.len() as u64;
            if required > quota {
                return Err(StorageError::quota_exceeded(key));
            }
        }

        let tmp_path = self.temp_path(key);
        let write_result = (|| -> std::io::Result<()> {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(value.as_bytes())?;
            tmp_file.sync_all()?;
            drop(tmp_file);
            fs::rename(&tmp_path, self.value_path(key))
        })();

        write_result.map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            if e.kind() == ErrorKind::StorageFull {
                StorageError::quota_exceeded(key)
            } else {
                e.into()
            }
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let _lock = self.lock(key)?;
        match fs::remove_file(self.value_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Maps a key onto a safe file stem.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Exclusive hold on one key's `.lock` file. The file is deleted on drop.
struct KeyLock {
    _file: File,
    path: PathBuf,
}

impl KeyLock {
    fn acquire(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive().map_err(|e| {
                StorageError::Io(format!("cannot lock {}: {}", path.display(), e))
            })?;
        }

        Ok(KeyLock {
            _file: file,
            path: path.to_path_buf(),
        })
    }
}

impl Drop for KeyLock {
    fn drop(&mut self) {
        // Closing the handle releases the OS lock
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();

        store.set_item("activation_progress", "{\"a\":1}").unwrap();
        assert_eq!(
            store.get_item("activation_progress").unwrap(),
            Some("{\"a\":1}".to_string())
        );
    }

    #[test]
    fn test_get_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();
        assert_eq!(store.get_item("nothing").unwrap(), None);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();

        store.set_item("k", "v").unwrap();
        store.remove_item("k").unwrap();
        store.remove_item("k").unwrap();
        assert_eq!(store.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_no_temp_or_lock_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();
        store.set_item("k", "v").unwrap();

        let names: Vec<String> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["k.json".to_string()]);
    }

    #[test]
    fn test_key_lock_is_held_until_dropped() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("k.lock");

        let lock = KeyLock::acquire(&path).unwrap();
        assert!(path.exists());
        drop(lock);
        assert!(!path.exists());

        // Reacquiring after release does not block
        let _again = KeyLock::acquire(&path).unwrap();
    }

    #[test]
    fn test_key_lock_in_missing_dir_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone").join("k.lock");

        assert!(matches!(
            KeyLock::acquire(&path),
            Err(StorageError::Io(_))
        ));
    }

    #[test]
    fn test_keys_are_sanitized() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path()).unwrap();

        store.set_item("../escape/attempt", "v").unwrap();
        assert!(temp_dir.path().join("___escape_attempt.json").exists());
        assert_eq!(
            store.get_item("../escape/attempt").unwrap(),
            Some("v".to_string())
        );
    }

    #[test]
    fn test_quota_counts_existing_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path())
            .unwrap()
            .with_quota(Some(15));

        store.set_item("k", "0123456789").unwrap();
        let err = store.set_item("k", "abcdefghij").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.get_item("k").unwrap(), Some("0123456789".to_string()));

        store.remove_item("k").unwrap();
        store.set_item("k", "abcdefghij").unwrap();
        assert_eq!(store.usage_bytes().unwrap(), 10);
    }
}
