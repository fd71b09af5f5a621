//! Backing stores for the draft document.
//!
//! A [`LocalStorage`] holds string blobs under string keys. The draft store
//! uses exactly one key and rewrites the whole blob on every change.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Error from a backing store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("storage quota exceeded ({size} bytes, limit {limit})")]
    QuotaExceeded { size: usize, limit: usize },
    #[error("database error: {0}")]
    Database(String),
    #[error("failed to serialize drafts: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Read-modify-write step handed to [`LocalStorage::update`].
///
/// Receives the current value and returns the replacement, or `None` to
/// leave the item untouched.
pub type UpdateFn<'a> = dyn FnMut(Option<String>) -> Result<Option<String>, StorageError> + 'a;

/// String key-value persistence, modeled on the browser's local storage.
pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Read, change and write one item with no other writer in between.
    fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StorageError>;
}

impl<T: LocalStorage + ?Sized> LocalStorage for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove_item(key)
    }

    fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StorageError> {
        (**self).update(key, change)
    }
}

/// Process-local storage, optionally with a byte quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any write whose total size would exceed `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    fn check_quota(
        &self,
        items: &HashMap<String, String>,
        key: &str,
        value: &str,
    ) -> Result<(), StorageError> {
        let Some(limit) = self.quota else {
            return Ok(());
        };
        let others: usize = items
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        let size = others + key.len() + value.len();
        if size > limit {
            return Err(StorageError::QuotaExceeded { size, limit });
        }
        Ok(())
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_quota(&items, key, value)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StorageError> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(value) = change(items.get(key).cloned())? {
            self.check_quota(&items, key, &value)?;
            items.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temp file that is renamed over the target while an
/// exclusive lock is held on a `.lock` sibling. [`LocalStorage::update`]
/// holds that lock across its read as well, so concurrent read-modify-write
/// cycles from other processes or threads are serialized.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn item_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }

    fn with_lock<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Path) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let path = self.item_path(key);
        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        FileExt::lock_exclusive(&lock)?;
        let result = f(&path);
        if let Err(e) = FileExt::unlock(&lock) {
            tracing::warn!("Failed to release lock {}: {}", lock_path.display(), e);
        }
        result
    }
}

fn read_file(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Caller must hold the item's lock.
fn replace_file(path: &Path, value: &str) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        read_file(&self.item_path(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.with_lock(key, |path| replace_file(path, value))
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.with_lock(key, |path| match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })
    }

    fn update(&self, key: &str, change: &mut UpdateFn<'_>) -> Result<(), StorageError> {
        self.with_lock(key, |path| match change(read_file(path)?)? {
            Some(value) => replace_file(path, &value),
            None => Ok(()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_quota() {
        let storage = MemoryStorage::with_quota(16);
        storage.set_item("k", "small").unwrap();
        let err = storage.set_item("k", "far too large for the quota").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        assert_eq!(storage.get_item("hn_temp_site_data").unwrap(), None);
        storage.set_item("hn_temp_site_data", "{}").unwrap();
        assert_eq!(
            storage.get_item("hn_temp_site_data").unwrap().as_deref(),
            Some("{}")
        );

        storage.remove_item("hn_temp_site_data").unwrap();
        storage.remove_item("hn_temp_site_data").unwrap();
        assert_eq!(storage.get_item("hn_temp_site_data").unwrap(), None);
    }

    fn append(storage: &dyn LocalStorage, key: &str, suffix: &str) {
        storage
            .update(key, &mut |current| {
                Ok(Some(format!("{}{}", current.unwrap_or_default(), suffix)))
            })
            .unwrap();
    }

    #[test]
    fn test_memory_update_respects_quota() {
        let storage = MemoryStorage::with_quota(8);
        append(&storage, "k", "abc");
        let err = storage
            .update("k", &mut |current| Ok(current.map(|c| c.repeat(4))))
            .unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("abc"));

        storage.update("k", &mut |_| Ok(None)).unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_file_update_serializes_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let storage = FileStorage::new(dir.path()).unwrap();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        append(&storage, "counter", "x");
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let storage = FileStorage::new(dir.path()).unwrap();
        assert_eq!(storage.get_item("counter").unwrap().map(|s| s.len()), Some(200));
    }

    #[test]
    fn test_file_storage_encodes_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        let path = storage.item_path("a/b");
        assert_eq!(path.file_name().unwrap(), "a%2Fb.json");
    }
}
