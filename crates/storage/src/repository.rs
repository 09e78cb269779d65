use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
///
/// Callers that fail open treat every variant the same way: the medium is
/// unavailable for this operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded: {attempted} bytes requested, limit is {limit}")]
    QuotaExceeded { limit: usize, attempted: usize },
}

/// A string key-value medium scoped to one application, in the manner of a
/// browser's local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the medium cannot be read.
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::QuotaExceeded` if the write would push the
    /// medium past its size limit, or `StorageError::Unavailable`.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Unavailable` if the medium cannot be written.
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Checks a write against an optional byte quota.
///
/// Usage is counted as the byte length of every key plus its value.
pub(crate) fn check_quota(
    limit: Option<usize>,
    used_by_others: usize,
    key: &str,
    value: &str,
) -> Result<(), StorageError> {
    let Some(limit) = limit else {
        return Ok(());
    };
    let attempted = used_by_others + key.len() + value.len();
    if attempted > limit {
        return Err(StorageError::QuotaExceeded { limit, attempted });
    }
    Ok(())
}

/// In-memory medium for tests and sessions without persistence.
///
/// Clones share the same entries, quota and availability switch.
#[derive(Clone)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    available: Arc<AtomicBool>,
    quota_bytes: Option<usize>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
            quota_bytes: None,
        }
    }

    /// Limit total usage to `bytes`.
    #[must_use]
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Make every operation fail with `StorageError::Unavailable` until
    /// switched back on.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Unavailable("storage disabled".into()))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.ensure_available()?;
        let guard = self.lock()?;
        Ok(guard.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        let mut guard = self.lock()?;
        let used_by_others = guard
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        check_quota(self.quota_bytes, used_by_others, key, value)?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.ensure_available()?;
        let mut guard = self.lock()?;
        guard.remove(key);
        Ok(())
    }
}

/// The storage medium behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub local: Arc<dyn KeyValueStore>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let local: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        Self { local }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_removes_items() {
        let store = InMemoryStore::new();
        assert!(store.get_item("k").await.unwrap().is_none());

        store.set_item("k", "v1").await.unwrap();
        store.set_item("k", "v2").await.unwrap();
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v2"));

        store.remove_item("k").await.unwrap();
        store.remove_item("k").await.unwrap();
        assert!(store.get_item("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disabled_store_is_unavailable() {
        let store = InMemoryStore::new();
        store.set_item("k", "v").await.unwrap();

        let shared = store.clone();
        shared.set_available(false);
        assert!(matches!(
            store.get_item("k").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(matches!(
            store.set_item("k", "w").await,
            Err(StorageError::Unavailable(_))
        ));

        shared.set_available(true);
        assert_eq!(store.get_item("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn quota_counts_keys_and_values() {
        let store = InMemoryStore::new().with_quota(10);
        store.set_item("ab", "cdef").await.unwrap();
        // Replacing a key does not count its old value.
        store.set_item("ab", "cdefgh").await.unwrap();

        let err = store.set_item("x", "yz").await.unwrap_err();
        match err {
            StorageError::QuotaExceeded { limit, attempted } => {
                assert_eq!(limit, 10);
                assert_eq!(attempted, 11);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.get_item("ab").await.unwrap().as_deref(), Some("cdefgh"));
        assert!(store.get_item("x").await.unwrap().is_none());
    }
}
