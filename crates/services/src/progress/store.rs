use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use storage::progress_table::{ProgressTable, decode_table, upsert_entry};
use storage::repository::KeyValueStore;
use tutorial_core::model::{StepNumber, TutorialId, TutorialProgress};

use crate::Clock;

/// Storage key the progress table lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "greentic-tutorial-progress";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressStoreConfig {
    pub storage_key: String,
}

impl Default for ProgressStoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// What a read of the persisted table produced.
enum TableRead {
    Loaded(ProgressTable),
    Missing,
    Corrupt,
    Unavailable,
}

/// Tracks completed tutorial steps in a local key-value medium.
///
/// The whole table is read and rewritten on every mutation. Storage
/// failures never reach the caller: reads fall back to "no progress" and
/// writes are dropped. Records whose last write was dropped are kept for
/// the lifetime of the store, so the session still sees its own updates.
///
/// Writers in other processes race with last-write-wins.
pub struct ProgressStore {
    clock: Clock,
    local: Arc<dyn KeyValueStore>,
    config: ProgressStoreConfig,
    unsaved: Mutex<ProgressTable>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(clock: Clock, local: Arc<dyn KeyValueStore>, config: ProgressStoreConfig) -> Self {
        Self {
            clock,
            local,
            config,
            unsaved: Mutex::new(ProgressTable::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ProgressStoreConfig {
        &self.config
    }

    /// Look up the progress recorded for a tutorial.
    ///
    /// Returns `None` when nothing is recorded or the storage medium cannot
    /// be read or decoded.
    pub async fn get_progress(&self, tutorial_id: &TutorialId) -> Option<TutorialProgress> {
        let pending = self.unsaved().get(tutorial_id).cloned();
        if pending.is_some() {
            return pending;
        }
        match self.read_table().await {
            TableRead::Loaded(mut table) => table.remove(tutorial_id),
            TableRead::Missing | TableRead::Corrupt | TableRead::Unavailable => None,
        }
    }

    /// Replace the record for one tutorial, leaving every other record as
    /// stored.
    ///
    /// A failed write is logged and otherwise ignored.
    pub async fn save_progress(&self, tutorial_id: &TutorialId, progress: TutorialProgress) {
        let persisted = self.write_entry(tutorial_id, &progress).await;
        let mut unsaved = self.unsaved();
        if persisted {
            unsaved.remove(tutorial_id);
        } else {
            unsaved.insert(tutorial_id.clone(), progress);
        }
    }

    /// Mark `step` done if it is not, or not done if it is.
    ///
    /// `step` is not checked against the tutorial's length.
    pub async fn toggle_step(&self, tutorial_id: &TutorialId, step: StepNumber) -> TutorialProgress {
        let now = self.clock.now();
        let mut progress = self
            .get_progress(tutorial_id)
            .await
            .unwrap_or_else(|| TutorialProgress::new(now));
        let completed = progress.toggle(step, now);
        tracing::debug!(tutorial = %tutorial_id, %step, completed, "step toggled");
        self.save_progress(tutorial_id, progress.clone()).await;
        progress
    }

    /// Clear every completed step while keeping the record.
    pub async fn reset_progress(&self, tutorial_id: &TutorialId) -> TutorialProgress {
        let now = self.clock.now();
        let mut progress = self
            .get_progress(tutorial_id)
            .await
            .unwrap_or_else(|| TutorialProgress::new(now));
        progress.reset(now);
        tracing::debug!(tutorial = %tutorial_id, "progress reset");
        self.save_progress(tutorial_id, progress.clone()).await;
        progress
    }

    /// Return the stored record, creating and saving an empty one on first
    /// visit.
    pub async fn open(&self, tutorial_id: &TutorialId) -> TutorialProgress {
        if let Some(progress) = self.get_progress(tutorial_id).await {
            return progress;
        }
        let progress = TutorialProgress::new(self.clock.now());
        self.save_progress(tutorial_id, progress.clone()).await;
        progress
    }

    /// Every readable record, with this session's unsaved records on top.
    pub async fn all_progress(&self) -> ProgressTable {
        let mut table = match self.read_table().await {
            TableRead::Loaded(table) => table,
            TableRead::Missing | TableRead::Corrupt | TableRead::Unavailable => {
                ProgressTable::new()
            }
        };
        let unsaved = self.unsaved().clone();
        table.extend(unsaved);
        table
    }

    async fn read_table(&self) -> TableRead {
        let key = self.config.storage_key.as_str();
        let raw = match self.local.get_item(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return TableRead::Missing,
            Err(err) => {
                tracing::warn!(key, error = %err, "progress storage unreadable; treating as empty");
                return TableRead::Unavailable;
            }
        };
        match decode_table(&raw) {
            Ok(table) => TableRead::Loaded(table),
            Err(err) => {
                tracing::warn!(key, error = %err, "stored progress is corrupt; treating as empty");
                TableRead::Corrupt
            }
        }
    }

    /// Read-modify-write of the whole payload. Returns whether the write
    /// landed.
    ///
    /// Other tutorials' entries are written back as they were read, even
    /// ones `get_progress` would ignore.
    async fn write_entry(&self, tutorial_id: &TutorialId, progress: &TutorialProgress) -> bool {
        let key = self.config.storage_key.as_str();
        let raw = match self.local.get_item(key).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key, error = %err, "progress storage unreadable; skipping write");
                return false;
            }
        };

        let payload = match upsert_entry(raw.as_deref(), tutorial_id, progress) {
            Ok(payload) => payload,
            // Only a payload that is not a JSON object lands here; nothing in
            // it is readable, so start a fresh table.
            Err(err) => {
                tracing::warn!(key, error = %err, "replacing unparsable progress table");
                match upsert_entry(None, tutorial_id, progress) {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::warn!(key, error = %err, "failed to encode progress table");
                        return false;
                    }
                }
            }
        };
        match self.local.set_item(key, &payload).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    key,
                    tutorial = %tutorial_id,
                    error = %err,
                    "progress not persisted; keeping it for this session only"
                );
                false
            }
        }
    }

    fn unsaved(&self) -> MutexGuard<'_, ProgressTable> {
        self.unsaved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryStore;
    use tutorial_core::time::fixed_clock;

    fn id(raw: &str) -> TutorialId {
        TutorialId::new(raw).unwrap()
    }

    fn step(n: u32) -> StepNumber {
        StepNumber::new(n).unwrap()
    }

    fn steps(progress: &TutorialProgress) -> Vec<u32> {
        progress
            .completed_steps()
            .iter()
            .map(StepNumber::value)
            .collect()
    }

    fn store_over(local: &InMemoryStore) -> ProgressStore {
        ProgressStore::new(
            fixed_clock(),
            Arc::new(local.clone()),
            ProgressStoreConfig::default(),
        )
    }

    #[tokio::test]
    async fn missing_table_reads_as_absent() {
        let store = store_over(&InMemoryStore::new());
        assert!(store.get_progress(&id("demo-1")).await.is_none());
        assert!(store.all_progress().await.is_empty());
    }

    #[tokio::test]
    async fn open_creates_and_persists_an_empty_record() {
        let local = InMemoryStore::new();
        let store = store_over(&local);

        let progress = store.open(&id("demo-1")).await;
        assert_eq!(progress.completed_count(), 0);

        let raw = local.get_item(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        assert_eq!(
            raw,
            r#"{"demo-1":{"completedSteps":[],"lastAccessed":"2023-11-14T22:13:20.000Z"}}"#
        );
    }

    #[tokio::test]
    async fn corrupt_table_is_replaced_on_next_write() {
        let local = InMemoryStore::new();
        local.set_item(DEFAULT_STORAGE_KEY, "{oops").await.unwrap();
        let store = store_over(&local);

        assert!(store.get_progress(&id("demo-1")).await.is_none());
        store.toggle_step(&id("demo-1"), step(2)).await;

        let raw = local.get_item(DEFAULT_STORAGE_KEY).await.unwrap().unwrap();
        assert!(decode_table(&raw).is_ok());
        let fresh = store_over(&local);
        let progress = fresh.get_progress(&id("demo-1")).await.unwrap();
        assert_eq!(steps(&progress), vec![2]);
    }

    #[tokio::test]
    async fn session_keeps_updates_while_storage_is_down() {
        let local = InMemoryStore::new();
        let store = store_over(&local);
        store.toggle_step(&id("demo-1"), step(1)).await;

        local.set_available(false);
        let progress = store.toggle_step(&id("demo-1"), step(2)).await;
        assert_eq!(steps(&progress), vec![1, 2]);
        let seen = store.get_progress(&id("demo-1")).await.unwrap();
        assert_eq!(steps(&seen), vec![1, 2]);

        // A fresh session only sees what reached storage.
        local.set_available(true);
        let fresh = store_over(&local);
        let persisted = fresh.get_progress(&id("demo-1")).await.unwrap();
        assert_eq!(steps(&persisted), vec![1]);

        // The next successful write lands the session's view.
        store.toggle_step(&id("demo-1"), step(3)).await;
        let persisted = fresh.get_progress(&id("demo-1")).await.unwrap();
        assert_eq!(steps(&persisted), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn custom_storage_key_is_used() {
        let local = InMemoryStore::new();
        let store = ProgressStore::new(
            fixed_clock(),
            Arc::new(local.clone()),
            ProgressStoreConfig {
                storage_key: "docs-progress".into(),
            },
        );
        store.toggle_step(&id("demo-1"), step(1)).await;

        assert!(local.get_item("docs-progress").await.unwrap().is_some());
        assert!(local.get_item(DEFAULT_STORAGE_KEY).await.unwrap().is_none());
        assert_eq!(store.config().storage_key, "docs-progress");
    }
}
