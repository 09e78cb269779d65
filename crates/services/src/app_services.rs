use std::sync::Arc;

use storage::repository::Storage;
use tutorial_core::model::TutorialOutline;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress::{ProgressStore, ProgressStoreConfig, ProgressTracker};

/// Assembles the app-facing progress services over one storage medium.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressStore>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        quota_bytes: Option<usize>,
        clock: Clock,
        config: ProgressStoreConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, quota_bytes).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services whose progress lasts only as long as the process.
    #[must_use]
    pub fn in_memory(clock: Clock, config: ProgressStoreConfig) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, config)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: ProgressStoreConfig) -> Self {
        let progress = Arc::new(ProgressStore::new(
            clock,
            Arc::clone(&storage.local),
            config,
        ));
        Self { progress }
    }

    #[must_use]
    pub fn progress_store(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    /// Load the checklist state for one tutorial.
    pub async fn tracker(&self, outline: TutorialOutline) -> ProgressTracker {
        ProgressTracker::load(self.progress_store(), outline).await
    }
}
