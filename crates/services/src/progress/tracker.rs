use std::sync::Arc;

use tutorial_core::model::{
    ChecklistItem, ProgressSummary, StepNumber, TutorialOutline, TutorialProgress,
};

use super::store::ProgressStore;

/// State behind a tutorial's progress checklist.
pub struct ProgressTracker {
    store: Arc<ProgressStore>,
    outline: TutorialOutline,
    progress: TutorialProgress,
}

impl ProgressTracker {
    /// Load the tutorial's record, creating it on first visit.
    pub async fn load(store: Arc<ProgressStore>, outline: TutorialOutline) -> Self {
        let progress = store.open(outline.tutorial_id()).await;
        Self {
            store,
            outline,
            progress,
        }
    }

    #[must_use]
    pub fn outline(&self) -> &TutorialOutline {
        &self.outline
    }

    #[must_use]
    pub fn progress(&self) -> &TutorialProgress {
        &self.progress
    }

    /// Returns `true` if the step is completed afterwards.
    pub async fn toggle(&mut self, step: StepNumber) -> bool {
        self.progress = self
            .store
            .toggle_step(self.outline.tutorial_id(), step)
            .await;
        self.progress.is_completed(step)
    }

    pub async fn reset(&mut self) {
        self.progress = self.store.reset_progress(self.outline.tutorial_id()).await;
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.outline.summarize(&self.progress)
    }

    #[must_use]
    pub fn checklist(&self) -> Vec<ChecklistItem> {
        self.outline.checklist(&self.progress)
    }
}
