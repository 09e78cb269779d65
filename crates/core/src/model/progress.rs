use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::model::StepNumber;

/// Completion state of one tutorial.
///
/// Steps are kept as a set, so iteration is always ascending. The store
/// does not bound steps by the tutorial length; that is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialProgress {
    completed_steps: BTreeSet<StepNumber>,
    last_accessed: DateTime<Utc>,
}

impl TutorialProgress {
    /// A fresh record with nothing completed.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            completed_steps: BTreeSet::new(),
            last_accessed: now,
        }
    }

    /// Rehydrate a record from storage. Duplicate steps collapse.
    #[must_use]
    pub fn from_persisted(
        completed_steps: impl IntoIterator<Item = StepNumber>,
        last_accessed: DateTime<Utc>,
    ) -> Self {
        Self {
            completed_steps: completed_steps.into_iter().collect(),
            last_accessed,
        }
    }

    #[must_use]
    pub fn completed_steps(&self) -> &BTreeSet<StepNumber> {
        &self.completed_steps
    }

    #[must_use]
    pub fn last_accessed(&self) -> DateTime<Utc> {
        self.last_accessed
    }

    #[must_use]
    pub fn is_completed(&self, step: StepNumber) -> bool {
        self.completed_steps.contains(&step)
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_steps.len()
    }

    /// Flip a step between done and not done.
    ///
    /// Returns `true` if the step is completed afterwards.
    pub fn toggle(&mut self, step: StepNumber, now: DateTime<Utc>) -> bool {
        let completed = if self.completed_steps.remove(&step) {
            false
        } else {
            self.completed_steps.insert(step);
            true
        };
        self.last_accessed = now;
        completed
    }

    /// Clear every completed step. The record itself is kept.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.completed_steps.clear();
        self.last_accessed = now;
    }
}
