use thiserror::Error;

use crate::model::{StepNumber, TutorialId, TutorialProgress};

/// Caller-supplied shape of a tutorial: which one, and how many steps it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialOutline {
    tutorial_id: TutorialId,
    total_steps: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutlineError {
    #[error("a tutorial needs at least one step")]
    NoSteps,
}

impl TutorialOutline {
    /// # Errors
    ///
    /// Returns `OutlineError::NoSteps` if `total_steps` is zero.
    pub fn new(tutorial_id: TutorialId, total_steps: u32) -> Result<Self, OutlineError> {
        if total_steps == 0 {
            return Err(OutlineError::NoSteps);
        }
        Ok(Self {
            tutorial_id,
            total_steps,
        })
    }

    #[must_use]
    pub fn tutorial_id(&self) -> &TutorialId {
        &self.tutorial_id
    }

    #[must_use]
    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Steps `1..=total_steps` in order.
    pub fn steps(&self) -> impl Iterator<Item = StepNumber> + '_ {
        (1..=self.total_steps).filter_map(|n| StepNumber::new(n).ok())
    }

    /// Counts and percentage for the progress bar.
    ///
    /// Every recorded step counts, including ones past `total_steps`, so a
    /// stale record for a shortened tutorial can read above 100%.
    #[must_use]
    pub fn summarize(&self, progress: &TutorialProgress) -> ProgressSummary {
        let completed = u32::try_from(progress.completed_count()).unwrap_or(u32::MAX);
        ProgressSummary {
            completed,
            total_steps: self.total_steps,
            percentage: rounded_percentage(completed, self.total_steps),
            is_complete: completed == self.total_steps,
            can_reset: completed > 0,
        }
    }

    /// One row per step, in order, for rendering a checklist.
    #[must_use]
    pub fn checklist(&self, progress: &TutorialProgress) -> Vec<ChecklistItem> {
        self.steps()
            .map(|step| ChecklistItem {
                step,
                completed: progress.is_completed(step),
            })
            .collect()
    }
}

// round(completed / total * 100), halves rounded up.
fn rounded_percentage(completed: u32, total: u32) -> u32 {
    let completed = u64::from(completed);
    let total = u64::from(total);
    let rounded = (completed * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub completed: u32,
    pub total_steps: u32,
    pub percentage: u32,
    pub is_complete: bool,
    pub can_reset: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecklistItem {
    pub step: StepNumber,
    pub completed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn outline(total: u32) -> TutorialOutline {
        TutorialOutline::new(TutorialId::new("demo-1").unwrap(), total).unwrap()
    }

    fn progress_with(steps: &[u32]) -> TutorialProgress {
        TutorialProgress::from_persisted(
            steps.iter().map(|n| StepNumber::new(*n).unwrap()),
            fixed_now(),
        )
    }

    #[test]
    fn zero_steps_is_rejected() {
        let err = TutorialOutline::new(TutorialId::new("demo-1").unwrap(), 0).unwrap_err();
        assert_eq!(err, OutlineError::NoSteps);
    }

    #[test]
    fn percentage_rounds_like_the_progress_bar() {
        assert_eq!(outline(3).summarize(&progress_with(&[1])).percentage, 33);
        assert_eq!(outline(3).summarize(&progress_with(&[1, 2])).percentage, 67);
        assert_eq!(outline(8).summarize(&progress_with(&[1])).percentage, 13);
        assert_eq!(outline(4).summarize(&progress_with(&[])).percentage, 0);
    }

    #[test]
    fn summary_flags_completion_and_reset() {
        let empty = outline(2).summarize(&progress_with(&[]));
        assert!(!empty.is_complete);
        assert!(!empty.can_reset);

        let done = outline(2).summarize(&progress_with(&[1, 2]));
        assert_eq!(done.completed, 2);
        assert_eq!(done.percentage, 100);
        assert!(done.is_complete);
        assert!(done.can_reset);
    }

    #[test]
    fn out_of_range_steps_still_count() {
        let summary = outline(2).summarize(&progress_with(&[1, 7]));
        assert_eq!(summary.completed, 2);
        assert!(summary.is_complete);
    }

    #[test]
    fn checklist_lists_every_step() {
        let rows = outline(3).checklist(&progress_with(&[2, 9]));
        let flags: Vec<(u32, bool)> = rows.iter().map(|r| (r.step.value(), r.completed)).collect();
        assert_eq!(flags, vec![(1, false), (2, true), (3, false)]);
    }
}
