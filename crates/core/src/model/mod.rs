mod ids;
mod outline;
mod progress;

pub use ids::{StepError, StepNumber, TutorialId, TutorialIdError};
pub use outline::{ChecklistItem, OutlineError, ProgressSummary, TutorialOutline};
pub use progress::TutorialProgress;
