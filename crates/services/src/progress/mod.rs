mod store;
mod tracker;

// Public API of the progress subsystem.
pub use store::{DEFAULT_STORAGE_KEY, ProgressStore, ProgressStoreConfig};
pub use tracker::ProgressTracker;
