#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress;

pub use tutorial_core::Clock;

pub use app_services::AppServices;
pub use error::AppServicesError;
pub use progress::{DEFAULT_STORAGE_KEY, ProgressStore, ProgressStoreConfig, ProgressTracker};
