//! Shared error types for the services crate.
//!
//! Progress operations never fail: storage problems are absorbed inside
//! `ProgressStore`. Only bootstrapping can surface an error.

use thiserror::Error;

use storage::sqlite::SqliteInitError;

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
