//! JSON codec for the progress table kept under a single storage key.
//!
//! Layout:
//! ```text
//! {
//!   "<tutorialId>": {
//!     "completedSteps": [1, 3, 4],
//!     "lastAccessed": "2024-01-15T10:30:00.000Z"
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tutorial_core::model::{StepNumber, TutorialId, TutorialProgress};

/// Every tutorial's progress, keyed by id.
pub type ProgressTable = BTreeMap<TutorialId, TutorialProgress>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    #[error("progress table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("progress table must be a JSON object, found {found}")]
    NotAnObject { found: &'static str },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgress {
    completed_steps: Vec<StepNumber>,
    last_accessed: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredProgressOut {
    completed_steps: Vec<u32>,
    last_accessed: String,
}

impl From<&TutorialProgress> for StoredProgressOut {
    fn from(progress: &TutorialProgress) -> Self {
        Self {
            completed_steps: progress
                .completed_steps()
                .iter()
                .map(StepNumber::value)
                .collect(),
            last_accessed: progress
                .last_accessed()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Parse and validate a stored table.
///
/// Entries whose id or shape does not validate are dropped one by one; the
/// rest of the table survives.
///
/// # Errors
///
/// Returns `CodecError` if the payload is not JSON or not a JSON object.
pub fn decode_table(raw: &str) -> Result<ProgressTable, CodecError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let entries = match value {
        serde_json::Value::Object(entries) => entries,
        other => {
            return Err(CodecError::NotAnObject {
                found: json_kind(&other),
            });
        }
    };

    let mut table = ProgressTable::new();
    for (key, entry) in entries {
        let id = match TutorialId::new(key.as_str()) {
            Ok(id) => id,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "dropping progress entry with invalid id");
                continue;
            }
        };
        match serde_json::from_value::<StoredProgress>(entry) {
            Ok(stored) => {
                let progress =
                    TutorialProgress::from_persisted(stored.completed_steps, stored.last_accessed);
                table.insert(id, progress);
            }
            Err(err) => {
                tracing::warn!(tutorial = %id, error = %err, "dropping malformed progress entry");
            }
        }
    }
    Ok(table)
}

/// Serialize a table in the stored layout: steps ascending, timestamps in
/// UTC with millisecond precision.
///
/// # Errors
///
/// Returns `CodecError::Json` if serialization fails.
pub fn encode_table(table: &ProgressTable) -> Result<String, CodecError> {
    let stored: BTreeMap<&str, StoredProgressOut> = table
        .iter()
        .map(|(id, progress)| (id.as_str(), StoredProgressOut::from(progress)))
        .collect();
    Ok(serde_json::to_string(&stored)?)
}

/// Set one tutorial's entry in a stored payload.
///
/// Only the key for `tutorial_id` changes. Every other key and value is
/// carried over as parsed, whether or not it would pass `decode_table`.
/// With no payload a table holding just this entry is produced.
///
/// # Errors
///
/// Returns `CodecError` if the existing payload is not JSON or not a JSON
/// object.
pub fn upsert_entry(
    raw: Option<&str>,
    tutorial_id: &TutorialId,
    progress: &TutorialProgress,
) -> Result<String, CodecError> {
    let mut entries = match raw {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Object(entries) => entries,
            other => {
                return Err(CodecError::NotAnObject {
                    found: json_kind(&other),
                });
            }
        },
        None => serde_json::Map::new(),
    };
    let entry = serde_json::to_value(StoredProgressOut::from(progress))?;
    entries.insert(tutorial_id.as_str().to_string(), entry);
    Ok(serde_json::to_string(&entries)?)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
