// ── Core error types ──
//
// `CoreError` covers failures to load or address the documents the
// pipeline works on. Business-rule violations found while post-processing
// are never `CoreError`s: they travel as `ErrorRecord`s inside a
// `PostProcessError` so a caller can report every one of them at once.

use thiserror::Error;

use crate::tag::ErrorRecord;

/// Unified error type for document loading and path addressing.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Document errors ──────────────────────────────────────────────
    #[error("Invalid JSON in {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Device snapshot is missing {field}")]
    MissingField { field: String },

    // ── Path errors ──────────────────────────────────────────────────
    #[error("Cannot address '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    // ── Dispatch errors ──────────────────────────────────────────────
    #[error("Unknown post-process tag '{0}'")]
    UnknownTag(String),
}

impl CoreError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Aggregate rejection from one or more tag processors.
///
/// Carries one record per problem, in discovery order.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", summarize(.records))]
pub struct PostProcessError {
    records: Vec<ErrorRecord>,
}

impl PostProcessError {
    pub fn new(records: Vec<ErrorRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ErrorRecord> {
        self.records
    }
}

fn summarize(records: &[ErrorRecord]) -> String {
    match records {
        [] => "post-processing failed".into(),
        [only] => only.message.clone(),
        many => format!(
            "{} post-processing errors: {}",
            many.len(),
            many.iter()
                .map(|r| r.message.as_str())
                .collect::<Vec<_>>()
                .join("; ")
        ),
    }
}
