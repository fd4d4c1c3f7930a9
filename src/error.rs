//! Unified error type for the engine and its command boundary.
//!
//! `AppError` is the single error type returned by every engine operation and
//! every command handler. It serializes as `{ "kind": "...", "message": "..." }`
//! so JSON consumers can programmatically distinguish error categories.

use serde::ser::SerializeStruct;

/// Application-level error returned by all engine operations.
///
/// Each variant maps to a distinct failure domain. Firewall failures
/// (`ExecutionFailed`, `TimedOut`) never corrupt the intent store;
/// `Persistence` failures always propagate.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed endpoint or range text.
    #[error("{0}")]
    Validation(String),

    /// The firewall rejected a rule command (nonzero exit, message preserved).
    #[error("{0}")]
    ExecutionFailed(String),

    /// A rule command exceeded its bounded wait.
    #[error("{0}")]
    TimedOut(String),

    /// The durable intent/settings store could not be written or read.
    #[error("{0}")]
    Persistence(String),

    /// Invalid or missing user input.
    #[error("{0}")]
    InvalidInput(String),
}

impl AppError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "Validation",
            AppError::ExecutionFailed(_) => "ExecutionFailed",
            AppError::TimedOut(_) => "TimedOut",
            AppError::Persistence(_) => "Persistence",
            AppError::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

// ---- From implementations for ergonomic error conversion ----

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Persistence(format!("{err:#}"))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Persistence(err.to_string())
    }
}
