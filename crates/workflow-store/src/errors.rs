//! Error types for the workflow store

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// No artifact exists for the requested name
    #[error("workflow '{0}' not found")]
    NotFound(String),

    /// Artifact exists but does not match the workflow schema
    #[error("workflow '{name}' is malformed: {reason}")]
    Malformed { name: String, reason: String },

    /// Underlying storage failure
    #[error("workflow store I/O error: {0}")]
    Io(String),
}

impl StoreError {
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
