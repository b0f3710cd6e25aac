use std::fmt;

use thiserror::Error;

/// Storage call that failed during a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    Delete,
    Upload,
    Move,
    PublicUrl,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageOperation::Delete => write!(f, "delete"),
            StorageOperation::Upload => write!(f, "upload"),
            StorageOperation::Move => write!(f, "move"),
            StorageOperation::PublicUrl => write!(f, "public url"),
        }
    }
}

/// Failures surfaced by image reconciliation and the save workflows built on it.
///
/// The engine never retries and never rolls back: whatever storage mutations
/// happened before the failure stay in place.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("{message}")]
    Storage {
        operation: StorageOperation,
        object: String,
        message: String,
    },

    #[error("Error updating content: {0}")]
    ContentRewrite(String),

    #[error("{0}")]
    Validation(String),
}

impl ReconcileError {
    pub(crate) fn storage(operation: StorageOperation, object: &str, err: anyhow::Error) -> Self {
        ReconcileError::Storage {
            operation,
            object: object.to_string(),
            message: format!("Error during {} of image {}: {}", operation, object, err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
