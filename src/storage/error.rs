//! Storage layer error types
//!
//! All errors that can occur during storage operations are defined here
//! We use `thiserror` for ergonomic error definition and better error messages

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::types::{InvalidObjectId, ObjectId};

/// the main error type for storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// error from libgit2 (line diffing)
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// malformed digest string
    #[error("invalid digest: {0}")]
    InvalidObjectId(#[from] InvalidObjectId),

    /// no object is stored under this digest
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// the commit was not found
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// the working-tree file to stage does not exist
    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    /// the path to stage does not lie inside the working directory
    #[error("path is outside the working directory: {0}")]
    OutsideWorkDir(PathBuf),

    /// an abbreviated digest matches more than one object
    #[error("ambiguous digest {prefix}: {} candidates", .candidates.len())]
    AmbiguousObjectId {
        prefix: String,
        candidates: Vec<ObjectId>,
    },

    /// repo is not initialized
    #[error("repository not initialized: {0}")]
    NotInitialized(PathBuf),

    /// data integrity check failed
    #[error("corrupted data at {path}: {reason}")]
    CorruptedData { path: PathBuf, reason: String },
}

impl StorageError {
    /// check if this error indicates the resource doesn't exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectNotFound(_)
                | StorageError::CommitNotFound(_)
                | StorageError::PathNotFound(_)
        )
    }
}

/// result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
