//! The HEAD pointer.
//!
//! There are no branches: HEAD is a single plain-text file holding the digest
//! of the most recent commit, or nothing at all before the first commit.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::write_atomic;
use crate::storage::types::ObjectId;

/// Manages the HEAD file.
#[derive(Debug, Clone)]
pub struct HeadRef {
    path: PathBuf,
}

impl HeadRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// the HEAD file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current HEAD commit.
    ///
    /// A missing or unreadable HEAD file means there are no commits yet.
    pub fn read(&self) -> StorageResult<Option<ObjectId>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "HEAD unreadable, assuming no commits");
                return Ok(None);
            }
        };

        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        ObjectId::from_hex(content)
            .map(Some)
            .map_err(|e| StorageError::CorruptedData {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    /// Point HEAD at a new commit.
    pub fn write(&self, id: &ObjectId) -> StorageResult<()> {
        write_atomic(&self.path, id.to_hex().as_bytes())?;
        debug!(head = %id, "updated HEAD");
        Ok(())
    }
}
