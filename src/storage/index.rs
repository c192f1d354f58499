//! The staging index.
//!
//! The index is a JSON array of `{path, digest}` entries stored in a single
//! file. It is small, so every operation loads it fully, mutates it in memory
//! and rewrites the whole file atomically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::write_atomic;
use crate::storage::types::StagedFile;

/// How `append` treats a path that is already staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StagingMode {
    /// replace the existing entry in place (last write wins)
    #[default]
    ReplaceDuplicates,
    /// always push a new entry, keeping earlier ones for the same path
    AppendDuplicates,
}

/// Ordered list of entries pending commit.
#[derive(Debug, Clone)]
pub struct StagingIndex {
    path: PathBuf,
    mode: StagingMode,
}

impl StagingIndex {
    pub fn new(path: impl Into<PathBuf>, mode: StagingMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// the index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> StagingMode {
        self.mode
    }

    /// load all staged entries in staging order
    pub fn read_all(&self) -> StorageResult<Vec<StagedFile>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotInitialized(self.path.clone()))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        // an empty file is treated like an empty list
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|e| StorageError::CorruptedData {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// stage an entry
    pub fn append(&self, entry: StagedFile) -> StorageResult<()> {
        let mut entries = self.read_all()?;

        let existing = match self.mode {
            StagingMode::ReplaceDuplicates => entries.iter().position(|e| e.path == entry.path),
            StagingMode::AppendDuplicates => None,
        };

        match existing {
            Some(i) => {
                debug!(path = %entry.path, old = %entries[i].id, new = %entry.id, "restaged path");
                entries[i] = entry;
            }
            None => {
                debug!(path = %entry.path, object = %entry.id, "staged path");
                entries.push(entry);
            }
        }

        self.write_all(&entries)
    }

    /// drop every staged entry
    pub fn clear(&self) -> StorageResult<()> {
        self.write_all(&[])
    }

    fn write_all(&self, entries: &[StagedFile]) -> StorageResult<()> {
        let bytes = serde_json::to_vec(entries)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}
