//!  Commit creation and history traversal
//!
//! A commit bundles the staged entries with a parent pointer, a timestamp and
//! a message. Its serialized form is stored in the object store like any other
//! content, so the commit's digest is the hash of that form:
//!
//! ```text
//! {
//!   "parent": "f572d396fae9206628714fb2ce00f72e94f2258f" | null,
//!   "files": [{ "path": "a.txt", "digest": "..." }],
//!   "timestamp": "2026-10-18T09:30:00.000Z",
//!   "message": "c1"
//! }
//! ```
//!
//! Commits only ever point backward, so history is a simple list from HEAD to
//! the root commit.

use std::iter::FusedIterator;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::blob::ObjectStore;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::types::{ObjectId, StagedFile};

/// A commit loaded from (or just written to) the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub id: ObjectId,
    pub parent: Option<ObjectId>,
    pub files: Vec<StagedFile>,
    pub timestamp: String,
    pub message: String,
}

impl Commit {
    /// check if this is the first commit of the chain
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// first entry recorded for a path, in staging order
    pub fn find_file(&self, path: &str) -> Option<&StagedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// A commit record that has not been stored yet.
///
/// This is exactly what gets serialized; the digest is not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommit {
    pub parent: Option<ObjectId>,
    pub files: Vec<StagedFile>,
    pub timestamp: String,
    pub message: String,
}

impl NewCommit {
    /// serialized form, the bytes whose hash becomes the commit digest
    pub fn to_bytes(&self) -> StorageResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn into_commit(self, id: ObjectId) -> Commit {
        Commit {
            id,
            parent: self.parent,
            files: self.files,
            timestamp: self.timestamp,
            message: self.message,
        }
    }
}

/// Builds commit records and walks them backward through the object store.
#[derive(Debug, Clone, Copy)]
pub struct CommitChain<'a> {
    store: &'a ObjectStore,
}

impl<'a> CommitChain<'a> {
    pub fn new(store: &'a ObjectStore) -> Self {
        Self { store }
    }

    /// create a commit record stamped with the current time
    pub fn build(
        parent: Option<ObjectId>,
        files: Vec<StagedFile>,
        message: impl Into<String>,
    ) -> NewCommit {
        Self::build_at(parent, files, message, Utc::now())
    }

    /// create a commit record with an explicit timestamp
    pub fn build_at(
        parent: Option<ObjectId>,
        files: Vec<StagedFile>,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> NewCommit {
        NewCommit {
            parent,
            files,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            message: message.into(),
        }
    }

    /// write a commit record to the store and return it with its digest
    pub fn store(&self, commit: NewCommit) -> StorageResult<Commit> {
        let bytes = commit.to_bytes()?;
        let id = self.store.put(&bytes)?;
        debug!(commit = %id, parent = ?commit.parent.map(|p| p.short()), "stored commit");
        Ok(commit.into_commit(id))
    }

    /// get a commit, failing if the digest does not name one
    pub fn load(&self, id: &ObjectId) -> StorageResult<Commit> {
        self.load_or_none(id)?
            .ok_or_else(|| StorageError::CommitNotFound(id.to_string()))
    }

    /// get a commit, or `None` if the digest is unknown or names something else
    pub fn load_or_none(&self, id: &ObjectId) -> StorageResult<Option<Commit>> {
        let bytes = match self.store.get(id) {
            Ok(bytes) => bytes,
            Err(StorageError::ObjectNotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        match NewCommit::from_bytes(&bytes) {
            Ok(record) => Ok(Some(record.into_commit(*id))),
            Err(e) => {
                debug!(object = %id, error = %e, "object is not a commit record");
                Ok(None)
            }
        }
    }

    /// iterate over history starting from a commit, newest first
    pub fn walk_from(&self, start: Option<ObjectId>) -> History<'a> {
        History {
            chain: *self,
            next: start,
        }
    }
}

/// Lazy backward walk over the commit chain.
///
/// Single pass: once exhausted it stays exhausted. Call `walk_from` again to
/// start over.
pub struct History<'a> {
    chain: CommitChain<'a>,
    next: Option<ObjectId>,
}

impl Iterator for History<'_> {
    type Item = StorageResult<Commit>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;

        match self.chain.load_or_none(&id) {
            Ok(Some(commit)) => {
                self.next = commit.parent;
                Some(Ok(commit))
            }
            Ok(None) => {
                warn!(commit = %id, "commit does not resolve, history ends here");
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}

impl FusedIterator for History<'_> {}
