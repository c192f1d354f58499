//! Content-addressed object storage.
//!
//! Every object (a tracked file's raw bytes or a serialized commit record) is
//! stored once under the SHA-1 of its content. Objects are sharded by the first
//! two hex characters of the digest:
//!
//! ```text
//! objects/
//!   f5/
//!     72d396fae9206628714fb2ce00f72e94f2258f
//! ```
//!
//! Objects are immutable: an existing object file is never rewritten.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::{ensure_dir, write_new};
use crate::storage::types::{validate_hex, InvalidObjectId, ObjectId};

/// shortest abbreviated digest accepted by `resolve_prefix`
pub const MIN_PREFIX_LEN: usize = 4;

/// Object store rooted at `objects/`.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// create a store over an existing (or to be created) objects directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// the objects directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// path of the file that holds (or would hold) an object
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        let (dir, file) = id.shard();
        self.root.join(dir).join(file)
    }

    /// check whether an object is stored
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// store content and return its digest
    ///
    /// writing content that is already stored is a no-op
    pub fn put(&self, content: &[u8]) -> StorageResult<ObjectId> {
        let id = ObjectId::for_content(content)?;
        let path = self.object_path(&id);

        if path.is_file() {
            debug!(object = %id, "object already stored, skipping write");
            return Ok(id);
        }

        let (dir, _) = id.shard();
        ensure_dir(&self.root.join(dir))?;

        if write_new(&path, content)? {
            debug!(object = %id, size = content.len(), "stored object");
        } else {
            debug!(object = %id, "object appeared concurrently, keeping existing file");
        }

        Ok(id)
    }

    /// read an object's content
    pub fn get(&self, id: &ObjectId) -> StorageResult<Vec<u8>> {
        match fs::read(self.object_path(id)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::ObjectNotFound(*id)),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// expand an abbreviated digest to the single stored object it names
    ///
    /// returns `None` if no object matches
    pub fn resolve_prefix(&self, prefix: &str) -> StorageResult<Option<ObjectId>> {
        let prefix = prefix.trim().to_ascii_lowercase();

        if prefix.len() == ObjectId::HEX_LEN {
            let id = ObjectId::from_hex(&prefix)?;
            return Ok(self.contains(&id).then_some(id));
        }
        if prefix.len() < MIN_PREFIX_LEN {
            return Err(InvalidObjectId::TooShort(prefix.len()).into());
        }
        if prefix.len() > ObjectId::HEX_LEN {
            return Err(InvalidObjectId::WrongLength(prefix.len()).into());
        }
        validate_hex(&prefix)?;

        let (dir, rest) = prefix.split_at(ObjectId::SHARD_LEN);
        let shard = self.root.join(dir);
        let entries = match fs::read_dir(&shard) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(rest) {
                continue;
            }
            // temp files and other strays are not objects
            if let Ok(id) = ObjectId::from_hex(&format!("{}{}", dir, name)) {
                candidates.push(id);
            }
        }

        match candidates.len() {
            0 => Ok(None),
            1 => Ok(candidates.pop()),
            _ => {
                candidates.sort();
                Err(StorageError::AmbiguousObjectId { prefix, candidates })
            }
        }
    }
}
