//! storage layer for pit
//!
//! this module owns everything pit keeps on disk. The command line only uses
//! `Repository`; the components below it are public for embedding and tests.
//!
//!  # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Repository                           │
//! │        (init, add, commit, log, diff over one root)         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │    index    │       │   commit    │       │    refs     │
//!  │  (staging)  │       │  (history)  │       │   (HEAD)    │
//!  └─────────────┘       └─────────────┘       └─────────────┘
//!         │                     │
//!         │              ┌─────────────┐
//!         │              │    diff     │
//!         │              └─────────────┘
//!         │                     │
//!         └──────────┬──────────┘
//!                    ▼
//!             ┌─────────────┐
//!             │    blob     │
//!             │  (objects)  │
//!             └─────────────┘
//!  ```
//!
//! # Usage
//!
//! ```no_run
//! use pit::config::PitConfig;
//! use pit::storage::Repository;
//!
//! let (repo, _) = Repository::init(&PitConfig::new("."))?;
//! repo.add("a.txt")?;
//! let commit = repo.commit("first")?;
//!
//! for entry in repo.history()? {
//!     println!("{}", entry?.id);
//! }
//! if let Some(report) = repo.diff(&commit.id)? {
//!     println!("{}", report);
//! }
//! # Ok::<(), pit::storage::StorageError>(())
//! ```

mod blob;
mod commit;
mod diff;
mod error;
mod fs;
mod index;
mod refs;
mod repository;
mod types;

// Re-export public API
pub use blob::{ObjectStore, MIN_PREFIX_LEN};
pub use commit::{Commit, CommitChain, History, NewCommit};
pub use diff::{diff_commit, render_diff, DiffReport, DiffSegment, FileChange, FileDiff, LineChange};
pub use error::{StorageError, StorageResult};
pub use index::{StagingIndex, StagingMode};
pub use refs::HeadRef;
pub use repository::{InitStatus, Repository};
pub use types::{InvalidObjectId, ObjectId, StagedFile};
