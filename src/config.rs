//! Repository configuration.
//!
//! Every on-disk location is derived from the working directory given here and
//! handed to each storage component explicitly.

use std::path::{Path, PathBuf};

pub use crate::storage::StagingMode;

/// name of the hidden repository directory inside the working directory
pub const REPO_DIR: &str = ".pit";

/// Repository configuration options.
#[derive(Debug, Clone)]
pub struct PitConfig {
    /// Working directory that holds the tracked files and the repository.
    pub work_dir: PathBuf,
    /// Initialize the repository on open if it is missing.
    pub create_if_missing: bool,
    /// How repeated `add` of one path is staged.
    pub staging_mode: StagingMode,
    /// Enable verbose logging.
    pub verbose: bool,
}

impl Default for PitConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            create_if_missing: true,
            staging_mode: StagingMode::default(),
            verbose: false,
        }
    }
}

impl PitConfig {
    /// Create a new configuration for the given working directory.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Default::default()
        }
    }

    /// Set create_if_missing flag.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Set the duplicate-path staging behavior.
    pub fn staging_mode(mut self, mode: StagingMode) -> Self {
        self.staging_mode = mode;
        self
    }

    /// Set verbose flag.
    pub fn verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "pit=debug"
        } else {
            "warn"
        }
    }

    /// On-disk layout for this configuration.
    pub fn layout(&self) -> RepoLayout {
        RepoLayout::new(&self.work_dir)
    }
}

/// Paths of everything the repository keeps on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoLayout {
    pub work_dir: PathBuf,
    pub root: PathBuf,
    pub objects: PathBuf,
    pub head: PathBuf,
    pub index: PathBuf,
}

impl RepoLayout {
    pub fn new(work_dir: impl AsRef<Path>) -> Self {
        let work_dir = work_dir.as_ref().to_path_buf();
        let root = work_dir.join(REPO_DIR);
        Self {
            objects: root.join("objects"),
            head: root.join("HEAD"),
            index: root.join("index"),
            root,
            work_dir,
        }
    }

    /// check if the repository directory exists
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// resolve a user-supplied path against the working directory
    pub fn work_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.work_dir.join(path)
        }
    }
}
