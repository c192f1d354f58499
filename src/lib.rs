//! pit - a minimal content-addressed version control engine
//!
//! This crate provides the storage engine behind the `pit` command: a
//! content-addressable object store, a staging index, a backward-linked
//! commit chain, and line-level diffs between a commit and its parent.
//!
//! # Example
//!
//! ```no_run
//! use pit::config::PitConfig;
//! use pit::storage::Repository;
//!
//! let repo = Repository::open_with_config(&PitConfig::new("./my_project")).unwrap();
//! repo.add("notes.txt").unwrap();
//! repo.commit("Add notes").unwrap();
//! ```

pub mod config;
pub mod report;
pub mod storage;
