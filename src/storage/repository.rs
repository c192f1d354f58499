//!   Core repository handle.
//!
//!  This ties the object store, the staging index and HEAD together and
//!  provides the operations the command line uses: `init`, `add`, `commit`,
//!  `log` and `diff`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{info, warn};

use crate::config::{PitConfig, RepoLayout};
use crate::storage::blob::ObjectStore;
use crate::storage::commit::{Commit, CommitChain, History};
use crate::storage::diff::{self, DiffReport};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::fs::{create_exclusive, ensure_dir};
use crate::storage::index::StagingIndex;
use crate::storage::refs::HeadRef;
use crate::storage::types::{ObjectId, StagedFile};

/// Outcome of `Repository::init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStatus {
    /// at least one piece of repository state was created
    Created,
    /// HEAD and index were already present and left untouched
    AlreadyInitialized,
}

/// The main repository handle.
#[derive(Debug, Clone)]
pub struct Repository {
    layout: RepoLayout,
    objects: ObjectStore,
    index: StagingIndex,
    head: HeadRef,
}

impl Repository {
    fn from_config(config: &PitConfig) -> Self {
        let layout = config.layout();
        Self {
            objects: ObjectStore::new(&layout.objects),
            index: StagingIndex::new(&layout.index, config.staging_mode),
            head: HeadRef::new(&layout.head),
            layout,
        }
    }

    /// Initialize a repository, keeping any state that already exists.
    pub fn init(config: &PitConfig) -> StorageResult<(Self, InitStatus)> {
        let repo = Self::from_config(config);
        let layout = &repo.layout;

        ensure_dir(&layout.objects)?;
        let head_created = create_exclusive(&layout.head, b"")?;
        let index_created = create_exclusive(&layout.index, b"[]")?;

        let status = if head_created || index_created {
            info!(root = %layout.root.display(), "initialized repository");
            InitStatus::Created
        } else {
            info!(root = %layout.root.display(), "repository already initialized");
            InitStatus::AlreadyInitialized
        };

        Ok((repo, status))
    }

    /// Open an existing repository.
    pub fn open(config: &PitConfig) -> StorageResult<Self> {
        let repo = Self::from_config(config);
        if !repo.layout.exists() || !repo.layout.index.is_file() {
            return Err(StorageError::NotInitialized(repo.layout.root.clone()));
        }
        Ok(repo)
    }

    /// Open the repository, initializing it first if the config allows.
    pub fn open_with_config(config: &PitConfig) -> StorageResult<Self> {
        if config.create_if_missing {
            Self::init(config).map(|(repo, _)| repo)
        } else {
            Self::open(config)
        }
    }

    /// Get the on-disk layout.
    pub fn layout(&self) -> &RepoLayout {
        &self.layout
    }

    /// Get the object store.
    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// Get the commit chain over this repository's objects.
    pub fn chain(&self) -> CommitChain<'_> {
        CommitChain::new(&self.objects)
    }

    /// Get the current HEAD commit, if any.
    pub fn head(&self) -> StorageResult<Option<ObjectId>> {
        self.head.read()
    }

    /// Stage a file from the working directory.
    ///
    /// The entry is recorded under its path relative to the working directory,
    /// with `/` separators, however the caller spelled it.
    pub fn add(&self, path: impl AsRef<Path>) -> StorageResult<StagedFile> {
        let (full, tracked) = self.tracked_path(path.as_ref())?;

        let content = match fs::read(&full) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::PathNotFound(full))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };

        let id = self.objects.put(&content)?;
        let entry = StagedFile::new(tracked, id);
        self.index.append(entry.clone())?;

        Ok(entry)
    }

    /// resolve a user-supplied path to (file on disk, path recorded in the index)
    fn tracked_path(&self, path: &Path) -> StorageResult<(PathBuf, String)> {
        let full = normalize(&self.layout.work_path(path));

        let (Some(parent), Some(name)) = (full.parent(), full.file_name()) else {
            return Err(StorageError::OutsideWorkDir(full));
        };
        let parent = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };
        let parent = match parent.canonicalize() {
            Ok(parent) => parent,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::PathNotFound(full))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        let work_dir = self.layout.work_dir.canonicalize()?;

        let resolved = parent.join(name);
        let relative = match resolved.strip_prefix(&work_dir) {
            Ok(relative) if relative.components().next().is_some() => relative,
            _ => return Err(StorageError::OutsideWorkDir(full)),
        };

        let tracked = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Ok((resolved, tracked))
    }

    /// List staged entries in staging order.
    pub fn staged(&self) -> StorageResult<Vec<StagedFile>> {
        self.index.read_all()
    }

    /// Record the staged entries as a new commit on top of HEAD.
    ///
    /// HEAD moves to the new commit and the index is cleared.
    pub fn commit(&self, message: impl Into<String>) -> StorageResult<Commit> {
        let files = self.index.read_all()?;
        let parent = self.head.read()?;

        let record = CommitChain::build(parent, files, message);
        let commit = self.chain().store(record)?;

        self.head.write(&commit.id)?;
        self.index.clear()?;

        info!(commit = %commit.id, files = commit.files.len(), "created commit");
        Ok(commit)
    }

    /// Walk history from HEAD, newest first.
    pub fn history(&self) -> StorageResult<History<'_>> {
        Ok(self.chain().walk_from(self.head()?))
    }

    /// Get commit history from HEAD.
    pub fn log(&self, limit: Option<usize>) -> StorageResult<Vec<Commit>> {
        let iter = self.history()?;
        match limit {
            Some(n) => iter.take(n).collect(),
            None => iter.collect(),
        }
    }

    /// Resolve `HEAD`, a full digest or an abbreviated digest.
    pub fn resolve(&self, rev: &str) -> StorageResult<Option<ObjectId>> {
        if rev.eq_ignore_ascii_case("HEAD") {
            return self.head();
        }
        self.objects.resolve_prefix(rev)
    }

    /// Diff a commit against its parent.
    ///
    /// Returns `None` if the digest does not name a commit.
    pub fn diff(&self, id: &ObjectId) -> StorageResult<Option<DiffReport>> {
        let chain = self.chain();
        let Some(commit) = chain.load_or_none(id)? else {
            return Ok(None);
        };

        let parent = match commit.parent {
            Some(parent_id) => {
                let parent = chain.load_or_none(&parent_id)?;
                if parent.is_none() {
                    warn!(commit = %commit.id, parent = %parent_id, "parent commit does not resolve");
                }
                parent
            }
            None => None,
        };

        let files = diff::diff_commit(&self.objects, &commit, parent.as_ref())?;
        Ok(Some(DiffReport { commit, files }))
    }
}

/// drop `.` segments and fold `..` into the preceding segment
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::diff::{DiffSegment, FileChange, LineChange};
    use crate::storage::index::StagingMode;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Repository) {
        setup_with_mode(StagingMode::default())
    }

    fn setup_with_mode(mode: StagingMode) -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let config = PitConfig::new(dir.path()).staging_mode(mode);
        let (repo, status) = Repository::init(&config).unwrap();
        assert_eq!(status, InitStatus::Created);
        (dir, repo)
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_init_creates_layout() {
        let (_dir, repo) = setup();
        let layout = repo.layout();

        assert!(layout.objects.is_dir());
        assert_eq!(fs::read(&layout.head).unwrap(), b"");
        assert_eq!(fs::read(&layout.index).unwrap(), b"[]");
        assert_eq!(repo.head().unwrap(), None);
    }

    #[test]
    fn test_init_twice_keeps_state() {
        let (dir, repo) = setup();
        write_file(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        repo.commit("c1").unwrap();
        repo.add("a.txt").unwrap();

        let head_before = fs::read(&repo.layout().head).unwrap();
        let index_before = fs::read(&repo.layout().index).unwrap();

        let (_again, status) = Repository::init(&PitConfig::new(dir.path())).unwrap();
        assert_eq!(status, InitStatus::AlreadyInitialized);
        assert_eq!(fs::read(&repo.layout().head).unwrap(), head_before);
        assert_eq!(fs::read(&repo.layout().index).unwrap(), index_before);
    }

    #[test]
    fn test_open_requires_init() {
        let dir = TempDir::new().unwrap();
        let config = PitConfig::new(dir.path()).create_if_missing(false);

        assert!(matches!(
            Repository::open(&config),
            Err(StorageError::NotInitialized(_))
        ));
        assert!(Repository::open_with_config(&config).is_err());

        let repo = Repository::open_with_config(&config.create_if_missing(true)).unwrap();
        assert!(repo.layout().exists());
    }

    #[test]
    fn test_add_stages_file() {
        let (dir, repo) = setup();
        write_file(&dir, "a.txt", "hello\n");

        let entry = repo.add("a.txt").unwrap();
        assert_eq!(entry.path, "a.txt");
        assert_eq!(repo.objects().get(&entry.id).unwrap(), b"hello\n");
        assert_eq!(repo.staged().unwrap(), vec![entry]);
    }

    #[test]
    fn test_add_missing_file() {
        let (_dir, repo) = setup();

        let result = repo.add("missing.txt");
        assert!(matches!(result, Err(StorageError::PathNotFound(_))));
        assert!(repo.staged().unwrap().is_empty());
    }

    #[test]
    fn test_commit_clears_staging() {
        let (dir, repo) = setup();
        write_file(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();

        let commit = repo.commit("c1").unwrap();

        assert!(repo.staged().unwrap().is_empty());
        assert_eq!(repo.head().unwrap(), Some(commit.id));
        assert_eq!(commit.files.len(), 1);
        assert!(commit.is_root());
    }

    #[test]
    fn test_chain_integrity() {
        let (dir, repo) = setup();

        let mut ids = Vec::new();
        for i in 0..5 {
            write_file(&dir, "a.txt", &format!("version {}\n", i));
            repo.add("a.txt").unwrap();
            ids.push(repo.commit(format!("c{}", i)).unwrap().id);
        }

        let log = repo.log(None).unwrap();
        assert_eq!(log.len(), 5);

        let logged: Vec<_> = log.iter().map(|c| c.id).collect();
        ids.reverse();
        assert_eq!(logged, ids);
        assert!(log.last().unwrap().is_root());

        assert_eq!(repo.log(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_diff_scenario() {
        let (dir, repo) = setup();

        write_file(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        let c1 = repo.commit("c1").unwrap();

        write_file(&dir, "a.txt", "hello\nworld\n");
        repo.add("a.txt").unwrap();
        let c2 = repo.commit("c2").unwrap();

        let first = repo.diff(&c1.id).unwrap().unwrap();
        assert_eq!(first.files[0].change, FileChange::FirstCommit);

        let report = repo.diff(&c2.id).unwrap().unwrap();
        assert_eq!(report.commit.id, c2.id);
        assert_eq!(report.files.len(), 1);
        assert_eq!(
            report.files[0].change,
            FileChange::Modified(vec![
                DiffSegment::new(LineChange::Unchanged, "hello\n"),
                DiffSegment::new(LineChange::Added, "world\n"),
            ])
        );
    }

    #[test]
    fn test_diff_unknown_commit() {
        let (dir, repo) = setup();
        assert_eq!(repo.diff(&ObjectId::for_content(b"nope").unwrap()).unwrap(), None);

        // a file blob is not a commit either
        write_file(&dir, "a.txt", "hello\n");
        let entry = repo.add("a.txt").unwrap();
        assert_eq!(repo.diff(&entry.id).unwrap(), None);
    }

    #[test]
    fn test_duplicate_paths_replaced_by_default() {
        let (dir, repo) = setup();

        write_file(&dir, "a.txt", "v1\n");
        repo.add("a.txt").unwrap();
        write_file(&dir, "a.txt", "v2\n");
        let latest = repo.add("a.txt").unwrap();

        let commit = repo.commit("dup").unwrap();
        assert_eq!(commit.files, vec![latest]);
    }

    #[test]
    fn test_duplicate_paths_appended_first_match_wins() {
        let (dir, repo) = setup_with_mode(StagingMode::AppendDuplicates);

        write_file(&dir, "a.txt", "base\n");
        repo.add("a.txt").unwrap();
        repo.commit("c1").unwrap();

        write_file(&dir, "a.txt", "base\none\n");
        repo.add("a.txt").unwrap();
        write_file(&dir, "a.txt", "base\ntwo\n");
        repo.add("a.txt").unwrap();
        let c2 = repo.commit("c2").unwrap();
        assert_eq!(c2.files.len(), 2);

        // both entries are reported, each against the parent's only entry
        let report = repo.diff(&c2.id).unwrap().unwrap();
        assert_eq!(report.files.len(), 2);
        assert_eq!(
            report.files[0].change,
            FileChange::Modified(vec![
                DiffSegment::new(LineChange::Unchanged, "base\n"),
                DiffSegment::new(LineChange::Added, "one\n"),
            ])
        );
        assert_eq!(
            report.files[1].change,
            FileChange::Modified(vec![
                DiffSegment::new(LineChange::Unchanged, "base\n"),
                DiffSegment::new(LineChange::Added, "two\n"),
            ])
        );
    }

    #[test]
    fn test_resolve() {
        let (dir, repo) = setup();
        assert_eq!(repo.resolve("HEAD").unwrap(), None);

        write_file(&dir, "a.txt", "hello\n");
        repo.add("a.txt").unwrap();
        let commit = repo.commit("c1").unwrap();

        assert_eq!(repo.resolve("HEAD").unwrap(), Some(commit.id));
        assert_eq!(repo.resolve(&commit.id.to_hex()).unwrap(), Some(commit.id));
        assert_eq!(repo.resolve(&commit.id.short()).unwrap(), Some(commit.id));
    }

    #[test]
    fn test_add_normalizes_path_spelling() {
        let (dir, repo) = setup();
        fs::create_dir(dir.path().join("docs")).unwrap();
        write_file(&dir, "a.txt", "hello\n");
        write_file(&dir, "docs/b.txt", "b\n");

        repo.add("a.txt").unwrap();
        repo.add("docs/b.txt").unwrap();
        let c1 = repo.commit("c1").unwrap();

        write_file(&dir, "a.txt", "hello\nworld\n");
        assert_eq!(repo.add("./a.txt").unwrap().path, "a.txt");
        repo.add("a.txt").unwrap();
        repo.add(dir.path().join("a.txt")).unwrap();
        assert_eq!(repo.add("docs/../docs/./b.txt").unwrap().path, "docs/b.txt");

        let staged: Vec<_> = repo.staged().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(staged, vec!["a.txt", "docs/b.txt"]);

        let c2 = repo.commit("c2").unwrap();
        assert_eq!(c2.parent, Some(c1.id));

        let report = repo.diff(&c2.id).unwrap().unwrap();
        assert_eq!(
            report.files[0].change,
            FileChange::Modified(vec![
                DiffSegment::new(LineChange::Unchanged, "hello\n"),
                DiffSegment::new(LineChange::Added, "world\n"),
            ])
        );
        assert!(report.files[1].is_unchanged());
    }

    #[test]
    fn test_add_outside_work_dir() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("x.txt"), "x\n").unwrap();

        let (_dir, repo) = setup();
        assert!(matches!(
            repo.add(outside.path().join("x.txt")),
            Err(StorageError::OutsideWorkDir(_))
        ));

        let escaping = format!("../{}/x.txt", outside.path().file_name().unwrap().to_string_lossy());
        // both temp dirs live in the same system temp directory
        assert!(matches!(repo.add(&escaping), Err(StorageError::OutsideWorkDir(_))));
        assert!(repo.staged().unwrap().is_empty());
    }
}
