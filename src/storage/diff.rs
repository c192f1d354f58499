//! Line-level diffs between a commit and its parent.
//!
//! Line alignment is delegated to libgit2's xdiff through `git2::Patch`. The
//! patch is generated with enough context that every line of both inputs is
//! reported, and consecutive lines of the same kind are merged into segments.

use git2::{DiffOptions, Patch};

use crate::storage::blob::ObjectStore;
use crate::storage::commit::Commit;
use crate::storage::error::StorageResult;
use crate::storage::types::ObjectId;

/// Classification of a span of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    Unchanged,
    Added,
    Removed,
}

impl LineChange {
    fn from_origin(origin: char) -> Option<Self> {
        match origin {
            ' ' => Some(LineChange::Unchanged),
            '+' => Some(LineChange::Added),
            '-' => Some(LineChange::Removed),
            // file headers, hunk headers and end-of-file newline markers
            _ => None,
        }
    }
}

/// A contiguous run of lines with the same classification.
///
/// `text` keeps the line terminators of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    pub kind: LineChange,
    pub text: String,
}

impl DiffSegment {
    pub fn new(kind: LineChange, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// What happened to one file of a commit relative to the parent commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// the commit has no parent, there is nothing to compare against
    FirstCommit,
    /// the parent commit does not contain this path
    NewFile,
    /// line-level comparison against the parent's version
    Modified(Vec<DiffSegment>),
}

/// Diff of one file entry of a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: String,
    pub id: ObjectId,
    pub change: FileChange,
}

impl FileDiff {
    /// check if the content is identical to the parent's version
    pub fn is_unchanged(&self) -> bool {
        match &self.change {
            FileChange::Modified(segments) => {
                segments.iter().all(|s| s.kind == LineChange::Unchanged)
            }
            _ => false,
        }
    }
}

/// Per-file report for a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    pub commit: Commit,
    pub files: Vec<FileDiff>,
}

/// compute the line-level diff of two texts
pub fn render_diff(old: &[u8], new: &[u8]) -> StorageResult<Vec<DiffSegment>> {
    let mut segments = Vec::new();

    // identical inputs produce no hunks at all
    if old == new {
        if !new.is_empty() {
            segments.push(DiffSegment::new(
                LineChange::Unchanged,
                String::from_utf8_lossy(new),
            ));
        }
        return Ok(segments);
    }

    let context = u32::try_from(line_count(old).max(line_count(new)) + 1).unwrap_or(u32::MAX);
    let mut opts = DiffOptions::new();
    opts.context_lines(context)
        .interhunk_lines(context)
        .force_text(true);

    let patch = Patch::from_buffers(old, None, new, None, Some(&mut opts))?;

    for hunk in 0..patch.num_hunks() {
        for index in 0..patch.num_lines_in_hunk(hunk)? {
            let line = patch.line_in_hunk(hunk, index)?;
            let Some(kind) = LineChange::from_origin(line.origin()) else {
                continue;
            };
            push_line(&mut segments, kind, &String::from_utf8_lossy(line.content()));
        }
    }

    Ok(segments)
}

fn push_line(segments: &mut Vec<DiffSegment>, kind: LineChange, line: &str) {
    match segments.last_mut() {
        Some(last) if last.kind == kind => last.text.push_str(line),
        _ => segments.push(DiffSegment::new(kind, line)),
    }
}

fn line_count(text: &[u8]) -> usize {
    text.iter().filter(|&&b| b == b'\n').count() + 1
}

/// compare every file of `target` with the same path in `parent`
///
/// A root commit reports every file as `FirstCommit` without looking at
/// `parent`. For other commits `parent` is the loaded parent commit, or `None`
/// if it could not be resolved, in which case every file is `NewFile`.
/// Duplicate paths in `target` are each reported; lookups in `parent` use the
/// first entry for a path.
pub fn diff_commit(
    store: &ObjectStore,
    target: &Commit,
    parent: Option<&Commit>,
) -> StorageResult<Vec<FileDiff>> {
    let mut files = Vec::with_capacity(target.files.len());

    for entry in &target.files {
        let new = store.get(&entry.id)?;
        let previous = parent.and_then(|p| p.find_file(&entry.path));

        let change = match previous {
            _ if target.is_root() => FileChange::FirstCommit,
            None => FileChange::NewFile,
            Some(previous) => {
                let old = store.get(&previous.id)?;
                FileChange::Modified(render_diff(&old, &new)?)
            }
        };

        files.push(FileDiff {
            path: entry.path.clone(),
            id: entry.id,
            change,
        });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::commit::CommitChain;
    use crate::storage::error::StorageError;
    use crate::storage::types::StagedFile;
    use tempfile::TempDir;

    fn segment(kind: LineChange, text: &str) -> DiffSegment {
        DiffSegment::new(kind, text)
    }

    #[test]
    fn test_added_line() {
        let segments = render_diff(b"hello\n", b"hello\nworld\n").unwrap();
        assert_eq!(
            segments,
            vec![
                segment(LineChange::Unchanged, "hello\n"),
                segment(LineChange::Added, "world\n"),
            ]
        );
    }

    #[test]
    fn test_removed_line() {
        let segments = render_diff(b"a\nb\nc\n", b"a\nc\n").unwrap();
        assert_eq!(
            segments,
            vec![
                segment(LineChange::Unchanged, "a\n"),
                segment(LineChange::Removed, "b\n"),
                segment(LineChange::Unchanged, "c\n"),
            ]
        );
    }

    #[test]
    fn test_replaced_line() {
        let segments = render_diff(b"a\nold\nz\n", b"a\nnew\nz\n").unwrap();
        assert_eq!(
            segments,
            vec![
                segment(LineChange::Unchanged, "a\n"),
                segment(LineChange::Removed, "old\n"),
                segment(LineChange::Added, "new\n"),
                segment(LineChange::Unchanged, "z\n"),
            ]
        );
    }

    #[test]
    fn test_identical_texts() {
        let segments = render_diff(b"same\ntext\n", b"same\ntext\n").unwrap();
        assert_eq!(segments, vec![segment(LineChange::Unchanged, "same\ntext\n")]);

        assert!(render_diff(b"", b"").unwrap().is_empty());
    }

    #[test]
    fn test_distant_changes_keep_every_line() {
        let old: String = (0..50).map(|i| format!("line {}\n", i)).collect();
        let new = old.replace("line 3\n", "line three\n").replace("line 45\n", "line forty-five\n");

        let segments = render_diff(old.as_bytes(), new.as_bytes()).unwrap();
        let rebuilt_new: String = segments
            .iter()
            .filter(|s| s.kind != LineChange::Removed)
            .map(|s| s.text.as_str())
            .collect();
        let rebuilt_old: String = segments
            .iter()
            .filter(|s| s.kind != LineChange::Added)
            .map(|s| s.text.as_str())
            .collect();

        assert_eq!(rebuilt_new, new);
        assert_eq!(rebuilt_old, old);
    }

    #[test]
    fn test_diff_commit() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        let chain = CommitChain::new(&store);

        let a1 = StagedFile::new("a.txt", store.put(b"hello\n").unwrap());
        let c1 = chain.store(CommitChain::build(None, vec![a1], "c1")).unwrap();

        let a2 = StagedFile::new("a.txt", store.put(b"hello\nworld\n").unwrap());
        let b = StagedFile::new("b.txt", store.put(b"new\n").unwrap());
        let c2 = chain.store(CommitChain::build(Some(c1.id), vec![a2, b], "c2")).unwrap();

        let first = diff_commit(&store, &c1, None).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].change, FileChange::FirstCommit);

        let second = diff_commit(&store, &c2, Some(&c1)).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(
            second[0].change,
            FileChange::Modified(vec![
                segment(LineChange::Unchanged, "hello\n"),
                segment(LineChange::Added, "world\n"),
            ])
        );
        assert_eq!(second[1].path, "b.txt");
        assert_eq!(second[1].change, FileChange::NewFile);

        // parent named but not resolvable
        let orphaned = diff_commit(&store, &c2, None).unwrap();
        assert!(orphaned.iter().all(|f| f.change == FileChange::NewFile));
    }

    #[test]
    fn test_unchanged_file() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        let chain = CommitChain::new(&store);

        let a = StagedFile::new("a.txt", store.put(b"stable\n").unwrap());
        let c1 = chain.store(CommitChain::build(None, vec![a.clone()], "c1")).unwrap();
        let c2 = chain.store(CommitChain::build(Some(c1.id), vec![a], "c2")).unwrap();

        let files = diff_commit(&store, &c2, Some(&c1)).unwrap();
        assert!(files[0].is_unchanged());
    }

    #[test]
    fn test_missing_blob_in_root_commit() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join("objects"));
        let chain = CommitChain::new(&store);

        let dangling = ObjectId::for_content(b"never stored").unwrap();
        let entry = StagedFile::new("a.txt", dangling);
        let c1 = chain.store(CommitChain::build(None, vec![entry], "c1")).unwrap();

        let result = diff_commit(&store, &c1, None);
        assert!(matches!(result, Err(StorageError::ObjectNotFound(id)) if id == dangling));
    }
}
