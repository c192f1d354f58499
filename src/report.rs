//! Console rendering for commits, staged entries and diffs.

use std::fmt;

use crate::storage::{Commit, DiffReport, DiffSegment, FileChange, FileDiff, LineChange, StagedFile};

impl LineChange {
    /// one-character line prefix used in diff output
    pub fn marker(&self) -> char {
        match self {
            LineChange::Unchanged => ' ',
            LineChange::Added => '+',
            LineChange::Removed => '-',
        }
    }
}

/// log entry
impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "commit {}", self.id)?;
        writeln!(f, "Date:   {}", self.timestamp)?;
        writeln!(f)?;
        for line in self.message.lines() {
            writeln!(f, "    {}", line)?;
        }
        Ok(())
    }
}

impl fmt::Display for StagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.id.short(), self.path)
    }
}

impl fmt::Display for DiffSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = self.kind.marker();
        for line in self.text.lines() {
            writeln!(f, "{}{}", marker, line)?;
        }
        Ok(())
    }
}

impl fmt::Display for FileDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.path)?;
        match &self.change {
            FileChange::FirstCommit => writeln!(f, "(first commit)"),
            FileChange::NewFile => writeln!(f, "(new file)"),
            FileChange::Modified(segments) => {
                for segment in segments {
                    write!(f, "{}", segment)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "commit {}", self.commit.id)?;
        for file in &self.files {
            writeln!(f)?;
            write!(f, "{}", file)?;
        }
        Ok(())
    }
}
