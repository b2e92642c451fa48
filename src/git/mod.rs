//! Read-only working-tree context from git.
//!
//! The provider opens the repository containing the scan root, reads its
//! status and diff, and reports paths relative to the scan root. It never
//! writes to the repository. git2 repositories are not `Send`, so each
//! snapshot opens its own handle.

use git2::{DiffFormat, DiffOptions, ErrorCode, Repository, Status, StatusOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{} is not inside a git repository", path.display())]
    NotARepository { path: PathBuf },

    #[error("Bare repositories are not supported")]
    BareRepository,

    #[error(transparent)]
    Git(#[from] git2::Error),
}

/// Working-tree status at the time of the scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitStatusSnapshot {
    pub branch: Option<String>,
    /// HEAD commit id, absent on an unborn branch
    pub head: Option<String>,
    pub staged: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub untracked: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diff: String,
}

/// Git state a report was computed against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitState {
    pub branch: Option<String>,
    pub head: Option<String>,
    pub dirty: bool,
}

impl GitStatusSnapshot {
    pub fn is_dirty(&self) -> bool {
        !(self.staged.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
            && self.deleted.is_empty())
    }

    /// Paths that exist in the working tree and differ from HEAD.
    pub fn changed_paths(&self) -> BTreeSet<String> {
        self.staged
            .iter()
            .chain(&self.modified)
            .chain(&self.untracked)
            .filter(|path| !self.deleted.contains(*path))
            .cloned()
            .collect()
    }

    /// Every path touched in any way, deletions included.
    pub fn touched_paths(&self) -> BTreeSet<String> {
        self.changed_paths()
            .into_iter()
            .chain(self.deleted.iter().cloned())
            .collect()
    }

    pub fn state(&self) -> GitState {
        GitState {
            branch: self.branch.clone(),
            head: self.head.clone(),
            dirty: self.is_dirty(),
        }
    }
}

// Pure function: repository-relative path to scan-root-relative path
fn relative_to_root(repo_path: &str, root_prefix: &str) -> Option<String> {
    if root_prefix.is_empty() {
        return Some(repo_path.to_string());
    }
    repo_path
        .strip_prefix(root_prefix)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

fn root_prefix(workdir: &Path, root: &Path) -> String {
    let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    crate::core::normalize_relative(&workdir, &root)
}

pub struct GitContextProvider;

impl GitContextProvider {
    /// Read status and diff for the repository containing `root`.
    pub fn snapshot(root: &Path) -> Result<GitStatusSnapshot, GitError> {
        let repo = Repository::discover(root).map_err(|e| match e.code() {
            ErrorCode::NotFound => GitError::NotARepository {
                path: root.to_path_buf(),
            },
            _ => GitError::Git(e),
        })?;
        let workdir = repo.workdir().ok_or(GitError::BareRepository)?.to_path_buf();
        let prefix = root_prefix(&workdir, root);
        tracing::debug!(workdir = %workdir.display(), prefix = %prefix, "Reading git status");

        let mut snapshot = GitStatusSnapshot::default();
        Self::read_head(&repo, &mut snapshot)?;
        Self::read_status(&repo, &prefix, &mut snapshot)?;
        snapshot.diff = Self::read_diff(&repo, &prefix)?;
        Ok(snapshot)
    }

    fn read_head(repo: &Repository, snapshot: &mut GitStatusSnapshot) -> Result<(), GitError> {
        match repo.head() {
            Ok(head) => {
                snapshot.branch = head
                    .is_branch()
                    .then(|| head.shorthand().map(str::to_string))
                    .flatten();
                snapshot.head = head.peel_to_commit().ok().map(|c| c.id().to_string());
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
                snapshot.branch = repo
                    .find_reference("HEAD")
                    .ok()
                    .and_then(|r| r.symbolic_target().map(str::to_string))
                    .map(|target| target.trim_start_matches("refs/heads/").to_string());
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    fn read_status(
        repo: &Repository,
        prefix: &str,
        snapshot: &mut GitStatusSnapshot,
    ) -> Result<(), GitError> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = repo.statuses(Some(&mut options))?;

        let staged = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE;
        let modified = Status::WT_MODIFIED | Status::WT_RENAMED | Status::WT_TYPECHANGE;
        let deleted = Status::INDEX_DELETED | Status::WT_DELETED;

        for entry in statuses.iter() {
            let Some(path) = entry.path().and_then(|p| relative_to_root(p, prefix)) else {
                continue;
            };
            let status = entry.status();
            if status.intersects(staged) {
                snapshot.staged.insert(path.clone());
            }
            if status.intersects(modified) {
                snapshot.modified.insert(path.clone());
            }
            if status.contains(Status::WT_NEW) {
                snapshot.untracked.insert(path.clone());
            }
            if status.intersects(deleted) {
                snapshot.deleted.insert(path);
            }
        }
        Ok(())
    }

    fn read_diff(repo: &Repository, prefix: &str) -> Result<String, GitError> {
        let mut options = DiffOptions::new();
        if !prefix.is_empty() {
            options.pathspec(prefix);
        }

        let head_tree = match repo.head() {
            Ok(head) => head.peel_to_tree().ok(),
            Err(_) => None,
        };
        let staged = repo.diff_tree_to_index(head_tree.as_ref(), None, Some(&mut options))?;
        let unstaged = repo.diff_index_to_workdir(None, Some(&mut options))?;

        let mut text = String::new();
        for diff in [&staged, &unstaged] {
            diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
                if matches!(line.origin(), '+' | '-' | ' ') {
                    text.push(line.origin());
                }
                text.push_str(&String::from_utf8_lossy(line.content()));
                true
            })?;
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::fs;
    use tempfile::TempDir;

    fn commit_all(repo: &Repository, message: &str) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
    }

    #[test]
    fn test_not_a_repository() {
        let dir = TempDir::new().unwrap();
        // A repository may exist above the temp dir; only assert when none does
        if Repository::discover(dir.path()).is_err() {
            assert!(matches!(
                GitContextProvider::snapshot(dir.path()),
                Err(GitError::NotARepository { .. })
            ));
        }
    }

    #[test]
    fn test_snapshot_classifies_changes() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("kept.py"), "a = 1\n").unwrap();
        fs::write(dir.path().join("edited.py"), "b = 1\n").unwrap();
        fs::write(dir.path().join("removed.py"), "c = 1\n").unwrap();
        commit_all(&repo, "initial");

        fs::write(dir.path().join("edited.py"), "b = 2\n").unwrap();
        fs::remove_file(dir.path().join("removed.py")).unwrap();
        fs::write(dir.path().join("new.py"), "d = 1\n").unwrap();
        fs::write(dir.path().join("staged.py"), "e = 1\n").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("staged.py")).unwrap();
        index.write().unwrap();

        let snapshot = GitContextProvider::snapshot(dir.path()).unwrap();
        assert!(snapshot.head.is_some());
        assert!(snapshot.is_dirty());
        assert!(snapshot.modified.contains("edited.py"));
        assert!(snapshot.untracked.contains("new.py"));
        assert!(snapshot.staged.contains("staged.py"));
        assert!(snapshot.deleted.contains("removed.py"));
        assert!(!snapshot.changed_paths().contains("kept.py"));
        assert!(!snapshot.changed_paths().contains("removed.py"));
        assert!(snapshot.diff.contains("+b = 2"));
    }

    #[test]
    fn test_paths_are_relative_to_scan_root() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("svc")).unwrap();
        fs::write(dir.path().join("svc/app.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("top.py"), "y = 1\n").unwrap();
        commit_all(&repo, "initial");
        fs::write(dir.path().join("svc/app.py"), "x = 2\n").unwrap();
        fs::write(dir.path().join("top.py"), "y = 2\n").unwrap();

        let snapshot = GitContextProvider::snapshot(&dir.path().join("svc")).unwrap();
        assert_eq!(
            snapshot.modified.iter().collect::<Vec<_>>(),
            vec!["app.py"]
        );
    }

    #[test]
    fn test_unborn_branch_has_no_head() {
        let dir = TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.py"), "x\n").unwrap();
        let snapshot = GitContextProvider::snapshot(dir.path()).unwrap();
        assert!(snapshot.head.is_none());
        assert!(snapshot.branch.is_some());
        assert!(snapshot.untracked.contains("a.py"));
    }

    #[test]
    fn test_relative_to_root() {
        assert_eq!(relative_to_root("a/b.py", ""), Some("a/b.py".into()));
        assert_eq!(relative_to_root("svc/b.py", "svc"), Some("b.py".into()));
        assert_eq!(relative_to_root("svcx/b.py", "svc"), None);
    }
}
