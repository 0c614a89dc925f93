//! Local git caches backing a bundle.
//!
//! Two independent stores live under `<root>/git`:
//!
//! ```text
//! <root>/git/<name>        # bare mirror, shared by every version of a bundle
//! <root>/git/<name>+<V>    # working copy for one pinned commit or tracking ref
//! ```
//!
//! Neither store locks its paths. Two processes that both see a missing path will both
//! try to create it; callers serialize per bundle name (see [`crate::FileLock`]).

pub mod mirror;
pub mod remote;
pub mod working_copy;

use std::path::{Path, PathBuf};

use git2::{ErrorCode, Oid, Repository};

use crate::model::BundleName;

const GIT_DIR: &str = "git";

/// Result of an existence check for a commit in a local repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found(Oid),
    NotFound,
}

/// Looks `revision` up and peels it to a commit.
///
/// A revision that does not exist is `NotFound`; a malformed or ambiguous one is an error.
pub fn lookup_commit(repo: &Repository, revision: &str) -> Result<Lookup, git2::Error> {
    match repo.revparse_single(revision) {
        Ok(object) => Ok(Lookup::Found(object.peel_to_commit()?.id())),
        Err(error) if error.code() == ErrorCode::NotFound => Ok(Lookup::NotFound),
        Err(error) => Err(error),
    }
}

pub fn mirror_path(root: &Path, name: &BundleName) -> PathBuf {
    root.join(GIT_DIR).join(name.as_str())
}

/// `key` is the pinned commit or, for tracking bundles, the tracking ref.
pub fn working_copy_path(root: &Path, name: &BundleName, key: &str) -> PathBuf {
    root.join(GIT_DIR).join(format!("{name}+{key}"))
}

pub fn lock_path(root: &Path, name: &BundleName) -> PathBuf {
    root.join(GIT_DIR).join(format!("{name}.lock"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn layout() {
        let root = Path::new("/storage");
        let name = BundleName::new("dags").unwrap();
        assert_eq!(mirror_path(root, &name), PathBuf::from("/storage/git/dags"));
        assert_eq!(
            working_copy_path(root, &name, "abc123"),
            PathBuf::from("/storage/git/dags+abc123")
        );
        assert_eq!(
            working_copy_path(root, &name, "main"),
            PathBuf::from("/storage/git/dags+main")
        );
        assert_eq!(lock_path(root, &name), PathBuf::from("/storage/git/dags.lock"));
    }

    #[test]
    fn lookup_distinguishes_missing_from_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let missing = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(lookup_commit(&repo, missing).unwrap(), Lookup::NotFound);
        assert_eq!(lookup_commit(&repo, "no-such-branch").unwrap(), Lookup::NotFound);
        assert!(lookup_commit(&repo, "main@{").is_err());
    }
}
