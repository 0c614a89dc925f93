#![allow(dead_code)]

use std::{
    cell::Cell,
    path::{Path, PathBuf},
};

use git2::{Commit, Oid, Repository, RepositoryInitOptions, Signature};
use gitbundle::{
    git::{
        mirror::{GitMirrorStore, MirrorHandle, MirrorStore},
        Lookup,
    },
    model::RepositorySource,
    BundleError,
};
use tempfile::TempDir;

/// A local repository standing in for the remote, with `main` as its default branch.
pub struct Origin {
    _dir: TempDir,
    path: PathBuf,
    repo: Repository,
}

impl Origin {
    pub fn new() -> Origin {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("origin");
        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Repository::init_opts(&path, &options).unwrap();
        Origin {
            _dir: dir,
            path,
            repo,
        }
    }

    pub fn url(&self) -> String {
        self.path.to_str().unwrap().to_owned()
    }

    pub fn source(&self, tracking_ref: &str) -> RepositorySource {
        RepositorySource::new(self.url(), tracking_ref, None).unwrap()
    }

    /// Writes `files` and commits them on the checked-out branch.
    pub fn commit(&self, files: &[(&str, &str)], message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        for (name, content) in files {
            let file = self.path.join(name);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, content).unwrap();
            index.add_path(Path::new(name)).unwrap();
        }
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let signature = Signature::now("Test User", "test@example.com").unwrap();
        let parents: Vec<Commit> = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parents: Vec<&Commit> = parents.iter().collect();
        self.repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                message,
                &tree,
                &parents,
            )
            .unwrap()
    }

    pub fn branch(&self, name: &str, target: Oid) {
        let commit = self.repo.find_commit(target).unwrap();
        self.repo.branch(name, &commit, true).unwrap();
    }

    /// Moves `main` back to `target`, rewriting history.
    pub fn force_main(&self, target: Oid) {
        let commit = self.repo.find_commit(target).unwrap();
        self.repo
            .reset(commit.as_object(), git2::ResetType::Hard, None)
            .unwrap();
    }
}

pub fn mirrors() -> GitMirrorStore {
    GitMirrorStore::new(git2::Config::new().unwrap())
}

/// Counts the fetches going through the wrapped store.
pub struct CountingMirrors {
    inner: GitMirrorStore,
    fetches: Cell<usize>,
}

impl CountingMirrors {
    pub fn new() -> Self {
        CountingMirrors {
            inner: mirrors(),
            fetches: Cell::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl MirrorStore for CountingMirrors {
    fn ensure_mirror(
        &self,
        source: &RepositorySource,
        path: &Path,
    ) -> Result<MirrorHandle, BundleError> {
        self.inner.ensure_mirror(source, path)
    }

    fn lookup_commit(&self, mirror: &MirrorHandle, commit: &str) -> Result<Lookup, BundleError> {
        self.inner.lookup_commit(mirror, commit)
    }

    fn fetch_all_branches(&self, mirror: &MirrorHandle) -> Result<(), BundleError> {
        self.fetches.set(self.fetches.get() + 1);
        self.inner.fetch_all_branches(mirror)
    }
}

pub fn read(path: &Path, file: &str) -> String {
    std::fs::read_to_string(path.join(file)).unwrap()
}
