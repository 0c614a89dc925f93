use std::path::{Path, PathBuf};

use git2::{AutotagOption, Config, ErrorCode, Oid, Repository};
use log::{debug, info, trace};

use crate::{error::BundleError, model::RepositorySource};

use super::{lookup_commit, remote::RemoteAccess, Lookup};

const REMOTE_NAME: &str = "origin";
const BRANCHES_REFSPEC: &str = "+refs/heads/*:refs/heads/*";
const TAGS_REFSPEC: &str = "+refs/tags/*:refs/tags/*";

/// A full-history bare copy of a bundle's remote repository.
pub struct MirrorHandle {
    path: PathBuf,
    repo: Repository,
}

impl MirrorHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

/// Owns the mirrors of bundle sources.
///
/// A mirror is created at most once per path and afterwards only fetched into.
pub trait MirrorStore {
    fn ensure_mirror(
        &self,
        source: &RepositorySource,
        path: &Path,
    ) -> Result<MirrorHandle, BundleError>;

    fn lookup_commit(&self, mirror: &MirrorHandle, commit: &str) -> Result<Lookup, BundleError>;

    fn fetch_all_branches(&self, mirror: &MirrorHandle) -> Result<(), BundleError>;

    /// Makes sure `commit` is in the mirror, fetching at most once.
    fn ensure_commit_present(
        &self,
        mirror: &MirrorHandle,
        commit: &str,
    ) -> Result<Oid, BundleError> {
        let mut fetched = false;
        loop {
            match self.lookup_commit(mirror, commit)? {
                Lookup::Found(oid) => return Ok(oid),
                Lookup::NotFound if fetched => {
                    return Err(BundleError::VersionNotFound {
                        version: commit.to_owned(),
                    })
                }
                Lookup::NotFound => {
                    debug!(
                        "Commit {} is not in the mirror at {}, fetching",
                        commit,
                        mirror.path().display()
                    );
                    self.fetch_all_branches(mirror)?;
                    fetched = true;
                }
            }
        }
    }
}

impl<T: MirrorStore + ?Sized> MirrorStore for &T {
    fn ensure_mirror(
        &self,
        source: &RepositorySource,
        path: &Path,
    ) -> Result<MirrorHandle, BundleError> {
        (**self).ensure_mirror(source, path)
    }

    fn lookup_commit(&self, mirror: &MirrorHandle, commit: &str) -> Result<Lookup, BundleError> {
        (**self).lookup_commit(mirror, commit)
    }

    fn fetch_all_branches(&self, mirror: &MirrorHandle) -> Result<(), BundleError> {
        (**self).fetch_all_branches(mirror)
    }
}

/// Mirrors backed by libgit2, fetching from the network with the user's git credentials.
pub struct GitMirrorStore {
    remote_access: RemoteAccess,
}

impl GitMirrorStore {
    pub fn new(git_config: Config) -> Self {
        GitMirrorStore {
            remote_access: RemoteAccess::new(git_config),
        }
    }

    pub fn from_default_config() -> Result<Self, BundleError> {
        Ok(Self::new(Config::open_default()?))
    }

    fn create(&self, source: &RepositorySource, path: &Path) -> Result<Repository, BundleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Cloning {} into mirror {}", source.url, path.display());

        let repo = Repository::init_bare(path)?;
        repo.remote_with_fetch(REMOTE_NAME, &source.url, BRANCHES_REFSPEC)?;
        self.populate(&repo)?;
        Ok(repo)
    }

    /// Opens the mirror without checking where its remote points.
    fn open(&self, source: &RepositorySource, path: &Path) -> Result<Repository, BundleError> {
        trace!("Opening existing mirror at {}", path.display());

        let repo = Repository::open_bare(path)?;
        if repo.is_empty()? {
            info!(
                "Mirror at {} has no refs yet, resuming the initial fetch",
                path.display()
            );
            if let Err(error) = repo.find_remote(REMOTE_NAME) {
                if error.code() != ErrorCode::NotFound {
                    return Err(error.into());
                }
                repo.remote_with_fetch(REMOTE_NAME, &source.url, BRANCHES_REFSPEC)?;
            }
            self.populate(&repo)?;
        }
        Ok(repo)
    }

    /// Initial fetch of every branch and tag, pointing HEAD at the remote's default branch
    /// the same way a bare clone does.
    fn populate(&self, repo: &Repository) -> Result<(), BundleError> {
        let mut remote = repo.find_remote(REMOTE_NAME)?;
        remote.fetch(
            &[BRANCHES_REFSPEC, TAGS_REFSPEC],
            Some(&mut self.remote_access.fetch_options(AutotagOption::All)),
            None,
        )?;

        match remote.default_branch() {
            Ok(head) => match head.as_str() {
                Some(head) => {
                    debug!("Pointing mirror HEAD at {}", head);
                    repo.set_head(head)?;
                }
                None => debug!("Remote default branch is not valid utf-8, keeping HEAD"),
            },
            Err(error) => debug!("Remote did not report a default branch: {}", error),
        }
        Ok(())
    }
}

impl MirrorStore for GitMirrorStore {
    fn ensure_mirror(
        &self,
        source: &RepositorySource,
        path: &Path,
    ) -> Result<MirrorHandle, BundleError> {
        let repo = if path.exists() {
            self.open(source, path)?
        } else {
            self.create(source, path)?
        };

        Ok(MirrorHandle {
            path: path.to_path_buf(),
            repo,
        })
    }

    fn lookup_commit(&self, mirror: &MirrorHandle, commit: &str) -> Result<Lookup, BundleError> {
        Ok(lookup_commit(&mirror.repo, commit)?)
    }

    fn fetch_all_branches(&self, mirror: &MirrorHandle) -> Result<(), BundleError> {
        info!("Fetching all branches into mirror {}", mirror.path.display());
        let mut remote = mirror.repo.find_remote(REMOTE_NAME)?;
        remote.fetch(
            &[BRANCHES_REFSPEC],
            Some(&mut self.remote_access.fetch_options(AutotagOption::Auto)),
            None,
        )?;
        Ok(())
    }
}
