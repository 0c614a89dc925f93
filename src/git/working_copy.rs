use std::path::{Path, PathBuf};

use git2::{
    build::{CheckoutBuilder, RepoBuilder},
    BranchType, ErrorCode, Oid, Repository, ResetType,
};
use log::{debug, info, trace};

use crate::error::BundleError;

use super::{lookup_commit, mirror::MirrorHandle, Lookup};

const REMOTE_NAME: &str = "origin";

/// A checked-out clone of a mirror holding exactly one version of a bundle.
pub struct WorkingCopyHandle {
    path: PathBuf,
    repo: Repository,
}

impl WorkingCopyHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}

/// Owns the per-version working copies. Working copies are cloned from the local mirror,
/// never from the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkingCopyStore;

impl WorkingCopyStore {
    pub fn ensure_working_copy(
        &self,
        mirror: &MirrorHandle,
        path: &Path,
    ) -> Result<WorkingCopyHandle, BundleError> {
        let repo = if path.exists() {
            trace!("Opening existing working copy at {}", path.display());
            Repository::open(path)?
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            // The origin url is stored in the working copy's config, so it must stay
            // valid regardless of the current directory.
            let mirror_path = mirror.path().canonicalize()?;
            let mirror_url = mirror_path.to_str().ok_or_else(|| BundleError::BadLocation {
                location: mirror_path.to_string_lossy().to_string(),
            })?;
            info!(
                "Creating working copy at {} from mirror {}",
                path.display(),
                mirror_url
            );
            RepoBuilder::new().clone(mirror_url, path)?
        };

        Ok(WorkingCopyHandle {
            path: path.to_path_buf(),
            repo,
        })
    }

    /// Switches the working tree to `reference`.
    ///
    /// Local branches are used as they are, branches only known on the mirror get a local
    /// branch tracking them, and anything else (tags, commits) is checked out detached.
    pub fn checkout(
        &self,
        working_copy: &WorkingCopyHandle,
        reference: &str,
    ) -> Result<(), BundleError> {
        let repo = &working_copy.repo;

        let branch = match repo.find_branch(reference, BranchType::Local) {
            Ok(branch) => Some(branch),
            Err(error) if error.code() == ErrorCode::NotFound => {
                let upstream = format!("{REMOTE_NAME}/{reference}");
                match repo.find_branch(&upstream, BranchType::Remote) {
                    Ok(remote_branch) => {
                        debug!("Creating local branch {} tracking {}", reference, upstream);
                        let commit = remote_branch.get().peel_to_commit()?;
                        let mut branch = repo.branch(reference, &commit, false)?;
                        branch.set_upstream(Some(upstream.as_str()))?;
                        Some(branch)
                    }
                    Err(error) if error.code() == ErrorCode::NotFound => None,
                    Err(error) => return Err(error.into()),
                }
            }
            Err(error) => return Err(error.into()),
        };

        let mut checkout = CheckoutBuilder::new();
        checkout.force();

        match branch {
            Some(branch) => {
                let reference = branch.into_reference();
                let target = reference.peel_to_commit()?;
                let name = reference
                    .name()
                    .ok_or_else(|| git2::Error::from_str("branch name is not valid utf-8"))?;
                trace!("Checking out branch {} at {}", name, target.id());
                repo.checkout_tree(target.as_object(), Some(&mut checkout))?;
                repo.set_head(name)?;
            }
            None => {
                let target = repo.revparse_single(reference)?.peel_to_commit()?;
                trace!("Checking out {} detached at {}", reference, target.id());
                repo.checkout_tree(target.as_object(), Some(&mut checkout))?;
                repo.set_head_detached(target.id())?;
            }
        }
        Ok(())
    }

    pub fn lookup_commit(
        &self,
        working_copy: &WorkingCopyHandle,
        commit: &str,
    ) -> Result<Lookup, BundleError> {
        Ok(lookup_commit(&working_copy.repo, commit)?)
    }

    /// Fetches the configured refspecs from the mirror.
    pub fn fetch(&self, working_copy: &WorkingCopyHandle) -> Result<(), BundleError> {
        debug!(
            "Fetching into working copy {} from its mirror",
            working_copy.path.display()
        );
        let mut remote = working_copy.repo.find_remote(REMOTE_NAME)?;
        remote.fetch(&[] as &[&str], None, None)?;
        Ok(())
    }

    /// Detaches HEAD at `commit` and resets index and working tree to it.
    pub fn detach_and_hard_reset(
        &self,
        working_copy: &WorkingCopyHandle,
        commit: &str,
    ) -> Result<Oid, BundleError> {
        let repo = &working_copy.repo;
        let target = repo.revparse_single(commit)?.peel_to_commit()?;
        repo.set_head_detached(target.id())?;
        repo.reset(target.as_object(), ResetType::Hard, None)?;
        debug!(
            "Working copy {} reset to {}",
            working_copy.path.display(),
            target.id()
        );
        Ok(target.id())
    }

    /// Advances the checked-out branch to its upstream on the mirror.
    ///
    /// A detached HEAD has nothing to follow and is left where it is.
    pub fn fast_forward_pull(&self, working_copy: &WorkingCopyHandle) -> Result<(), BundleError> {
        let repo = &working_copy.repo;
        self.fetch(working_copy)?;

        let head = repo.head()?;
        if !head.is_branch() {
            debug!(
                "HEAD of {} is detached, nothing to fast-forward",
                working_copy.path.display()
            );
            return Ok(());
        }
        let head_name = head
            .name()
            .ok_or_else(|| git2::Error::from_str("HEAD name is not valid utf-8"))?
            .to_owned();
        let branch_name = head.shorthand().unwrap_or(head_name.as_str()).to_owned();

        let upstream = repo
            .find_branch(&branch_name, BranchType::Local)?
            .upstream()?;
        let incoming = repo.reference_to_annotated_commit(upstream.get())?;
        let (analysis, _) = repo.merge_analysis(&[&incoming])?;

        if analysis.is_up_to_date() {
            debug!("{} is up to date", branch_name);
            Ok(())
        } else if analysis.is_fast_forward() {
            info!("Fast-forwarding {} to {}", branch_name, incoming.id());
            let mut reference = repo.find_reference(&head_name)?;
            reference.set_target(incoming.id(), "fast-forward from mirror")?;
            repo.set_head(&head_name)?;
            repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
            Ok(())
        } else {
            Err(BundleError::NonFastForward {
                branch: branch_name,
            })
        }
    }

    /// Commit id of the working copy's HEAD, read from disk on every call.
    pub fn head_commit(&self, working_copy: &WorkingCopyHandle) -> Result<Oid, BundleError> {
        Ok(working_copy.repo.head()?.peel_to_commit()?.id())
    }
}
