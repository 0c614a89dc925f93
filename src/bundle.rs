use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    error::BundleError,
    git::{
        mirror::{GitMirrorStore, MirrorHandle, MirrorStore},
        mirror_path,
        working_copy::{WorkingCopyHandle, WorkingCopyStore},
        working_copy_path, Lookup,
    },
    model::{BundleName, RepositorySource, Version},
    view_url::build_view_url,
};

/// A git repository exposed as a directory holding one version of its content.
///
/// Instead of cloning the repository for every version, the remote is cloned once into a
/// bare mirror shared by every version of the bundle, and each version gets its own local
/// clone of that mirror.
///
/// A bundle does not lock its paths. Callers must make sure construction and
/// [`GitBundle::refresh`] never run concurrently for one bundle name under one storage
/// root; [`crate::Bundle`] does it with a [`crate::FileLock`] on [`crate::git::lock_path`].
pub struct GitBundle<M = GitMirrorStore> {
    name: BundleName,
    source: RepositorySource,
    version: Version,
    mirrors: M,
    working_copies: WorkingCopyStore,
    mirror: MirrorHandle,
    working_copy: WorkingCopyHandle,
}

impl<M: MirrorStore> GitBundle<M> {
    /// Prepares the bundle under `storage_root`, fetching only what is missing locally.
    ///
    /// A pinned bundle ends up detached at its commit; a tracking bundle ends up at the
    /// current tip of its tracking ref.
    pub fn new(
        storage_root: &Path,
        name: BundleName,
        source: RepositorySource,
        version: Version,
        mirrors: M,
    ) -> Result<Self, BundleError> {
        version.validate()?;
        let working_copies = WorkingCopyStore;

        let mirror = mirrors.ensure_mirror(&source, &mirror_path(storage_root, &name))?;
        if let Version::Pinned(commit) = &version {
            mirrors.ensure_commit_present(&mirror, commit)?;
        }

        let key = version.commit().unwrap_or(source.tracking_ref.as_str());
        let working_copy = working_copies
            .ensure_working_copy(&mirror, &working_copy_path(storage_root, &name, key))?;
        // A fresh clone sits on the mirror's default branch, which need not be the
        // tracking ref.
        working_copies.checkout(&working_copy, &source.tracking_ref)?;

        let bundle = GitBundle {
            name,
            source,
            version,
            mirrors,
            working_copies,
            mirror,
            working_copy,
        };

        match &bundle.version {
            Version::Pinned(commit) => bundle.pin(commit)?,
            Version::Tracking => bundle.refresh()?,
        }
        info!("{:?} ready at {}", bundle, bundle.path().display());
        Ok(bundle)
    }

    fn pin(&self, commit: &str) -> Result<(), BundleError> {
        if self.working_copies.lookup_commit(&self.working_copy, commit)? == Lookup::NotFound {
            debug!("{} is not in the working copy yet, fetching from the mirror", commit);
            self.working_copies.fetch(&self.working_copy)?;
        }
        self.working_copies
            .detach_and_hard_reset(&self.working_copy, commit)?;
        Ok(())
    }

    /// Brings a tracking bundle up to the tip of its tracking ref.
    ///
    /// Pinned bundles never change and refuse to refresh.
    pub fn refresh(&self) -> Result<(), BundleError> {
        if let Version::Pinned(commit) = &self.version {
            return Err(BundleError::RefreshNotSupported {
                version: commit.clone(),
            });
        }

        self.mirrors.fetch_all_branches(&self.mirror)?;
        self.working_copies.fast_forward_pull(&self.working_copy)
    }

    /// Commit id currently checked out in the working copy.
    pub fn current_version(&self) -> Result<String, BundleError> {
        Ok(self
            .working_copies
            .head_commit(&self.working_copy)?
            .to_string())
    }

    pub fn view_url(&self, version: Option<&str>) -> Result<Option<String>, BundleError> {
        Ok(build_view_url(&self.source.url, version)?)
    }
}

impl<M> GitBundle<M> {
    /// Directory holding the bundle content.
    pub fn path(&self) -> PathBuf {
        let path = self.working_copy.path();
        match &self.source.subdir {
            Some(subdir) => path.join(subdir),
            None => path.to_path_buf(),
        }
    }

    pub fn name(&self) -> &BundleName {
        &self.name
    }

    pub fn source(&self) -> &RepositorySource {
        &self.source
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn mirror_path(&self) -> &Path {
        self.mirror.path()
    }

    pub fn working_copy_path(&self) -> &Path {
        self.working_copy.path()
    }
}

impl<M> Debug for GitBundle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitBundle")
            .field("name", &self.name.as_str())
            .field("tracking_ref", &self.source.tracking_ref)
            .field("subdir", &self.source.subdir)
            .field("version", &self.version)
            .finish()
    }
}
