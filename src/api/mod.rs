use std::{ops::Deref, path::PathBuf, time::Duration};

use crate::{bundle::GitBundle, error::BundleError, flock::FileLock};

mod builder;

pub use builder::{default_root, GitBundleBuilder, DEFAULT_TRACKING_REF};

/// A [`GitBundle`] built through [`GitBundleBuilder`].
///
/// When locking is enabled, the bundle lock is only held while the caches are written:
/// during construction and during [`Bundle::refresh`]. Several versions of one bundle can
/// be alive at the same time.
#[derive(Debug)]
pub struct Bundle {
    bundle: GitBundle,
    lock: Option<BundleLock>,
}

#[derive(Debug, Clone)]
pub(crate) struct BundleLock {
    pub(crate) path: PathBuf,
    pub(crate) timeout: Duration,
}

impl BundleLock {
    pub(crate) fn acquire(&self) -> Result<FileLock, BundleError> {
        Ok(FileLock::with_timeout(&self.path, self.timeout)?)
    }
}

impl Bundle {
    pub fn builder() -> GitBundleBuilder {
        GitBundleBuilder::default()
    }

    /// Lock file taken around cache writes, if locking is enabled.
    pub fn lock_path(&self) -> Option<PathBuf> {
        self.lock.as_ref().map(|lock| lock.path.clone())
    }

    /// [`GitBundle::refresh`] under the bundle lock.
    pub fn refresh(&self) -> Result<(), BundleError> {
        let _guard = self.lock.as_ref().map(BundleLock::acquire).transpose()?;
        self.bundle.refresh()
    }
}

impl Deref for Bundle {
    type Target = GitBundle;

    fn deref(&self) -> &GitBundle {
        &self.bundle
    }
}
