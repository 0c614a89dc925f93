use std::{path::PathBuf, time::Duration};

use home::home_dir;

use crate::{
    api::{Bundle, BundleLock},
    bundle::GitBundle,
    error::BundleError,
    flock::DEFAULT_LOCK_TIMEOUT,
    git::{lock_path, mirror::GitMirrorStore},
    model::{BundleName, RepositorySource, Version},
};

pub const DEFAULT_TRACKING_REF: &str = "main";

pub struct GitBundleBuilder {
    root: Option<PathBuf>,
    name: Option<String>,
    url: Option<String>,
    tracking_ref: Option<String>,
    subdir: Option<PathBuf>,
    version: Version,
    lock: bool,
    lock_timeout: Duration,
}

impl Default for GitBundleBuilder {
    fn default() -> Self {
        GitBundleBuilder {
            root: None,
            name: None,
            url: None,
            tracking_ref: None,
            subdir: None,
            version: Version::Tracking,
            lock: true,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl GitBundleBuilder {
    /// Storage root under which the `git` cache directory is created.
    ///
    /// Defaults to `$HOME/.gitbundle`.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Bundle name, used as the cache key of the mirror.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Url of the remote repository.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Branch or tag followed by the bundle.
    ///
    /// Defaults to `main`.
    pub fn tracking_ref(mut self, reference: impl Into<String>) -> Self {
        self.tracking_ref = Some(reference.into());
        self
    }

    /// Directory inside the repository exposed as the bundle path.
    pub fn subdir(mut self, path: impl Into<PathBuf>) -> Self {
        self.subdir = Some(path.into());
        self
    }

    /// Version to expose. Tracking unless set.
    pub fn version(mut self, version: impl Into<Version>) -> Self {
        self.version = version.into();
        self
    }

    /// Whether to take an exclusive lock on the bundle name while the caches are written.
    ///
    /// Defaults to `true`. Hosts that already serialize access themselves can turn it off.
    pub fn lock(mut self, lock: bool) -> Self {
        self.lock = lock;
        self
    }

    /// How long to wait for the bundle lock before giving up. Defaults to 300 seconds.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn try_build(self) -> Result<Bundle, BundleError> {
        let Self {
            root,
            name,
            url,
            tracking_ref,
            subdir,
            version,
            lock,
            lock_timeout,
        } = self;

        let root = match root {
            Some(root) => root,
            None => default_root()?,
        };
        let name = BundleName::new(name.unwrap_or_default())?;
        let source = RepositorySource::new(
            url.unwrap_or_default(),
            tracking_ref.unwrap_or_else(|| DEFAULT_TRACKING_REF.to_owned()),
            subdir,
        )?;
        version.validate()?;

        let lock = lock.then(|| BundleLock {
            path: lock_path(&root, &name),
            timeout: lock_timeout,
        });

        let mirrors = GitMirrorStore::from_default_config()?;
        let bundle = {
            let _guard = lock.as_ref().map(BundleLock::acquire).transpose()?;
            GitBundle::new(&root, name, source, version, mirrors)?
        };

        Ok(Bundle { bundle, lock })
    }
}

pub fn default_root() -> Result<PathBuf, BundleError> {
    let mut root = home_dir().ok_or_else(|| BundleError::BadLocation {
        location: "$HOME".to_owned(),
    })?;
    root.push(".gitbundle");
    Ok(root)
}
