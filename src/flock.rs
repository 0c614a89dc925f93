use std::{
    fs::File,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use fs4::fs_std::FileExt;
use log::{debug, info};
use thiserror::Error;

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Exclusive advisory lock on a file, released when dropped.
///
/// The repository stores never lock anything themselves. A host that may run several
/// processes against the same storage root holds one of these per bundle name for as
/// long as it works with that bundle.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    _file: File,
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct Error(#[from] std::io::Error);

impl FileLock {
    pub fn new(path: &Path) -> Result<Self, Error> {
        Self::with_timeout(path, DEFAULT_LOCK_TIMEOUT)
    }

    pub fn with_timeout(path: &Path, timeout: Duration) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let start = Instant::now();
        debug!("Acquiring a lock on {}", path.display());
        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    info!("Acquired a lock on {}", path.display());
                    return Ok(Self {
                        path: path.to_path_buf(),
                        _file: file,
                    });
                }
                Ok(false) if start.elapsed() < timeout => {
                    debug!("Failed to acquire a lock on {}, retrying", path.display());
                    std::thread::sleep(Duration::from_millis(100).min(timeout));
                }
                Ok(false) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::WouldBlock,
                        format!("{} is locked by another process", path.display()),
                    )
                    .into())
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_lock_times_out_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("git").join("dags.lock");

        let first = FileLock::new(&path).unwrap();
        assert_eq!(first.path(), path);

        let second = FileLock::with_timeout(&path, Duration::from_millis(200));
        assert!(second.is_err());

        drop(first);
        FileLock::with_timeout(&path, Duration::from_millis(200)).unwrap();
    }
}
