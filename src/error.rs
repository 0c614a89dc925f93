use thiserror::Error;

use crate::view_url::ViewUrlError;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Version {version} not found in the repository")]
    VersionNotFound { version: String },
    #[error("Refreshing a specific version is not supported (bundle is pinned to {version})")]
    RefreshNotSupported { version: String },
    #[error(transparent)]
    ViewUrl(#[from] ViewUrlError),
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("Branch {branch} cannot be fast-forwarded to its upstream")]
    NonFastForward { branch: String },
    #[error("Cache location {location} is not usable")]
    BadLocation { location: String },
    #[error("Invalid bundle definition: {0}")]
    Parse(#[from] crate::model::ParseError),
    #[error("Bundle lock cannot be acquired")]
    Lock(#[from] crate::flock::Error),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
