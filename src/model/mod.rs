use std::{
    fmt::{Debug, Display},
    path::{Component, Path, PathBuf},
};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid bundle name `{name}`: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("Invalid tracking ref `{reference}`: {reason}")]
    InvalidTrackingRef {
        reference: String,
        reason: &'static str,
    },
    #[error("Invalid pinned version `{version}`: {reason}")]
    InvalidVersion {
        version: String,
        reason: &'static str,
    },
    #[error("Subdirectory `{0}` must be a relative path inside the repository")]
    InvalidSubdir(String),
    #[error("Repository url must not be empty")]
    EmptyUrl,
}

/// Name of a bundle. It is used verbatim as a directory name under the storage root,
/// so anything that could escape that directory is rejected.
#[derive(Clone, Hash, Debug, PartialEq, Eq, Ord, PartialOrd)]
pub struct BundleName(String);

impl BundleName {
    pub fn new(name: impl Into<String>) -> Result<Self, ParseError> {
        let name = name.into();
        let reason = if name.is_empty() {
            Some("cannot be empty")
        } else if name.contains("..") {
            Some("cannot contain '..'")
        } else if name.contains('/') || name.contains('\\') {
            Some("cannot contain path separators")
        } else if name.contains('+') {
            Some("cannot contain '+'")
        } else if name.starts_with('-') {
            Some("cannot start with '-'")
        } else if name.chars().any(char::is_control) {
            Some("cannot contain control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ParseError::InvalidName { name, reason }),
            None => Ok(BundleName(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for BundleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The remote repository a bundle is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySource {
    pub url: String,
    pub tracking_ref: String,
    pub subdir: Option<PathBuf>,
}

impl RepositorySource {
    pub fn new(
        url: impl Into<String>,
        tracking_ref: impl Into<String>,
        subdir: Option<PathBuf>,
    ) -> Result<Self, ParseError> {
        let url = url.into();
        if url.is_empty() {
            return Err(ParseError::EmptyUrl);
        }

        let tracking_ref = tracking_ref.into();
        let reason = if tracking_ref.is_empty() {
            Some("cannot be empty")
        } else if tracking_ref.contains("..") {
            Some("cannot contain '..'")
        } else if tracking_ref.starts_with('-') || tracking_ref.starts_with('/') {
            Some("cannot start with '-' or '/'")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(ParseError::InvalidTrackingRef {
                reference: tracking_ref,
                reason,
            });
        }

        if let Some(subdir) = &subdir {
            if !is_contained(subdir) {
                return Err(ParseError::InvalidSubdir(subdir.display().to_string()));
            }
        }

        Ok(RepositorySource {
            url,
            tracking_ref,
            subdir,
        })
    }
}

fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Which state of the repository a bundle exposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Version {
    /// An exact commit. The bundle content never changes.
    Pinned(String),
    /// Whatever the tracking ref points to, advanced by refreshes.
    #[default]
    Tracking,
}

impl Version {
    pub fn pinned(commit: impl Into<String>) -> Version {
        Version::Pinned(commit.into())
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Version::Pinned(_))
    }

    pub fn commit(&self) -> Option<&str> {
        match self {
            Version::Pinned(commit) => Some(commit),
            Version::Tracking => None,
        }
    }

    /// A pinned version names its working copy directory, so it has to stay a single
    /// path component.
    pub fn validate(&self) -> Result<(), ParseError> {
        let Version::Pinned(commit) = self else {
            return Ok(());
        };
        let reason = if commit.contains("..") {
            Some("cannot contain '..'")
        } else if commit.contains('/') || commit.contains('\\') {
            Some("cannot contain path separators")
        } else if commit.chars().any(char::is_control) {
            Some("cannot contain control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ParseError::InvalidVersion {
                version: commit.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Hosts hand over versions as optional strings; an absent or empty one means tracking.
impl From<Option<String>> for Version {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(commit) if !commit.is_empty() => Version::Pinned(commit),
            _ => Version::Tracking,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Pinned(commit) => f.write_str(commit),
            Version::Tracking => f.write_str("tracking"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_plain_names() {
        assert_eq!(BundleName::new("dags").unwrap().as_str(), "dags");
        assert_eq!(BundleName::new("my_bundle.v2").unwrap().as_str(), "my_bundle.v2");
    }

    #[test]
    fn rejects_names_escaping_the_storage_root() {
        for name in ["", "..", "a/b", "a\\b", "-x", "a+b", "tab\there"] {
            assert!(BundleName::new(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn tracking_ref_may_contain_slashes() {
        let source =
            RepositorySource::new("https://github.com/org/repo", "feature/x", None).unwrap();
        assert_eq!(source.tracking_ref, "feature/x");
    }

    #[test]
    fn rejects_bad_tracking_refs() {
        for reference in ["", "a..b", "-f", "/abs"] {
            assert!(
                RepositorySource::new("https://github.com/org/repo", reference, None).is_err(),
                "{reference:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_escaping_subdir() {
        let error = RepositorySource::new("url", "main", Some(PathBuf::from("../dags")));
        assert_eq!(error, Err(ParseError::InvalidSubdir("../dags".to_owned())));
        assert!(RepositorySource::new("url", "main", Some(PathBuf::from("/dags"))).is_err());
        assert!(RepositorySource::new("url", "main", Some(PathBuf::from("dags/nested"))).is_ok());
    }

    #[test]
    fn absent_version_means_tracking() {
        assert_eq!(Version::from(None), Version::Tracking);
        assert_eq!(Version::from(Some(String::new())), Version::Tracking);
        assert_eq!(
            Version::from(Some("abc123".to_owned())),
            Version::pinned("abc123")
        );
        assert!(Version::pinned("abc123").is_pinned());
        assert_eq!(Version::Tracking.commit(), None);
    }

    #[test]
    fn pinned_version_stays_one_path_component() {
        assert_eq!(Version::pinned("abc123").validate(), Ok(()));
        assert_eq!(Version::pinned("v1.2.0").validate(), Ok(()));
        assert_eq!(Version::Tracking.validate(), Ok(()));
        for version in ["main^{/../../../escaped}", "a/b", "a\\b", "..", "a\nb"] {
            assert!(
                matches!(
                    Version::pinned(version).validate(),
                    Err(ParseError::InvalidVersion { .. })
                ),
                "{version:?} should be rejected"
            );
        }
    }
}
