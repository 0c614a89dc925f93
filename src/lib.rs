pub mod bundle;
pub mod cli;
pub mod config;
pub mod error;
pub mod flock;
pub mod git;
pub mod model;
pub mod view_url;

mod api;

pub use api::{default_root, Bundle, GitBundleBuilder, DEFAULT_TRACKING_REF};
pub use bundle::GitBundle;
pub use error::BundleError;
pub use flock::FileLock;
