use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Versioned, read-only views of remote git repositories.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Storage root for mirrors and working copies.
    /// Defaults to $GITBUNDLE_CACHE_DIR, then $HOME/.gitbundle
    #[clap(short, long)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BundleArgs {
    /// Bundle name, shared by every version of the same repository
    #[clap(short, long)]
    pub name: String,
    /// Url of the remote repository
    #[clap(short, long)]
    pub url: String,
    /// Branch or tag to follow. Defaults to $GITBUNDLE_GIT_REF, then main
    #[clap(short, long)]
    pub tracking_ref: Option<String>,
    /// Directory inside the repository to expose
    #[clap(short, long)]
    pub subdir: Option<PathBuf>,
    /// Do not take the per-bundle lock; the caller serializes access itself
    #[clap(long)]
    pub no_lock: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Prepares a bundle version and prints where it lives
    Ensure {
        #[clap(flatten)]
        bundle: BundleArgs,
        /// Commit to pin. Follows the tracking ref when omitted
        #[clap(short, long)]
        version: Option<String>,
    },
    /// Brings a tracking bundle up to date with its remote
    Refresh {
        #[clap(flatten)]
        bundle: BundleArgs,
    },
    /// Prints the commit currently checked out for a bundle version
    CurrentVersion {
        #[clap(flatten)]
        bundle: BundleArgs,
        /// Commit to pin. Follows the tracking ref when omitted
        #[clap(short, long)]
        version: Option<String>,
    },
    /// Prints a browsable link to a version on the repository's hosting provider
    ViewUrl {
        /// Url of the remote repository
        #[clap(short, long)]
        url: String,
        #[clap(short, long)]
        version: Option<String>,
    },
}
