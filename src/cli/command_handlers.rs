use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::{
    api::{Bundle, GitBundleBuilder},
    cli::args::BundleArgs,
    model::Version,
    view_url::build_view_url,
};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BundleInfo {
    pub name: String,
    pub url: String,
    pub tracking_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<String>,
    pub path: PathBuf,
    pub current_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_url: Option<String>,
}

impl BundleInfo {
    pub fn collect(bundle: &Bundle) -> anyhow::Result<Self> {
        let current_version = bundle.current_version()?;
        let view_url = match bundle.view_url(Some(&current_version)) {
            Ok(view_url) => view_url,
            Err(error) => {
                warn!("No view url for {}: {}", bundle.name(), error);
                None
            }
        };
        Ok(BundleInfo {
            name: bundle.name().to_string(),
            url: bundle.source().url.clone(),
            tracking_ref: bundle.source().tracking_ref.clone(),
            pinned: bundle.version().commit().map(str::to_owned),
            path: bundle.path(),
            view_url,
            current_version,
        })
    }
}

/// Handler to ensure command
pub fn do_ensure(
    root: &Path,
    default_tracking_ref: &str,
    args: BundleArgs,
    version: Option<String>,
) -> anyhow::Result<()> {
    let bundle = build_bundle(root, default_tracking_ref, args, version.into())?;
    let info = BundleInfo::collect(&bundle)?;
    print!("{}", toml::to_string_pretty(&info)?);
    Ok(())
}

/// Handler to refresh command
///
/// Building a tracking bundle already brings it to the tip of its tracking ref.
pub fn do_refresh(root: &Path, default_tracking_ref: &str, args: BundleArgs) -> anyhow::Result<()> {
    let bundle = build_bundle(root, default_tracking_ref, args, Version::Tracking)?;
    let version = bundle.current_version()?;
    info!("{} is at {}", bundle.name(), version);
    println!("{version}");
    Ok(())
}

/// Handler to current-version command
pub fn do_current_version(
    root: &Path,
    default_tracking_ref: &str,
    args: BundleArgs,
    version: Option<String>,
) -> anyhow::Result<()> {
    let bundle = build_bundle(root, default_tracking_ref, args, version.into())?;
    println!("{}", bundle.current_version()?);
    Ok(())
}

/// Handler to view-url command
pub fn do_view_url(url: &str, version: Option<&str>) -> anyhow::Result<()> {
    match build_view_url(url, version)? {
        Some(view_url) => println!("{view_url}"),
        None => info!("No view url available for {}", url),
    }
    Ok(())
}

fn build_bundle(
    root: &Path,
    default_tracking_ref: &str,
    args: BundleArgs,
    version: Version,
) -> anyhow::Result<Bundle> {
    let BundleArgs {
        name,
        url,
        tracking_ref,
        subdir,
        no_lock,
    } = args;

    let mut builder = GitBundleBuilder::default()
        .root(root)
        .name(name)
        .url(url)
        .tracking_ref(tracking_ref.unwrap_or_else(|| default_tracking_ref.to_owned()))
        .version(version)
        .lock(!no_lock);
    if let Some(subdir) = subdir {
        builder = builder.subdir(subdir);
    }
    Ok(builder.try_build()?)
}
