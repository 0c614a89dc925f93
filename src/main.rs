use std::{error::Error, process::ExitCode};

use clap::Parser;
use gitbundle::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_current_version, do_ensure, do_refresh, do_view_url},
    },
    config::GitBundleConfig,
    default_root, DEFAULT_TRACKING_REF,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = CliArgs::parse();
    let config = GitBundleConfig::load()?;

    let root = match cli_args.root.or(config.root) {
        Some(root) => root,
        None => default_root()?,
    };
    let tracking_ref = config
        .tracking_ref
        .unwrap_or_else(|| DEFAULT_TRACKING_REF.to_owned());

    match cli_args.cmd {
        Command::Ensure { bundle, version } => do_ensure(&root, &tracking_ref, bundle, version)?,
        Command::Refresh { bundle } => do_refresh(&root, &tracking_ref, bundle)?,
        Command::CurrentVersion { bundle, version } => {
            do_current_version(&root, &tracking_ref, bundle, version)?
        }
        Command::ViewUrl { url, version } => do_view_url(&url, version.as_deref())?,
    }
    Ok(())
}
