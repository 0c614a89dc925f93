use std::{collections::HashMap, path::PathBuf};

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Settings read from `GITBUNDLE_*` environment variables.
pub struct GitBundleConfig {
    pub root: Option<PathBuf>,
    pub tracking_ref: Option<String>,
}

impl GitBundleConfig {
    pub fn load() -> anyhow::Result<Self> {
        let raw_config = RawConfig::load(None)?;

        Ok(Self {
            root: raw_config.cache.dir,
            tracking_ref: raw_config.git.reference,
        })
    }
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct RawConfig {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    git: GitConfig,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct CacheConfig {
    dir: Option<PathBuf>,
}

#[derive(Default, Debug, Deserialize, PartialEq, Eq)]
struct GitConfig {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

impl RawConfig {
    fn load(env: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("GITBUNDLE")
                    .separator("_")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}
