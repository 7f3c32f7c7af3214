use super::types::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "GREATBIG_";

/// Service for configuration loading
pub struct ConfigService {
    config_path: PathBuf,
}

impl ConfigService {
    /// Create a config service reading the given TOML file, if it exists
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration: defaults, then the TOML file, then `GREATBIG_*`
    /// environment overrides
    pub fn load(&self) -> Result<AppConfig> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if self.config_path.exists() {
            tracing::debug!("Loading configuration from {}", self.config_path.display());
            figment = figment.merge(Toml::file(&self.config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        Ok(config)
    }
}
