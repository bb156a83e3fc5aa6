//! Infrastructure implementation of the `ConfigStore` port.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{AppConfig, validate_qualifier};
use crate::domain::error::ConfigError;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "TUNNELGATE_CONFIG";

/// Reads `~/.tunnelgate/config.yaml`, or the file named by `TUNNELGATE_CONFIG`.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<AppConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: AppConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Unparseable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        validate_qualifier(&config.aws.qualifier)?;
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".tunnelgate").join("config.yaml"))
    }
}
