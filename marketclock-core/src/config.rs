//! Configuration values passed explicitly into the engine.
//!
//! `EngineConfig` carries the numeric knobs of the rule pipeline and the
//! status projector. `Settings` is the on-disk `marketclock.toml` shape read
//! by front ends; the engine itself never looks at files or environment.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum supported `offset_days`, and the default lookback.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 2;

/// Days after the instant's date generated for a status query.
pub const DEFAULT_STATUS_HORIZON_DAYS: u32 = 5;

/// Errors from loading a settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs for phase generation and status projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days scanned before the requested start so sessions that began
    /// earlier and end inside the window are found. Also the largest
    /// `offset_days` a rule may carry.
    pub lookback_days: u32,
    /// Days after the instant's date generated for a status query.
    pub status_horizon_days: u32,
    /// Follow `replaced_by` links when a market has been superseded.
    pub follow_replacements: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            status_horizon_days: DEFAULT_STATUS_HORIZON_DAYS,
            follow_replacements: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.status_horizon_days == 0 {
            return Err(ConfigError::Invalid(
                "status_horizon_days must be at least 1".into(),
            ));
        }
        if self.lookback_days > 31 {
            return Err(ConfigError::Invalid(format!(
                "lookback_days {} is larger than any supported session",
                self.lookback_days
            )));
        }
        Ok(())
    }
}

/// Where the snapshot lives on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub dir: Option<PathBuf>,
}

/// Contents of `marketclock.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub engine: EngineConfig,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content)?;
        settings.engine.validate()?;
        Ok(settings)
    }

    /// Serialize back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
