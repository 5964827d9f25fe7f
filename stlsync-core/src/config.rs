/// Importer settings.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transform::{Axis, TransformConfig};

/// Folder name the CAD exporter writes into, under the desktop.
pub const DEFAULT_FOLDER: &str = "S2B_Temp";

/// Seconds between two polls of the watched folder.
pub const DEFAULT_POLL_SECS: u64 = 4;

/// `~/Desktop/S2B_Temp`, or a relative path when there is no home directory.
pub fn default_watch_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join("Desktop")
        .join(DEFAULT_FOLDER)
}

fn default_up() -> Axis {
    Axis::Y
}

fn default_forward() -> Axis {
    Axis::Z
}

fn default_scale() -> f32 {
    0.001
}

fn default_poll_secs() -> u64 {
    DEFAULT_POLL_SECS
}

/// User-facing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_up")]
    pub up_axis: Axis,

    #[serde(default = "default_forward")]
    pub forward_axis: Axis,

    /// Uniform scale baked into imported points.
    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Whether the live watch session is switched on.
    #[serde(default)]
    pub live_watch: bool,

    #[serde(default = "default_poll_secs")]
    pub poll_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            up_axis: default_up(),
            forward_axis: default_forward(),
            scale: default_scale(),
            watch_dir: default_watch_dir(),
            live_watch: false,
            poll_interval_secs: default_poll_secs(),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file; missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn transform(&self) -> TransformConfig {
        TransformConfig::new(self.up_axis, self.forward_axis, self.scale)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Check that the axes and scale form a matrix and the interval is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        self.transform().matrix()?;
        Ok(())
    }
}
