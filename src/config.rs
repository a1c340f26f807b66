// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    CompressionMode, DEFAULT_FPS, DEFAULT_OPEN_ATTEMPTS, DEFAULT_VIDEO_DIR, DepthMode, Resolution,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Device settings, fixed once a controller is constructed
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Sensor resolution
    pub resolution: Resolution,
    /// Depth computation quality
    pub depth_mode: DepthMode,
    /// Target frame rate
    pub fps: u32,
    /// Retrieve the depth view on every acquisition
    pub depth_enabled: bool,
    /// Retrieve the side-by-side color view on every acquisition
    pub color_enabled: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::Hd1080,
            depth_mode: DepthMode::Performance,
            fps: DEFAULT_FPS,
            depth_enabled: true,
            color_enabled: true,
        }
    }
}

impl DeviceConfig {
    /// Reject settings that would produce empty frame bundles or no frames at all
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.depth_enabled && !self.color_enabled {
            return Err(ConfigError::NoImageStreams);
        }
        if self.fps == 0 {
            return Err(ConfigError::InvalidFrameRate(self.fps));
        }
        Ok(())
    }
}

/// Stream, recording and timeout settings
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Directory recordings are written to
    pub video_dir: PathBuf,
    /// Compression used by on-device recording
    pub compression: CompressionMode,
    /// Device open attempts before giving up
    pub open_attempts: u32,
    /// Deadline for `take_picture`; unset waits without bound
    pub snapshot_timeout_ms: Option<u64>,
    /// Deadline for one acquisition cycle; unset retries the grab without bound
    pub acquisition_timeout_ms: Option<u64>,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from(DEFAULT_VIDEO_DIR),
            compression: CompressionMode::H264,
            open_attempts: DEFAULT_OPEN_ATTEMPTS,
            snapshot_timeout_ms: None,
            acquisition_timeout_ms: None,
        }
    }
}

impl StreamSettings {
    pub fn snapshot_timeout(&self) -> Option<Duration> {
        self.snapshot_timeout_ms.map(Duration::from_millis)
    }

    pub fn acquisition_timeout(&self) -> Option<Duration> {
        self.acquisition_timeout_ms.map(Duration::from_millis)
    }
}

/// Complete configuration as stored on disk
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub stream: StreamSettings,
}

impl Config {
    /// Load and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.device.validate()?;
        debug!(path = %path.display(), ?config, "Loaded configuration");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
