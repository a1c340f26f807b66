// SPDX-License-Identifier: GPL-3.0-only

//! Device enumerations and application-wide defaults

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default number of attempts made when opening the device
pub const DEFAULT_OPEN_ATTEMPTS: u32 = 5;

/// Default target frame rate
pub const DEFAULT_FPS: u32 = 10;

/// Directory recordings are written to unless configured otherwise
pub const DEFAULT_VIDEO_DIR: &str = "./videos";

/// Container extension of on-device recordings
pub const RECORDING_EXTENSION: &str = "svo";

/// Timestamp format used for recording file names and session ids
pub const RECORDING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d---%H-%M-%S";

/// Sensor resolution presets supported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// 1280x720 per eye
    Hd720,
    /// 1920x1080 per eye
    #[default]
    Hd1080,
    /// 2208x1242 per eye
    Hd2k,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Resolution::Hd720, Resolution::Hd1080, Resolution::Hd2k];

    /// Width and height of a single sensor image
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::Hd720 => (1280, 720),
            Resolution::Hd1080 => (1920, 1080),
            Resolution::Hd2k => (2208, 1242),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Resolution::Hd720 => "720p",
            Resolution::Hd1080 => "1080p",
            Resolution::Hd2k => "2K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Resolution {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720" | "720p" | "hd720" => Ok(Resolution::Hd720),
            "1080" | "1080p" | "hd1080" => Ok(Resolution::Hd1080),
            "2k" | "hd2k" => Ok(Resolution::Hd2k),
            other => Err(ConfigError::UnknownResolution(other.to_string())),
        }
    }
}

/// Depth computation quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthMode {
    /// Fastest depth estimation, lowest quality
    #[default]
    Performance,
    /// Balanced
    Quality,
    /// Highest quality, most expensive
    Ultra,
}

impl DepthMode {
    pub const ALL: [DepthMode; 3] = [DepthMode::Performance, DepthMode::Quality, DepthMode::Ultra];

    pub fn display_name(&self) -> &'static str {
        match self {
            DepthMode::Performance => "Performance",
            DepthMode::Quality => "Quality",
            DepthMode::Ultra => "Ultra",
        }
    }
}

impl std::fmt::Display for DepthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for DepthMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perf" | "performance" => Ok(DepthMode::Performance),
            "qual" | "quality" => Ok(DepthMode::Quality),
            "ultra" => Ok(DepthMode::Ultra),
            other => Err(ConfigError::UnknownDepthMode(other.to_string())),
        }
    }
}

/// Compression applied by the device when recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Lossless PNG/ZSTD frames, large files
    Lossless,
    /// H.264 hardware encoding
    #[default]
    H264,
    /// H.265 hardware encoding
    H265,
}

impl std::fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMode::Lossless => write!(f, "lossless"),
            CompressionMode::H264 => write!(f, "H.264"),
            CompressionMode::H265 => write!(f, "H.265"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_aliases() {
        assert_eq!("720".parse::<Resolution>().unwrap(), Resolution::Hd720);
        assert_eq!("1080p".parse::<Resolution>().unwrap(), Resolution::Hd1080);
        assert_eq!("2K".parse::<Resolution>().unwrap(), Resolution::Hd2k);
        assert!(matches!(
            "4k".parse::<Resolution>(),
            Err(ConfigError::UnknownResolution(_))
        ));
    }

    #[test]
    fn test_depth_mode_aliases() {
        assert_eq!("perf".parse::<DepthMode>().unwrap(), DepthMode::Performance);
        assert_eq!("Qual".parse::<DepthMode>().unwrap(), DepthMode::Quality);
        assert_eq!(" ultra ".parse::<DepthMode>().unwrap(), DepthMode::Ultra);
        assert!("neural".parse::<DepthMode>().is_err());
    }

    #[test]
    fn test_resolutions_ordered_by_size() {
        let mut prev = 0;
        for resolution in Resolution::ALL {
            let (w, h) = resolution.dimensions();
            assert!(w * h > prev);
            prev = w * h;
        }
    }
}
