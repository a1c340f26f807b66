// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for stereo camera devices

use crate::config::DeviceConfig;
use crate::constants::{CompressionMode, DepthMode, Resolution};
use crate::errors::ConfigError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Result type for calls into the device
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Status reported by the device when a call does not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// No camera is connected
    CameraNotDetected,
    /// Camera was detected but could not be configured
    CameraFailedToSetup,
    /// USB link cannot carry the requested resolution/frame rate
    LowUsbBandwidth,
    /// Requested resolution not supported
    InvalidResolution,
    /// Device was not opened before the call
    NotOpened,
    /// Recorded input has no more frames
    EndOfStream,
    /// Other device failure
    Failure(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::CameraNotDetected => write!(f, "CAMERA NOT DETECTED"),
            DeviceError::CameraFailedToSetup => write!(f, "CAMERA FAILED TO SETUP"),
            DeviceError::LowUsbBandwidth => write!(f, "LOW USB BANDWIDTH"),
            DeviceError::InvalidResolution => write!(f, "INVALID RESOLUTION"),
            DeviceError::NotOpened => write!(f, "CAMERA NOT OPENED"),
            DeviceError::EndOfStream => write!(f, "END OF STREAM"),
            DeviceError::Failure(msg) => write!(f, "FAILURE: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Views retrieved from the device after a grab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageView {
    /// Normalized depth map rendered as a displayable image
    Depth,
    /// Left and right color images side by side
    SideBySide,
}

impl std::fmt::Display for ImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageView::Depth => write!(f, "depth"),
            ImageView::SideBySide => write!(f, "side-by-side"),
        }
    }
}

/// Pixel layout of a retrieved image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit BGRA, 4 bytes per pixel
    Bgra8,
    /// 8-bit single channel
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Image copied out of the device buffer
///
/// The pixel data is reference counted so bundles can be cloned and
/// handed across threads without copying.
#[derive(Debug, Clone)]
pub struct DeviceImage {
    pub view: ImageView,
    pub width: u32,
    pub height: u32,
    /// Bytes per row
    pub stride: u32,
    pub format: PixelFormat,
    /// Index of the device frame this image was retrieved from
    pub frame_index: u64,
    pub data: Arc<[u8]>,
}

/// Images produced by one acquisition cycle
///
/// Holds a depth image iff depth capture is enabled and a color image iff
/// color capture is enabled, always in that order. A bundle with no image
/// cannot be constructed.
#[derive(Debug, Clone)]
pub struct FrameBundle {
    sequence: u64,
    acquired_at: Instant,
    depth: Option<DeviceImage>,
    color: Option<DeviceImage>,
}

impl FrameBundle {
    pub fn new(
        sequence: u64,
        acquired_at: Instant,
        depth: Option<DeviceImage>,
        color: Option<DeviceImage>,
    ) -> Result<Self, ConfigError> {
        if depth.is_none() && color.is_none() {
            return Err(ConfigError::NoImageStreams);
        }
        Ok(Self {
            sequence,
            acquired_at,
            depth,
            color,
        })
    }

    /// Acquisition counter of the worker that produced this bundle, starting at 1
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the grab for this bundle completed
    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    pub fn depth(&self) -> Option<&DeviceImage> {
        self.depth.as_ref()
    }

    pub fn color(&self) -> Option<&DeviceImage> {
        self.color.as_ref()
    }

    /// Device frame index shared by all images of the bundle
    pub fn frame_index(&self) -> u64 {
        self.images().next().map(|img| img.frame_index).unwrap_or(0)
    }

    /// Images in bundle order: depth first, then color
    pub fn images(&self) -> impl Iterator<Item = &DeviceImage> {
        self.depth.iter().chain(self.color.iter())
    }

    pub fn len(&self) -> usize {
        self.images().count()
    }

    /// Always false for a constructed bundle
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parameters used to open the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitParameters {
    pub resolution: Resolution,
    pub depth_mode: DepthMode,
    pub fps: u32,
}

impl From<&DeviceConfig> for InitParameters {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            resolution: config.resolution,
            depth_mode: config.depth_mode,
            fps: config.fps,
        }
    }
}

/// Per-grab parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeParameters {
    /// Compute depth during the grab
    pub enable_depth: bool,
}

impl Default for RuntimeParameters {
    fn default() -> Self {
        Self { enable_depth: true }
    }
}

/// Parameters for on-device recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingParameters {
    pub video_filename: PathBuf,
    pub compression: CompressionMode,
}

/// Lifecycle state of the device as seen by the controller
///
/// Recording is orthogonal and only possible while streaming; see
/// `CameraController::is_recording`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceState {
    #[default]
    Closed,
    Open,
    Streaming,
}

impl std::fmt::Display for DeviceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceState::Closed => write!(f, "closed"),
            DeviceState::Open => write!(f, "open"),
            DeviceState::Streaming => write!(f, "streaming"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(view: ImageView, frame_index: u64) -> DeviceImage {
        DeviceImage {
            view,
            width: 2,
            height: 1,
            stride: 8,
            format: PixelFormat::Bgra8,
            frame_index,
            data: Arc::from(vec![0u8; 8]),
        }
    }

    #[test]
    fn test_bundle_requires_an_image() {
        let result = FrameBundle::new(1, Instant::now(), None, None);
        assert_eq!(result.unwrap_err(), ConfigError::NoImageStreams);
    }

    #[test]
    fn test_bundle_order_is_depth_then_color() {
        let bundle = FrameBundle::new(
            3,
            Instant::now(),
            Some(image(ImageView::Depth, 7)),
            Some(image(ImageView::SideBySide, 7)),
        )
        .unwrap();

        let views: Vec<ImageView> = bundle.images().map(|img| img.view).collect();
        assert_eq!(views, vec![ImageView::Depth, ImageView::SideBySide]);
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.frame_index(), 7);
        assert_eq!(bundle.sequence(), 3);
    }

    #[test]
    fn test_color_only_bundle() {
        let bundle = FrameBundle::new(
            1,
            Instant::now(),
            None,
            Some(image(ImageView::SideBySide, 2)),
        )
        .unwrap();
        assert!(bundle.depth().is_none());
        assert_eq!(bundle.len(), 1);
        assert!(!bundle.is_empty());
    }
}
