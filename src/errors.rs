// SPDX-License-Identifier: MPL-2.0

//! Error types for the capture engine

use crate::backends::camera::types::{DeviceError, ImageView};
use std::fmt;
use std::time::Duration;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Top-level error returned by the camera controller
#[derive(Debug, Clone, PartialEq)]
pub enum CameraError {
    /// Invalid configuration
    Config(ConfigError),
    /// Device call failed outside the capture loop
    Device(DeviceError),
    /// A frame could not be acquired
    Acquisition(AcquisitionError),
    /// Recording could not be started or stopped
    Recording(RecordingError),
    /// Operation needs an open device
    DeviceNotOpen,
    /// A stream is already running
    AlreadyStreaming,
    /// Operation needs a running stream
    NotStreaming,
    /// Capture worker exited and no longer answers commands
    WorkerStopped,
    /// No frame arrived before the snapshot deadline
    SnapshotTimedOut(Duration),
    /// Stop command could not be queued before the deadline
    StopTimedOut(Duration),
    /// Capture worker thread could not be spawned
    WorkerSpawn(String),
    /// Capture worker thread panicked; the device handle was lost with it
    WorkerPanicked,
    /// Storage/filesystem errors
    Storage(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Neither depth nor color capture is enabled
    NoImageStreams,
    /// Frame rate must be positive
    InvalidFrameRate(u32),
    /// Resolution name not recognized
    UnknownResolution(String),
    /// Depth mode name not recognized
    UnknownDepthMode(String),
    /// Configuration file could not be parsed or written
    Parse(String),
    /// Configuration file could not be read
    Io(String),
}

/// Failure of one acquisition cycle
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// Grab kept failing until the acquisition deadline passed
    TimedOut {
        attempts: u64,
        last_error: DeviceError,
    },
    /// Grab succeeded but a view could not be retrieved
    Retrieve { view: ImageView, error: DeviceError },
    /// Worker is shutting down
    Cancelled,
    /// Acquirer has no view enabled
    Config(ConfigError),
}

impl AcquisitionError {
    /// Whether the device completed a grab before the failure
    pub fn frame_grabbed(&self) -> bool {
        matches!(self, AcquisitionError::Retrieve { .. })
    }
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingError {
    /// Device refused to enable recording
    EnableFailed(DeviceError),
    /// Recording already in progress
    AlreadyRecording,
    /// No recording in progress
    NotRecording,
    /// Output directory could not be prepared
    OutputDir(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Config(e) => write!(f, "Configuration error: {}", e),
            CameraError::Device(e) => write!(f, "Device error: {}", e),
            CameraError::Acquisition(e) => write!(f, "Acquisition error: {}", e),
            CameraError::Recording(e) => write!(f, "Recording error: {}", e),
            CameraError::DeviceNotOpen => write!(f, "Device is not open"),
            CameraError::AlreadyStreaming => write!(f, "Stream already running"),
            CameraError::NotStreaming => write!(f, "No stream running"),
            CameraError::WorkerStopped => write!(f, "Capture worker has stopped"),
            CameraError::SnapshotTimedOut(d) => {
                write!(f, "No frame received within {} ms", d.as_millis())
            }
            CameraError::StopTimedOut(d) => {
                write!(f, "Stop command not accepted within {} ms", d.as_millis())
            }
            CameraError::WorkerSpawn(msg) => write!(f, "Failed to spawn capture worker: {}", msg),
            CameraError::WorkerPanicked => write!(f, "Capture worker panicked"),
            CameraError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoImageStreams => {
                write!(f, "At least one of depth or color capture must be enabled")
            }
            ConfigError::InvalidFrameRate(fps) => {
                write!(f, "Frame rate must be positive (got {})", fps)
            }
            ConfigError::UnknownResolution(name) => write!(f, "Unknown resolution: {}", name),
            ConfigError::UnknownDepthMode(name) => write!(f, "Unknown depth mode: {}", name),
            ConfigError::Parse(msg) => write!(f, "Invalid configuration file: {}", msg),
            ConfigError::Io(msg) => write!(f, "Cannot access configuration file: {}", msg),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionError::TimedOut {
                attempts,
                last_error,
            } => write!(
                f,
                "Grab failed {} times before the deadline (last: {})",
                attempts, last_error
            ),
            AcquisitionError::Retrieve { view, error } => {
                write!(f, "Failed to retrieve {} view: {}", view, error)
            }
            AcquisitionError::Cancelled => write!(f, "Acquisition cancelled"),
            AcquisitionError::Config(e) => write!(f, "Acquisition misconfigured: {}", e),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::EnableFailed(e) => write!(f, "Failed to enable recording: {}", e),
            RecordingError::AlreadyRecording => write!(f, "Recording already in progress"),
            RecordingError::NotRecording => write!(f, "No recording in progress"),
            RecordingError::OutputDir(msg) => {
                write!(f, "Cannot prepare recording directory: {}", msg)
            }
        }
    }
}

impl std::error::Error for CameraError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for AcquisitionError {}
impl std::error::Error for RecordingError {}

impl From<ConfigError> for CameraError {
    fn from(err: ConfigError) -> Self {
        CameraError::Config(err)
    }
}

impl From<DeviceError> for CameraError {
    fn from(err: DeviceError) -> Self {
        CameraError::Device(err)
    }
}

impl From<AcquisitionError> for CameraError {
    fn from(err: AcquisitionError) -> Self {
        CameraError::Acquisition(err)
    }
}

impl From<RecordingError> for CameraError {
    fn from(err: RecordingError) -> Self {
        CameraError::Recording(err)
    }
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
