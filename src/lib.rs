// SPDX-License-Identifier: MPL-2.0

//! Stereo Camera - capture engine for stereo depth cameras
//!
//! A background worker drives the device at its native cadence while the
//! rest of the program asks for snapshots on demand; an optional recording
//! session persists the stream on the device side.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: the device boundary, the capture engine and the virtual camera
//! - [`config`]: device and stream configuration
//! - [`constants`]: device enumerations and defaults
//! - [`errors`]: error types
//! - [`storage`]: recording paths and snapshot files
//!
//! # Example
//!
//! ```no_run
//! use stereo_camera::backends::virtual_camera::VirtualStereoCamera;
//! use stereo_camera::{CameraController, DeviceConfig};
//!
//! let device = VirtualStereoCamera::builder().fps(10).build();
//! let mut camera = CameraController::new(Box::new(device), DeviceConfig::default())?;
//! if camera.open_device() {
//!     camera.start_preview()?;
//!     let frame = camera.take_picture()?;
//!     println!("frame {} with {} images", frame.frame_index(), frame.len());
//!     camera.close_stream()?;
//! }
//! # Ok::<(), stereo_camera::CameraError>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod storage;

// Re-export commonly used types
pub use backends::camera::{
    CameraController, DeviceState, FrameBundle, RecordingSummary, StereoDevice, StreamSummary,
};
pub use config::{Config, DeviceConfig, StreamSettings};
pub use constants::{CompressionMode, DepthMode, Resolution};
pub use errors::{CameraError, CameraResult};
