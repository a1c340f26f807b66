// SPDX-License-Identifier: MPL-2.0

//! Stereo camera capture engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  CameraController   │  ← open/start/stop/snapshot facade
//! └───┬─────────────┬───┘
//!     │ commands    ▲ frames            (capacity-1 handoff channels)
//!     ▼             │
//! ┌─────────────────────┐
//! │   CaptureWorker     │  ← owns the device while streaming,
//! └──────────┬──────────┘    counts frames for the RecordingSession
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │ StereoDevice trait  │  ← hardware SDK or VirtualStereoCamera
//! └─────────────────────┘
//! ```

pub mod acquisition;
pub mod controller;
pub mod frame_loop;
pub mod handoff;
pub mod open_retry;
pub mod recording;
pub mod types;

pub use controller::{CameraController, StreamSummary};
pub use frame_loop::{ExitReason, WorkerStats};
pub use open_retry::DeviceOpenRetry;
pub use recording::{RecordingSession, RecordingSummary};
pub use types::*;

/// Boundary to the physical stereo camera
///
/// Every call may fail. Calls are synchronous and may block for as long as
/// the hardware takes; implementations are only ever driven from one thread
/// at a time.
pub trait StereoDevice: Send {
    /// Human readable device name, used in logs
    fn name(&self) -> &str;

    /// Open the device with the given parameters
    fn open(&mut self, params: &InitParameters) -> DeviceResult<()>;

    /// Close the device and release it
    fn close(&mut self);

    /// Grab the next frame into the device's internal buffer
    fn grab(&mut self, runtime: &RuntimeParameters) -> DeviceResult<()>;

    /// Copy one view of the last grabbed frame out of the device buffer
    fn retrieve_image(&mut self, view: ImageView) -> DeviceResult<DeviceImage>;

    /// Start persisting grabbed frames to a file
    fn enable_recording(&mut self, params: &RecordingParameters) -> DeviceResult<()>;

    /// Stop persisting frames and finalize the file
    fn disable_recording(&mut self);
}

impl<D: StereoDevice + ?Sized> StereoDevice for Box<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn open(&mut self, params: &InitParameters) -> DeviceResult<()> {
        (**self).open(params)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn grab(&mut self, runtime: &RuntimeParameters) -> DeviceResult<()> {
        (**self).grab(runtime)
    }

    fn retrieve_image(&mut self, view: ImageView) -> DeviceResult<DeviceImage> {
        (**self).retrieve_image(view)
    }

    fn enable_recording(&mut self, params: &RecordingParameters) -> DeviceResult<()> {
        (**self).enable_recording(params)
    }

    fn disable_recording(&mut self) {
        (**self).disable_recording()
    }
}
