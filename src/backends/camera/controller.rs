// SPDX-License-Identifier: GPL-3.0-only

//! Camera controller
//!
//! The controller provides:
//! - Device open (with retry) and close
//! - Stream lifecycle: one capture worker plus an optional recording session,
//!   started together and stopped together
//! - Snapshots on demand through the handoff channels
//!
//! The device is owned by the controller while idle and moved into the
//! capture worker while streaming; `close_stream` joins the worker and takes
//! it back.

use super::acquisition::FrameAcquirer;
use super::frame_loop::{CaptureWorker, ExitReason, WorkerStats};
use super::handoff::{Commander, WorkerChannels, handoff_channels};
use super::open_retry::DeviceOpenRetry;
use super::recording::{RecordingSession, RecordingSummary};
use super::{DeviceState, FrameBundle, InitParameters, StereoDevice};
use crate::config::{Config, DeviceConfig, StreamSettings};
use crate::errors::{CameraError, CameraResult};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

const WORKER_NAME: &str = "stereo-capture";

/// Result of a stopped stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub worker: WorkerStats,
    pub exit_reason: ExitReason,
    /// Present when the stream was recording
    pub recording: Option<RecordingSummary>,
}

struct ActiveStream {
    worker: CaptureWorker,
    session: Option<RecordingSession>,
}

enum DeviceSlot {
    Idle {
        device: Box<dyn StereoDevice>,
        open: bool,
    },
    Streaming(ActiveStream),
    /// Device went down with a panicked worker
    Lost,
}

/// Facade over device, capture worker and recording session
pub struct CameraController {
    config: DeviceConfig,
    settings: StreamSettings,
    slot: DeviceSlot,
    commander: Commander,
    worker_channels: Option<WorkerChannels>,
}

impl CameraController {
    /// Create a controller with default stream settings
    ///
    /// Fails fast on a configuration that enables neither depth nor color.
    /// The device is not opened.
    pub fn new(device: Box<dyn StereoDevice>, config: DeviceConfig) -> CameraResult<Self> {
        Self::with_settings(device, config, StreamSettings::default())
    }

    pub fn from_config(device: Box<dyn StereoDevice>, config: &Config) -> CameraResult<Self> {
        Self::with_settings(device, config.device, config.stream.clone())
    }

    pub fn with_settings(
        device: Box<dyn StereoDevice>,
        config: DeviceConfig,
        settings: StreamSettings,
    ) -> CameraResult<Self> {
        config.validate()?;

        info!(
            device = device.name(),
            resolution = %config.resolution,
            depth_mode = %config.depth_mode,
            fps = config.fps,
            depth = config.depth_enabled,
            color = config.color_enabled,
            "Creating camera controller"
        );

        let (commander, worker_channels) = handoff_channels();
        Ok(Self {
            config,
            settings,
            slot: DeviceSlot::Idle {
                device,
                open: false,
            },
            commander,
            worker_channels: Some(worker_channels),
        })
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    pub fn state(&self) -> DeviceState {
        match &self.slot {
            DeviceSlot::Idle { open: true, .. } => DeviceState::Open,
            DeviceSlot::Idle { open: false, .. } | DeviceSlot::Lost => DeviceState::Closed,
            DeviceSlot::Streaming(_) => DeviceState::Streaming,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session().is_some_and(|s| s.is_active())
    }

    /// File the current recording is written to
    pub fn recording_path(&self) -> Option<&Path> {
        self.session().map(|s| s.path())
    }

    /// Frames counted by the current recording so far
    pub fn frames_recorded(&self) -> Option<u64> {
        self.session().map(|s| s.frames_recorded())
    }

    fn session(&self) -> Option<&RecordingSession> {
        match &self.slot {
            DeviceSlot::Streaming(stream) => stream.session.as_ref(),
            _ => None,
        }
    }

    /// Open the device using the configured attempt budget
    pub fn open_device(&mut self) -> bool {
        self.open_device_with(self.settings.open_attempts)
    }

    /// Open the device, trying up to `max_attempts` times
    pub fn open_device_with(&mut self, max_attempts: u32) -> bool {
        let params = InitParameters::from(&self.config);
        match &mut self.slot {
            DeviceSlot::Idle { open: true, .. } => {
                debug!("Device already open");
                true
            }
            DeviceSlot::Idle { device, open } => {
                *open = DeviceOpenRetry::new(max_attempts).open(device.as_mut(), &params);
                *open
            }
            DeviceSlot::Streaming(_) => {
                warn!("Cannot reopen the device while streaming");
                false
            }
            DeviceSlot::Lost => {
                error!("Device handle was lost with a crashed capture worker");
                false
            }
        }
    }

    /// Close an open device that is not streaming
    pub fn close_device(&mut self) -> CameraResult<()> {
        match &mut self.slot {
            DeviceSlot::Idle { device, open } => {
                if *open {
                    device.close();
                    *open = false;
                    info!(device = device.name(), "Device closed");
                }
                Ok(())
            }
            DeviceSlot::Streaming(_) => Err(CameraError::AlreadyStreaming),
            DeviceSlot::Lost => Err(CameraError::WorkerPanicked),
        }
    }

    /// Start streaming with on-device recording to a timestamped file
    ///
    /// Returns the recording path as soon as the worker is running.
    pub fn start_stream(&mut self) -> CameraResult<PathBuf> {
        let path = self.launch(true)?;
        path.ok_or(CameraError::NotStreaming)
    }

    /// Start streaming without recording; snapshots only
    pub fn start_preview(&mut self) -> CameraResult<()> {
        self.launch(false).map(|_| ())
    }

    fn launch(&mut self, record: bool) -> CameraResult<Option<PathBuf>> {
        let mut device = match std::mem::replace(&mut self.slot, DeviceSlot::Lost) {
            DeviceSlot::Idle { device, open: true } => device,
            other => {
                let err = match other {
                    DeviceSlot::Streaming(_) => CameraError::AlreadyStreaming,
                    _ => CameraError::DeviceNotOpen,
                };
                self.slot = other;
                return Err(err);
            }
        };

        let session = if record {
            let mut session = RecordingSession::new(
                &self.settings.video_dir,
                self.settings.compression,
                Local::now(),
            );
            if let Err(e) = session.start(device.as_mut()) {
                error!(error = %e, "Failed to start recording");
                self.abandon_launch(device, None);
                return Err(e.into());
            }
            Some(session)
        } else {
            None
        };

        let channels = match self.worker_channels.take() {
            Some(channels) => channels,
            None => {
                let (commander, channels) = handoff_channels();
                self.commander = commander;
                channels
            }
        };

        let acquirer = FrameAcquirer::new(&self.config, self.settings.acquisition_timeout());
        let tracker = session.as_ref().map(|s| s.tracker());
        let worker = match CaptureWorker::spawn(WORKER_NAME, device, acquirer, channels, tracker) {
            Ok(worker) => worker,
            Err(failure) => {
                self.abandon_launch(failure.device, session);
                return Err(failure.error);
            }
        };

        let path = session.as_ref().map(|s| s.path().to_path_buf());
        self.slot = DeviceSlot::Streaming(ActiveStream { worker, session });

        info!(recording = ?path, "Stream started");
        Ok(path)
    }

    /// Undo a launch that never got a worker running: disable recording if it
    /// was enabled and put the device back into the idle slot
    fn abandon_launch(
        &mut self,
        mut device: Box<dyn StereoDevice>,
        session: Option<RecordingSession>,
    ) {
        if let Some(mut session) = session
            && session.is_recording()
            && let Err(e) = session.finish(device.as_mut())
        {
            warn!(error = %e, "Failed to roll back recording");
        }
        self.slot = DeviceSlot::Idle { device, open: true };
    }

    /// Stop the stream: stop and join the worker, then disable recording
    pub fn close_stream(&mut self) -> CameraResult<StreamSummary> {
        let mut stream = match std::mem::replace(&mut self.slot, DeviceSlot::Lost) {
            DeviceSlot::Streaming(stream) => stream,
            other => {
                self.slot = other;
                return Err(CameraError::NotStreaming);
            }
        };

        info!("Closing stream");

        // Release the frame receiver so a worker blocked on delivery can exit
        let (commander, channels) = handoff_channels();
        let stopper = std::mem::replace(&mut self.commander, commander).into_command_sender();
        self.worker_channels = Some(channels);

        // Stop goes in first so the worker sees it on its next poll; cancel
        // only unblocks a grab retry. A slot still holding an abandoned
        // request is drained by the worker once cancel is raised.
        let queued = stopper.try_stop();
        stream.worker.request_cancel();
        if !queued {
            stopper.stop();
        }

        let exit = stream.worker.join()?;
        let mut device = exit.device;

        // The session stays active until the worker is joined so every
        // completed grab is counted
        let recording = match stream.session.as_mut() {
            Some(session) => match session.finish(device.as_mut()) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    warn!(error = %e, "Recording session was not active");
                    None
                }
            },
            None => None,
        };

        self.slot = DeviceSlot::Idle { device, open: true };

        Ok(StreamSummary {
            worker: exit.stats,
            exit_reason: exit.reason,
            recording,
        })
    }

    /// Wait for the next frame acquired after this call
    ///
    /// Blocks until the worker answers, or until the configured snapshot
    /// timeout passes.
    pub fn take_picture(&mut self) -> CameraResult<FrameBundle> {
        if !matches!(self.slot, DeviceSlot::Streaming(_)) {
            return Err(CameraError::NotStreaming);
        }
        self.commander
            .request_frame(self.settings.snapshot_timeout())
    }
}

impl Drop for CameraController {
    fn drop(&mut self) {
        if matches!(self.slot, DeviceSlot::Streaming(_)) {
            debug!("CameraController dropped while streaming, closing stream");
            if let Err(e) = self.close_stream() {
                warn!(error = %e, "Failed to close stream on drop");
            }
        }
        if let Err(e) = self.close_device() {
            debug!(error = %e, "Device not closed on drop");
        }
    }
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("recording", &self.is_recording())
            .finish()
    }
}
