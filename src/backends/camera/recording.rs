// SPDX-License-Identifier: GPL-3.0-only

//! Recording session lifecycle
//!
//! A session moves `Idle → Recording → Finished`. While recording, the
//! capture worker counts every successful grab through a [`SessionTracker`];
//! the `active` flag is shared atomically between the controller, which
//! clears it, and the worker, which reads it on every cycle.

use super::{RecordingParameters, StereoDevice};
use crate::constants::CompressionMode;
use crate::errors::RecordingError;
use crate::storage;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Idle,
    Recording,
    Finished,
}

#[derive(Debug, Default)]
struct SessionCounters {
    active: AtomicBool,
    frames_recorded: AtomicU64,
}

/// Worker-side view of a session
#[derive(Debug, Clone)]
pub struct SessionTracker {
    counters: Arc<SessionCounters>,
}

impl SessionTracker {
    pub fn is_active(&self) -> bool {
        self.counters.active.load(Ordering::SeqCst)
    }

    /// Count one grabbed frame if the session is still active
    pub fn record_frame(&self) {
        if self.is_active() {
            self.counters.frames_recorded.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Final state of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSummary {
    pub id: String,
    pub path: PathBuf,
    pub frames_recorded: u64,
    pub started_at: DateTime<Local>,
    pub stopped_at: DateTime<Local>,
}

/// One on-device recording, from enabling to disabling recording
#[derive(Debug)]
pub struct RecordingSession {
    id: String,
    path: PathBuf,
    compression: CompressionMode,
    started_at: DateTime<Local>,
    phase: SessionPhase,
    counters: Arc<SessionCounters>,
}

impl RecordingSession {
    /// Create an idle session whose file name and id derive from `now`
    pub fn new(video_dir: &Path, compression: CompressionMode, now: DateTime<Local>) -> Self {
        Self {
            id: storage::recording_timestamp(&now),
            path: storage::recording_path(video_dir, &now),
            compression,
            started_at: now,
            phase: SessionPhase::Idle,
            counters: Arc::new(SessionCounters::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn is_recording(&self) -> bool {
        self.phase == SessionPhase::Recording
    }

    pub fn frames_recorded(&self) -> u64 {
        self.counters.frames_recorded.load(Ordering::SeqCst)
    }

    pub fn tracker(&self) -> SessionTracker {
        SessionTracker {
            counters: Arc::clone(&self.counters),
        }
    }

    /// Enable on-device recording and mark the session active
    pub fn start(&mut self, device: &mut dyn StereoDevice) -> Result<(), RecordingError> {
        if self.phase != SessionPhase::Idle {
            return Err(RecordingError::AlreadyRecording);
        }

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir).map_err(|e| {
                RecordingError::OutputDir(format!("{}: {}", dir.display(), e))
            })?;
        }

        let params = RecordingParameters {
            video_filename: self.path.clone(),
            compression: self.compression,
        };
        device
            .enable_recording(&params)
            .map_err(RecordingError::EnableFailed)?;

        self.counters.active.store(true, Ordering::SeqCst);
        self.phase = SessionPhase::Recording;

        info!(
            session = %self.id,
            path = %self.path.display(),
            compression = %self.compression,
            "Recording started"
        );
        Ok(())
    }

    /// Stop counting frames; the device keeps recording until `finish`
    pub fn deactivate(&self) {
        self.counters.active.store(false, Ordering::SeqCst);
    }

    /// Disable on-device recording and close the session
    ///
    /// Must be called after the worker driving the device has been joined.
    pub fn finish(
        &mut self,
        device: &mut dyn StereoDevice,
    ) -> Result<RecordingSummary, RecordingError> {
        if self.phase != SessionPhase::Recording {
            return Err(RecordingError::NotRecording);
        }

        self.deactivate();
        device.disable_recording();
        self.phase = SessionPhase::Finished;

        let summary = RecordingSummary {
            id: self.id.clone(),
            path: self.path.clone(),
            frames_recorded: self.frames_recorded(),
            started_at: self.started_at,
            stopped_at: Local::now(),
        };

        info!(
            session = %summary.id,
            frames_recorded = summary.frames_recorded,
            path = %summary.path.display(),
            "Recording stopped"
        );
        Ok(summary)
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.phase == SessionPhase::Recording {
            warn!(session = %self.id, "Recording session dropped while still recording");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{DeviceError, InitParameters};
    use crate::backends::virtual_camera::VirtualStereoCamera;
    use crate::config::DeviceConfig;
    use chrono::TimeZone;

    fn session_in(dir: &Path) -> RecordingSession {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        RecordingSession::new(dir, CompressionMode::H264, now)
    }

    fn open_device() -> VirtualStereoCamera {
        let mut device = VirtualStereoCamera::builder().build();
        device
            .open(&InitParameters::from(&DeviceConfig::default()))
            .unwrap();
        device
    }

    #[test]
    fn test_id_and_path_from_timestamp() {
        let session = session_in(Path::new("videos"));
        assert_eq!(session.id(), "2024-03-09---14-05-07");
        assert_eq!(
            session.path(),
            Path::new("videos/2024-03-09---14-05-07.svo")
        );
        assert!(!session.is_active());
    }

    #[test]
    fn test_start_count_finish() {
        let dir = std::env::temp_dir().join("stereo-camera-recording-test");
        let mut device = open_device();
        let stats = device.stats();
        let mut session = session_in(&dir);

        session.start(&mut device).unwrap();
        assert!(session.is_active());
        assert_eq!(stats.recording_path(), Some(session.path().to_path_buf()));

        let tracker = session.tracker();
        for _ in 0..3 {
            tracker.record_frame();
        }

        let summary = session.finish(&mut device).unwrap();
        assert_eq!(summary.frames_recorded, 3);
        assert_eq!(stats.disable_recording_calls(), 1);

        // Frames after the session closed are not counted
        tracker.record_frame();
        assert_eq!(session.frames_recorded(), 3);
    }

    #[test]
    fn test_finish_twice_is_an_error() {
        let dir = std::env::temp_dir().join("stereo-camera-recording-test");
        let mut device = open_device();
        let stats = device.stats();
        let mut session = session_in(&dir);

        session.start(&mut device).unwrap();
        session.finish(&mut device).unwrap();
        assert_eq!(
            session.finish(&mut device),
            Err(RecordingError::NotRecording)
        );
        assert_eq!(stats.disable_recording_calls(), 1);
    }

    #[test]
    fn test_finish_without_start() {
        let mut device = open_device();
        let mut session = session_in(Path::new("videos"));
        assert_eq!(
            session.finish(&mut device),
            Err(RecordingError::NotRecording)
        );
    }

    #[test]
    fn test_enable_failure_leaves_session_idle() {
        let dir = std::env::temp_dir().join("stereo-camera-recording-test");
        let mut device = VirtualStereoCamera::builder().build();
        let mut session = session_in(&dir);

        // Device was never opened
        assert_eq!(
            session.start(&mut device),
            Err(RecordingError::EnableFailed(DeviceError::NotOpened))
        );
        assert!(!session.is_active());
        assert!(!session.is_recording());
    }
}
