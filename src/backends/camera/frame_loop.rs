// SPDX-License-Identifier: GPL-3.0-only
//! Capture worker thread
//!
//! The worker owns the device for the lifetime of a stream and drives it at
//! its native cadence. Each cycle acquires one frame bundle, then polls the
//! command channel without blocking:
//!
//! - `RequestFrame`: the bundle is handed over on the frame channel, blocking
//!   while a previous bundle is still unclaimed
//! - `Stop`: the loop ends and the device is handed back through `join`
//! - nothing: the bundle is dropped and the next cycle starts immediately
//!
//! A request is only answered with a bundle whose acquisition started at or
//! after the request was issued; a bundle already in progress when the
//! request arrived is dropped and the request is served by the next cycle.

use super::StereoDevice;
use super::acquisition::FrameAcquirer;
use super::handoff::{Command, FrameReply, FrameRequest, Poll, WorkerChannels};
use super::recording::SessionTracker;
use crate::errors::{AcquisitionError, CameraError, CameraResult};
use crossbeam_channel::{SendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Counters kept by the worker over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Bundles acquired successfully
    pub frames_acquired: u64,
    /// Replies handed to the controller
    pub frames_delivered: u64,
    /// Acquisition cycles that ended in an error
    pub failed_acquisitions: u64,
}

/// Why the worker loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// A `Stop` command was consumed
    Stopped,
    /// Cancel signal raised with no command pending
    Cancelled,
    /// Controller dropped its channel ends
    Disconnected,
}

/// Returned by a joined worker
pub struct WorkerExit {
    pub device: Box<dyn StereoDevice>,
    pub stats: WorkerStats,
    pub reason: ExitReason,
}

impl std::fmt::Debug for WorkerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerExit")
            .field("device", &self.device.name())
            .field("stats", &self.stats)
            .field("reason", &self.reason)
            .finish()
    }
}

/// Worker thread could not be started; the device is handed back unused
pub struct SpawnFailure {
    pub device: Box<dyn StereoDevice>,
    pub error: CameraError,
}

impl std::fmt::Debug for SpawnFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnFailure")
            .field("device", &self.device.name())
            .field("error", &self.error)
            .finish()
    }
}

/// Handle to a running capture worker thread
pub struct CaptureWorker {
    /// Thread handle for joining; `None` from the thread means it never got its state
    thread_handle: Option<JoinHandle<Option<WorkerExit>>>,
    /// Aborts a grab retry in progress and ends the loop once no command is pending
    cancel: Arc<AtomicBool>,
    /// Name for logging
    name: String,
}

impl CaptureWorker {
    /// Spawn the worker, moving the device into it
    ///
    /// The loop state is handed over only once the thread exists, so a
    /// failed spawn returns the device to the caller.
    pub fn spawn(
        name: &str,
        device: Box<dyn StereoDevice>,
        acquirer: FrameAcquirer,
        channels: WorkerChannels,
        session: Option<SessionTracker>,
    ) -> Result<Self, SpawnFailure> {
        let cancel = Arc::new(AtomicBool::new(false));
        let loop_state = CaptureLoop {
            name: name.to_string(),
            device,
            acquirer,
            channels,
            session,
            cancel: Arc::clone(&cancel),
            stats: WorkerStats::default(),
        };

        info!(name = %name, recording = loop_state.session.is_some(), "Starting capture worker");

        let (start_tx, start_rx) = bounded::<CaptureLoop>(1);
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || start_rx.recv().ok().map(CaptureLoop::run));

        let thread_handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                error!(name = %name, error = %e, "Failed to spawn capture worker");
                return Err(SpawnFailure {
                    device: loop_state.device,
                    error: CameraError::WorkerSpawn(e.to_string()),
                });
            }
        };

        if let Err(SendError(loop_state)) = start_tx.send(loop_state) {
            // Thread exited before taking its state
            let _ = thread_handle.join();
            return Err(SpawnFailure {
                device: loop_state.device,
                error: CameraError::WorkerSpawn("capture thread exited on start".to_string()),
            });
        }

        Ok(Self {
            thread_handle: Some(thread_handle),
            cancel,
            name: name.to_string(),
        })
    }

    /// Check if the worker thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Raise the cancel signal (non-blocking)
    pub fn request_cancel(&self) {
        debug!(name = %self.name, "Requesting capture worker cancel");
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait for the worker to finish and take the device back
    ///
    /// The worker only finishes after a `Stop` command, after the cancel
    /// signal, or once the controller side of the channels is gone.
    pub fn join(&mut self) -> CameraResult<WorkerExit> {
        let handle = self.thread_handle.take().ok_or(CameraError::WorkerStopped)?;
        debug!(name = %self.name, "Waiting for capture worker to finish");
        match handle.join() {
            Ok(Some(exit)) => {
                debug!(name = %self.name, reason = ?exit.reason, "Capture worker finished");
                Ok(exit)
            }
            Ok(None) => Err(CameraError::WorkerStopped),
            Err(e) => {
                warn!(name = %self.name, "Capture worker panicked: {:?}", e);
                Err(CameraError::WorkerPanicked)
            }
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "CaptureWorker dropped, stopping loop");
            self.request_cancel();
            let _ = self.join();
        }
    }
}

/// State moved into the worker thread
struct CaptureLoop {
    name: String,
    device: Box<dyn StereoDevice>,
    acquirer: FrameAcquirer,
    channels: WorkerChannels,
    session: Option<SessionTracker>,
    cancel: Arc<AtomicBool>,
    stats: WorkerStats,
}

impl CaptureLoop {
    fn run(mut self) -> WorkerExit {
        debug!(name = %self.name, device = self.device.name(), "Capture worker thread started");

        let mut pending: Option<FrameRequest> = None;

        let reason = loop {
            let cycle_start = Instant::now();
            let outcome = self
                .acquirer
                .acquire(self.device.as_mut(), &self.cancel);
            self.account(&outcome);

            if pending.is_none() {
                match self.channels.poll() {
                    Poll::Command(Command::RequestFrame(request)) => pending = Some(request),
                    Poll::Command(Command::Stop) => {
                        debug!(name = %self.name, "Stop command received");
                        break ExitReason::Stopped;
                    }
                    Poll::Empty => {}
                    Poll::Disconnected => break ExitReason::Disconnected,
                }
            }

            match pending.take() {
                Some(request) if request.issued_at <= cycle_start => {
                    let reply = FrameReply {
                        request_id: request.id,
                        outcome,
                    };
                    if !self.channels.deliver(reply) {
                        debug!(name = %self.name, "Frame receiver gone");
                        break ExitReason::Disconnected;
                    }
                    self.stats.frames_delivered += 1;
                    trace!(request = request.id, "Frame delivered");
                }
                // Acquisition began before the request; serve it next cycle
                Some(request) => pending = Some(request),
                None => {}
            }

            if self.cancel.load(Ordering::SeqCst) && pending.is_none() {
                break ExitReason::Cancelled;
            }
        };

        info!(
            name = %self.name,
            reason = ?reason,
            frames_acquired = self.stats.frames_acquired,
            frames_delivered = self.stats.frames_delivered,
            failed_acquisitions = self.stats.failed_acquisitions,
            "Capture worker exiting"
        );

        WorkerExit {
            device: self.device,
            stats: self.stats,
            reason,
        }
    }

    fn account(&mut self, outcome: &Result<super::FrameBundle, AcquisitionError>) {
        let grabbed = match outcome {
            Ok(_) => {
                self.stats.frames_acquired += 1;
                true
            }
            Err(AcquisitionError::Cancelled) => false,
            Err(e) => {
                self.stats.failed_acquisitions += 1;
                debug!(name = %self.name, error = %e, "Acquisition failed");
                e.frame_grabbed()
            }
        };

        if grabbed && let Some(session) = &self.session {
            session.record_frame();
        }
    }
}
