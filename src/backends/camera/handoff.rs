// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot handoff channels between the controller and the capture worker
//!
//! Both directions are bounded channels of capacity 1: at most one command
//! and at most one unclaimed frame are ever in flight. A full slot blocks
//! the sender, which throttles the worker to the consumer's pace.
//!
//! Frame requests carry an id so that a reply to a request whose caller
//! already gave up can be told apart from the reply to the current one.

use super::FrameBundle;
use crate::errors::{AcquisitionError, CameraError, CameraResult};
use crossbeam_channel::{
    Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError, bounded,
};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Signals sent from the controller to the capture worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Forward the next frame acquired at or after `issued_at`
    RequestFrame(FrameRequest),
    /// Terminate the worker
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub id: u64,
    pub issued_at: Instant,
}

/// Worker's answer to a frame request
#[derive(Debug, Clone)]
pub struct FrameReply {
    pub request_id: u64,
    pub outcome: Result<FrameBundle, AcquisitionError>,
}

/// Create a connected pair of channel ends
pub fn handoff_channels() -> (Commander, WorkerChannels) {
    let (command_tx, command_rx) = bounded(1);
    let (frame_tx, frame_rx) = bounded(1);

    (
        Commander {
            commands: command_tx,
            frames: frame_rx,
            next_request: 0,
        },
        WorkerChannels {
            commands: command_rx,
            frames: frame_tx,
        },
    )
}

/// Controller side: sends commands, receives frames
#[derive(Debug)]
pub struct Commander {
    commands: Sender<Command>,
    frames: Receiver<FrameReply>,
    next_request: u64,
}

impl Commander {
    /// Ask the worker for a fresh frame and wait for it
    ///
    /// Without a deadline this blocks until the worker answers or exits.
    pub fn request_frame(&mut self, deadline: Option<Duration>) -> CameraResult<FrameBundle> {
        let expires = deadline.map(|d| Instant::now() + d);

        // A reply left behind by an abandoned request is stale
        while let Ok(stale) = self.frames.try_recv() {
            debug!(request = stale.request_id, "Discarding unclaimed frame");
        }

        self.next_request += 1;
        let request = FrameRequest {
            id: self.next_request,
            issued_at: Instant::now(),
        };
        self.send(
            Command::RequestFrame(request),
            expires,
            CameraError::SnapshotTimedOut(deadline.unwrap_or_default()),
        )?;
        trace!(request = request.id, "Frame requested");

        loop {
            let reply = match expires {
                Some(at) => self.frames.recv_deadline(at).map_err(|e| match e {
                    RecvTimeoutError::Timeout => {
                        CameraError::SnapshotTimedOut(deadline.unwrap_or_default())
                    }
                    RecvTimeoutError::Disconnected => CameraError::WorkerStopped,
                })?,
                None => self
                    .frames
                    .recv()
                    .map_err(|_| CameraError::WorkerStopped)?,
            };

            if reply.request_id == request.id {
                return reply.outcome.map_err(CameraError::from);
            }
            debug!(
                expected = request.id,
                got = reply.request_id,
                "Discarding reply to an earlier request"
            );
        }
    }

    /// Tell the worker to exit
    pub fn send_stop(&self, deadline: Option<Duration>) -> CameraResult<()> {
        let expires = deadline.map(|d| Instant::now() + d);
        self.send(
            Command::Stop,
            expires,
            CameraError::StopTimedOut(deadline.unwrap_or_default()),
        )
    }

    /// Queue `command`, failing with `on_timeout` once `expires` passes
    fn send(
        &self,
        command: Command,
        expires: Option<Instant>,
        on_timeout: CameraError,
    ) -> CameraResult<()> {
        match expires {
            Some(at) => self
                .commands
                .send_deadline(command, at)
                .map_err(|e| match e {
                    SendTimeoutError::Timeout(_) => on_timeout,
                    SendTimeoutError::Disconnected(_) => CameraError::WorkerStopped,
                }),
            None => self
                .commands
                .send(command)
                .map_err(|_| CameraError::WorkerStopped),
        }
    }

    /// Drop the frame receiver, unblocking a worker stuck delivering a frame
    pub(crate) fn into_command_sender(self) -> CommandSender {
        CommandSender {
            commands: self.commands,
        }
    }
}

/// Command half left over after the frame receiver has been released
#[derive(Debug)]
pub(crate) struct CommandSender {
    commands: Sender<Command>,
}

impl CommandSender {
    /// Queue `Stop` if the slot is free
    pub(crate) fn try_stop(&self) -> bool {
        self.commands.try_send(Command::Stop).is_ok()
    }

    /// Send `Stop`, waiting for the slot to free up
    ///
    /// Returns false if the worker had already exited.
    pub(crate) fn stop(&self) -> bool {
        match self.commands.send(Command::Stop) {
            Ok(()) => true,
            Err(_) => {
                debug!("Capture worker already gone, stop not queued");
                false
            }
        }
    }
}

/// What the worker saw when it polled for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll {
    Command(Command),
    Empty,
    /// Controller side is gone
    Disconnected,
}

/// Worker side: polls commands, delivers frames
#[derive(Debug)]
pub struct WorkerChannels {
    commands: Receiver<Command>,
    frames: Sender<FrameReply>,
}

impl WorkerChannels {
    /// Non-blocking check for a pending command
    pub fn poll(&self) -> Poll {
        match self.commands.try_recv() {
            Ok(command) => Poll::Command(command),
            Err(TryRecvError::Empty) => Poll::Empty,
            Err(TryRecvError::Disconnected) => Poll::Disconnected,
        }
    }

    /// Hand a frame to the controller, blocking while the slot is occupied
    ///
    /// Returns false once the controller has dropped its receiver.
    pub fn deliver(&self, reply: FrameReply) -> bool {
        self.frames.send(reply).is_ok()
    }
}
