// SPDX-License-Identifier: GPL-3.0-only

//! One acquisition cycle: grab a frame, then retrieve the enabled views

use super::{DeviceImage, FrameBundle, ImageView, RuntimeParameters, StereoDevice};
use crate::config::DeviceConfig;
use crate::errors::{AcquisitionError, ConfigError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Produces frame bundles from a device according to the device config
///
/// A failing grab is retried in place. Without a timeout the retry has no
/// bound other than the cancel signal, matching devices that take an
/// arbitrary time to come back after a hiccup.
#[derive(Debug, Clone)]
pub struct FrameAcquirer {
    depth_enabled: bool,
    color_enabled: bool,
    runtime: RuntimeParameters,
    timeout: Option<Duration>,
    sequence: u64,
}

impl FrameAcquirer {
    pub fn new(config: &DeviceConfig, timeout: Option<Duration>) -> Self {
        Self {
            depth_enabled: config.depth_enabled,
            color_enabled: config.color_enabled,
            runtime: RuntimeParameters {
                enable_depth: config.depth_enabled,
            },
            timeout,
            sequence: 0,
        }
    }

    /// Number of bundles produced so far
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Run one grab + retrieve cycle
    pub fn acquire(
        &mut self,
        device: &mut dyn StereoDevice,
        cancel: &AtomicBool,
    ) -> Result<FrameBundle, AcquisitionError> {
        if !self.depth_enabled && !self.color_enabled {
            return Err(AcquisitionError::Config(ConfigError::NoImageStreams));
        }

        let start = Instant::now();
        let mut attempts = 0u64;

        loop {
            if cancel.load(Ordering::SeqCst) {
                return Err(AcquisitionError::Cancelled);
            }

            attempts += 1;
            match device.grab(&self.runtime) {
                Ok(()) => break,
                Err(e) => {
                    trace!(attempts, error = %e, "Grab failed, retrying");
                    if let Some(timeout) = self.timeout
                        && start.elapsed() >= timeout
                    {
                        debug!(attempts, error = %e, "Acquisition timed out");
                        return Err(AcquisitionError::TimedOut {
                            attempts,
                            last_error: e,
                        });
                    }
                }
            }
        }

        let acquired_at = Instant::now();

        let depth = if self.depth_enabled {
            Some(retrieve(device, ImageView::Depth)?)
        } else {
            None
        };
        let color = if self.color_enabled {
            Some(retrieve(device, ImageView::SideBySide)?)
        } else {
            None
        };

        self.sequence += 1;
        FrameBundle::new(self.sequence, acquired_at, depth, color).map_err(AcquisitionError::Config)
    }
}

fn retrieve(
    device: &mut dyn StereoDevice,
    view: ImageView,
) -> Result<DeviceImage, AcquisitionError> {
    device
        .retrieve_image(view)
        .map_err(|error| AcquisitionError::Retrieve { view, error })
}
