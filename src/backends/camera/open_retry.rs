// SPDX-License-Identifier: GPL-3.0-only

//! Bounded retry policy for opening the device

use super::{InitParameters, StereoDevice};
use crate::constants::DEFAULT_OPEN_ATTEMPTS;
use tracing::{error, info, warn};

/// Opens a device, retrying up to a fixed number of attempts
///
/// Attempts follow each other without delay. Failure is reported through
/// the return value, never raised; the device is left in whatever state the
/// last attempt produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOpenRetry {
    max_attempts: u32,
}

impl Default for DeviceOpenRetry {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_ATTEMPTS)
    }
}

impl DeviceOpenRetry {
    /// A budget of zero is treated as a single attempt
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true once the device opened successfully
    pub fn open(&self, device: &mut dyn StereoDevice, params: &InitParameters) -> bool {
        for attempt in 1..=self.max_attempts {
            match device.open(params) {
                Ok(()) => {
                    info!(
                        device = device.name(),
                        attempt,
                        resolution = %params.resolution,
                        depth_mode = %params.depth_mode,
                        fps = params.fps,
                        "Device opened"
                    );
                    return true;
                }
                Err(e) => {
                    warn!(
                        device = device.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Try {} out of {}",
                        attempt,
                        self.max_attempts
                    );
                }
            }
        }

        error!(
            device = device.name(),
            attempts = self.max_attempts,
            "Failed to open the camera. Please unplug the camera and plug it back in!"
        );
        false
    }
}
