// SPDX-License-Identifier: GPL-3.0-only

//! Virtual stereo camera
//!
//! A software device implementing [`StereoDevice`] without hardware. It
//! renders synthetic depth and side-by-side color images labeled with a
//! monotonically increasing frame index, and can be scripted to misbehave:
//! failing opens, failing grabs, a finite number of frames, or a refused
//! recording. Every call is counted in [`VirtualCameraStats`], which stays
//! readable after the device has been moved into a controller.

mod render;

use crate::backends::camera::{
    DeviceError, DeviceImage, DeviceResult, ImageView, InitParameters, PixelFormat,
    RecordingParameters, RuntimeParameters, StereoDevice,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Default downscale applied to the sensor resolution for rendered images
const DEFAULT_DOWNSCALE: u32 = 8;

/// Pause after a failed grab so retry loops do not spin
const DEFAULT_FAILURE_DELAY: Duration = Duration::from_millis(1);

/// Call counters shared between the device and whoever inspects it
#[derive(Debug, Default)]
pub struct VirtualCameraStats {
    open_calls: AtomicU64,
    close_calls: AtomicU64,
    grab_calls: AtomicU64,
    successful_grabs: AtomicU64,
    retrieve_calls: AtomicU64,
    enable_recording_calls: AtomicU64,
    disable_recording_calls: AtomicU64,
    recording_path: Mutex<Option<PathBuf>>,
}

impl VirtualCameraStats {
    pub fn open_calls(&self) -> u64 {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u64 {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn grab_calls(&self) -> u64 {
        self.grab_calls.load(Ordering::SeqCst)
    }

    pub fn successful_grabs(&self) -> u64 {
        self.successful_grabs.load(Ordering::SeqCst)
    }

    pub fn retrieve_calls(&self) -> u64 {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    pub fn enable_recording_calls(&self) -> u64 {
        self.enable_recording_calls.load(Ordering::SeqCst)
    }

    pub fn disable_recording_calls(&self) -> u64 {
        self.disable_recording_calls.load(Ordering::SeqCst)
    }

    /// File the device is currently recording to
    pub fn recording_path(&self) -> Option<PathBuf> {
        self.recording_path
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_recording_path(&self, path: Option<PathBuf>) {
        *self
            .recording_path
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = path;
    }
}

/// Builder for scripted virtual cameras
#[derive(Debug, Clone)]
pub struct VirtualCameraBuilder {
    name: String,
    failing_opens: u32,
    failing_grabs: u64,
    grab_limit: Option<u64>,
    frame_interval: Option<Duration>,
    failure_delay: Duration,
    downscale: u32,
    refuse_recording: bool,
}

impl Default for VirtualCameraBuilder {
    fn default() -> Self {
        Self {
            name: "Virtual Stereo Camera".to_string(),
            failing_opens: 0,
            failing_grabs: 0,
            grab_limit: None,
            frame_interval: None,
            failure_delay: DEFAULT_FAILURE_DELAY,
            downscale: DEFAULT_DOWNSCALE,
            refuse_recording: false,
        }
    }
}

impl VirtualCameraBuilder {
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// The first `count` open calls fail; `u32::MAX` never opens
    pub fn failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = count;
        self
    }

    /// The first `count` grab calls fail
    pub fn failing_grabs(mut self, count: u64) -> Self {
        self.failing_grabs = count;
        self
    }

    /// Only `frames` grabs succeed; later grabs report end of stream
    pub fn grab_limit(mut self, frames: u64) -> Self {
        self.grab_limit = Some(frames);
        self
    }

    /// Pace successful grabs to one per `interval`
    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Pace successful grabs at `fps` frames per second
    pub fn fps(self, fps: u32) -> Self {
        self.frame_interval(Duration::from_secs(1) / fps.max(1))
    }

    /// Divide the sensor resolution by `factor` when rendering images
    pub fn downscale(mut self, factor: u32) -> Self {
        self.downscale = factor.max(1);
        self
    }

    /// Make `enable_recording` fail
    pub fn refuse_recording(mut self) -> Self {
        self.refuse_recording = true;
        self
    }

    pub fn build(self) -> VirtualStereoCamera {
        VirtualStereoCamera {
            script: self,
            stats: Arc::new(VirtualCameraStats::default()),
            opened: None,
            frame_index: 0,
            last_grab: None,
        }
    }
}

/// Software stereo camera
#[derive(Debug)]
pub struct VirtualStereoCamera {
    script: VirtualCameraBuilder,
    stats: Arc<VirtualCameraStats>,
    opened: Option<InitParameters>,
    /// Index of the last grabbed frame, 0 before the first grab
    frame_index: u64,
    last_grab: Option<Instant>,
}

impl VirtualStereoCamera {
    pub fn builder() -> VirtualCameraBuilder {
        VirtualCameraBuilder::default()
    }

    pub fn stats(&self) -> Arc<VirtualCameraStats> {
        Arc::clone(&self.stats)
    }

    fn image_size(&self, params: &InitParameters) -> (u32, u32) {
        let (w, h) = params.resolution.dimensions();
        (
            (w / self.script.downscale).max(1),
            (h / self.script.downscale).max(1),
        )
    }

    fn pace(&mut self) {
        if let (Some(interval), Some(last)) = (self.script.frame_interval, self.last_grab) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
        }
        self.last_grab = Some(Instant::now());
    }
}

impl StereoDevice for VirtualStereoCamera {
    fn name(&self) -> &str {
        &self.script.name
    }

    fn open(&mut self, params: &InitParameters) -> DeviceResult<()> {
        let call = self.stats.open_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= u64::from(self.script.failing_opens) {
            debug!(call, "Virtual camera refusing to open");
            return Err(DeviceError::CameraNotDetected);
        }

        info!(
            name = %self.script.name,
            resolution = %params.resolution,
            fps = params.fps,
            "Virtual camera opened"
        );
        self.opened = Some(*params);
        Ok(())
    }

    fn close(&mut self) {
        self.stats.close_calls.fetch_add(1, Ordering::SeqCst);
        self.opened = None;
        self.last_grab = None;
    }

    fn grab(&mut self, _runtime: &RuntimeParameters) -> DeviceResult<()> {
        let call = self.stats.grab_calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.opened.is_none() {
            return Err(DeviceError::NotOpened);
        }

        if call <= self.script.failing_grabs {
            thread::sleep(self.script.failure_delay);
            return Err(DeviceError::Failure("simulated grab failure".to_string()));
        }

        if let Some(limit) = self.script.grab_limit
            && self.stats.successful_grabs() >= limit
        {
            thread::sleep(self.script.failure_delay);
            return Err(DeviceError::EndOfStream);
        }

        self.pace();
        self.frame_index += 1;
        self.stats.successful_grabs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn retrieve_image(&mut self, view: ImageView) -> DeviceResult<DeviceImage> {
        self.stats.retrieve_calls.fetch_add(1, Ordering::SeqCst);

        let params = self.opened.ok_or(DeviceError::NotOpened)?;
        if self.frame_index == 0 {
            return Err(DeviceError::Failure("no frame grabbed yet".to_string()));
        }

        let (eye_width, height) = self.image_size(&params);
        let (width, data) = match view {
            ImageView::Depth => (
                eye_width,
                render::depth_bgra(eye_width, height, self.frame_index),
            ),
            ImageView::SideBySide => (
                eye_width * 2,
                render::side_by_side_bgra(eye_width, height, self.frame_index),
            ),
        };

        Ok(DeviceImage {
            view,
            width,
            height,
            stride: width * PixelFormat::Bgra8.bytes_per_pixel() as u32,
            format: PixelFormat::Bgra8,
            frame_index: self.frame_index,
            data: Arc::from(data),
        })
    }

    fn enable_recording(&mut self, params: &RecordingParameters) -> DeviceResult<()> {
        self.stats.enable_recording_calls.fetch_add(1, Ordering::SeqCst);

        if self.opened.is_none() {
            return Err(DeviceError::NotOpened);
        }
        if self.script.refuse_recording {
            return Err(DeviceError::Failure("recording refused".to_string()));
        }

        info!(
            path = %params.video_filename.display(),
            compression = %params.compression,
            "Virtual camera recording enabled"
        );
        self.stats
            .set_recording_path(Some(params.video_filename.clone()));
        Ok(())
    }

    fn disable_recording(&mut self) {
        self.stats
            .disable_recording_calls
            .fetch_add(1, Ordering::SeqCst);
        self.stats.set_recording_path(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::constants::Resolution;

    fn params() -> InitParameters {
        InitParameters::from(&DeviceConfig {
            resolution: Resolution::Hd720,
            ..Default::default()
        })
    }

    #[test]
    fn test_frames_are_labeled_in_order() {
        let mut camera = VirtualStereoCamera::builder().build();
        camera.open(&params()).unwrap();

        for expected in 1..=3 {
            camera.grab(&RuntimeParameters::default()).unwrap();
            let depth = camera.retrieve_image(ImageView::Depth).unwrap();
            let color = camera.retrieve_image(ImageView::SideBySide).unwrap();
            assert_eq!(depth.frame_index, expected);
            assert_eq!(color.frame_index, expected);
        }
    }

    #[test]
    fn test_image_geometry() {
        let mut camera = VirtualStereoCamera::builder().downscale(10).build();
        camera.open(&params()).unwrap();
        camera.grab(&RuntimeParameters::default()).unwrap();

        let depth = camera.retrieve_image(ImageView::Depth).unwrap();
        assert_eq!((depth.width, depth.height), (128, 72));
        assert_eq!(depth.data.len(), 128 * 72 * 4);

        let color = camera.retrieve_image(ImageView::SideBySide).unwrap();
        assert_eq!(color.width, 256);
        assert_eq!(color.data.len(), (color.stride * color.height) as usize);
    }

    #[test]
    fn test_grab_limit_reports_end_of_stream() {
        let mut camera = VirtualStereoCamera::builder().grab_limit(2).build();
        let stats = camera.stats();
        camera.open(&params()).unwrap();

        let runtime = RuntimeParameters::default();
        assert!(camera.grab(&runtime).is_ok());
        assert!(camera.grab(&runtime).is_ok());
        assert_eq!(camera.grab(&runtime), Err(DeviceError::EndOfStream));
        assert_eq!(stats.successful_grabs(), 2);
        assert_eq!(stats.grab_calls(), 3);
    }

    #[test]
    fn test_retrieve_before_grab_fails() {
        let mut camera = VirtualStereoCamera::builder().build();
        camera.open(&params()).unwrap();
        assert!(camera.retrieve_image(ImageView::Depth).is_err());
    }

    #[test]
    fn test_closed_camera_rejects_calls() {
        let mut camera = VirtualStereoCamera::builder().build();
        camera.open(&params()).unwrap();
        camera.close();

        assert_eq!(
            camera.grab(&RuntimeParameters::default()),
            Err(DeviceError::NotOpened)
        );
        assert_eq!(camera.stats().close_calls(), 1);
    }

    #[test]
    fn test_recording_toggle() {
        let mut camera = VirtualStereoCamera::builder().build();
        let stats = camera.stats();
        camera.open(&params()).unwrap();

        let params = RecordingParameters {
            video_filename: PathBuf::from("videos/test.svo"),
            compression: Default::default(),
        };
        camera.enable_recording(&params).unwrap();
        assert_eq!(stats.recording_path(), Some(PathBuf::from("videos/test.svo")));

        camera.disable_recording();
        assert_eq!(stats.recording_path(), None);
        assert_eq!(stats.disable_recording_calls(), 1);
    }

    #[test]
    fn test_refused_recording() {
        let mut camera = VirtualStereoCamera::builder().refuse_recording().build();
        camera.open(&params()).unwrap();

        let params = RecordingParameters {
            video_filename: PathBuf::from("videos/test.svo"),
            compression: Default::default(),
        };
        assert!(camera.enable_recording(&params).is_err());
    }
}
