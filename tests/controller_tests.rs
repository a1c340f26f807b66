// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the camera controller, driven by the virtual camera

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use stereo_camera::backends::camera::ExitReason;
use stereo_camera::backends::virtual_camera::VirtualStereoCamera;
use stereo_camera::errors::{AcquisitionError, RecordingError};
use stereo_camera::{CameraController, CameraError, Config, DeviceState, StreamSettings};

fn temp_video_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stereo-camera-{}-{}", name, std::process::id()))
}

fn settings(name: &str) -> StreamSettings {
    StreamSettings {
        video_dir: temp_video_dir(name),
        ..StreamSettings::default()
    }
}

fn controller(device: VirtualStereoCamera, settings: StreamSettings) -> CameraController {
    let config = Config::default();
    CameraController::with_settings(Box::new(device), config.device, settings).unwrap()
}

/// Poll `check` until it holds or five seconds pass
fn wait_until(check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    check()
}

#[test]
fn test_snapshots_increase_strictly() {
    let device = VirtualStereoCamera::builder()
        .frame_interval(Duration::from_millis(5))
        .build();
    let mut camera = controller(device, settings("snapshots"));

    assert!(camera.open_device());
    camera.start_preview().unwrap();
    assert_eq!(camera.state(), DeviceState::Streaming);
    assert!(!camera.is_recording());

    let mut last = 0;
    for _ in 0..5 {
        thread::sleep(Duration::from_millis(15));
        let frame = camera.take_picture().unwrap();
        assert_eq!(frame.len(), 2, "Depth and color views expected");
        assert!(frame.frame_index() > last, "Snapshots must never repeat");
        last = frame.frame_index();
    }

    let summary = camera.close_stream().unwrap();
    assert_eq!(summary.worker.frames_delivered, 5);
    assert!(summary.recording.is_none());
    assert_eq!(camera.state(), DeviceState::Open);
}

#[test]
fn test_snapshot_is_fresh_after_idle_period() {
    let device = VirtualStereoCamera::builder()
        .frame_interval(Duration::from_millis(2))
        .build();
    let stats = device.stats();
    let mut camera = controller(device, settings("fresh"));

    assert!(camera.open_device());
    camera.start_preview().unwrap();

    thread::sleep(Duration::from_millis(50));
    let grabbed_before = stats.successful_grabs();
    let frame = camera.take_picture().unwrap();

    assert!(
        frame.frame_index() > grabbed_before,
        "Frame {} was acquired before the request (grabs so far: {})",
        frame.frame_index(),
        grabbed_before
    );
    camera.close_stream().unwrap();
}

#[test]
fn test_open_retries_until_success() {
    let device = VirtualStereoCamera::builder().failing_opens(3).build();
    let stats = device.stats();
    let mut camera = controller(device, settings("open-retry"));

    assert!(camera.open_device());
    assert_eq!(stats.open_calls(), 4);
    assert_eq!(camera.state(), DeviceState::Open);
}

#[test]
fn test_open_gives_up_after_budget() {
    let device = VirtualStereoCamera::builder().failing_opens(u32::MAX).build();
    let stats = device.stats();
    let mut camera = controller(device, settings("open-fail"));

    assert!(!camera.open_device());
    assert_eq!(stats.open_calls(), 5);
    assert_eq!(camera.state(), DeviceState::Closed);

    assert_eq!(camera.start_stream(), Err(CameraError::DeviceNotOpen));
    assert_eq!(stats.grab_calls(), 0);
}

#[test]
fn test_recording_counts_every_grabbed_frame() {
    const FRAMES: u64 = 7;
    let dir = temp_video_dir("record");
    let device = VirtualStereoCamera::builder().grab_limit(FRAMES).build();
    let stats = device.stats();
    let mut camera = controller(
        device,
        StreamSettings {
            video_dir: dir.clone(),
            ..StreamSettings::default()
        },
    );

    assert!(camera.open_device());
    let path = camera.start_stream().unwrap();
    assert!(path.starts_with(&dir));
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("svo"));
    assert!(camera.is_recording());
    assert_eq!(camera.recording_path(), Some(path.as_path()));
    assert_eq!(stats.recording_path(), Some(path.clone()));

    assert!(wait_until(|| stats.successful_grabs() == FRAMES));

    let summary = camera.close_stream().unwrap();
    let recording = summary.recording.unwrap();
    assert_eq!(recording.frames_recorded, FRAMES);
    assert_eq!(recording.path, path);
    assert_eq!(stats.enable_recording_calls(), 1);
    assert_eq!(stats.disable_recording_calls(), 1);
    assert!(stats.recording_path().is_none());
    assert!(!camera.is_recording());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_close_stream_twice() {
    let mut camera = controller(VirtualStereoCamera::builder().build(), settings("twice"));
    assert!(camera.open_device());
    camera.start_stream().unwrap();

    camera.close_stream().unwrap();
    assert_eq!(camera.close_stream().unwrap_err(), CameraError::NotStreaming);

    std::fs::remove_dir_all(temp_video_dir("twice")).ok();
}

#[test]
fn test_take_picture_requires_stream() {
    let mut camera = controller(VirtualStereoCamera::builder().build(), settings("no-stream"));
    assert_eq!(camera.take_picture().unwrap_err(), CameraError::NotStreaming);

    assert!(camera.open_device());
    camera.start_preview().unwrap();
    camera.close_stream().unwrap();
    assert_eq!(camera.take_picture().unwrap_err(), CameraError::NotStreaming);
}

#[test]
fn test_stream_restarts_after_close() {
    let mut camera = controller(VirtualStereoCamera::builder().build(), settings("restart"));
    assert!(camera.open_device());

    camera.start_preview().unwrap();
    let first = camera.take_picture().unwrap();
    camera.close_stream().unwrap();

    camera.start_preview().unwrap();
    let second = camera.take_picture().unwrap();
    assert!(second.frame_index() > first.frame_index());
    camera.close_stream().unwrap();
}

#[test]
fn test_start_twice_is_rejected() {
    let mut camera = controller(VirtualStereoCamera::builder().build(), settings("start-twice"));
    assert!(camera.open_device());
    camera.start_preview().unwrap();

    assert_eq!(camera.start_preview(), Err(CameraError::AlreadyStreaming));
    assert_eq!(camera.close_device(), Err(CameraError::AlreadyStreaming));
    camera.close_stream().unwrap();
}

#[test]
fn test_snapshot_times_out_on_wedged_device() {
    let device = VirtualStereoCamera::builder().grab_limit(0).build();
    let mut camera = controller(
        device,
        StreamSettings {
            snapshot_timeout_ms: Some(50),
            ..settings("wedged")
        },
    );
    assert!(camera.open_device());
    camera.start_preview().unwrap();

    assert_eq!(
        camera.take_picture().unwrap_err(),
        CameraError::SnapshotTimedOut(Duration::from_millis(50))
    );

    // Shutdown must not hang on the unbounded grab retry
    let summary = camera.close_stream().unwrap();
    assert_eq!(summary.worker.frames_acquired, 0);
    assert_ne!(summary.exit_reason, ExitReason::Stopped);
}

#[test]
fn test_acquisition_timeout_reaches_caller() {
    let device = VirtualStereoCamera::builder().grab_limit(0).build();
    let mut camera = controller(
        device,
        StreamSettings {
            acquisition_timeout_ms: Some(20),
            ..settings("acq-timeout")
        },
    );
    assert!(camera.open_device());
    camera.start_preview().unwrap();

    match camera.take_picture() {
        Err(CameraError::Acquisition(AcquisitionError::TimedOut { attempts, .. })) => {
            assert!(attempts >= 1)
        }
        other => panic!("Expected an acquisition timeout, got {:?}", other),
    }
    camera.close_stream().unwrap();
}

#[test]
fn test_refused_recording_leaves_device_open() {
    let device = VirtualStereoCamera::builder().refuse_recording().build();
    let stats = device.stats();
    let mut camera = controller(device, settings("refused"));
    assert!(camera.open_device());

    assert!(matches!(
        camera.start_stream(),
        Err(CameraError::Recording(RecordingError::EnableFailed(_)))
    ));
    assert_eq!(camera.state(), DeviceState::Open);
    assert_eq!(stats.grab_calls(), 0);

    // Preview still works on the same device
    camera.start_preview().unwrap();
    camera.take_picture().unwrap();
    camera.close_stream().unwrap();

    std::fs::remove_dir_all(temp_video_dir("refused")).ok();
}

#[test]
fn test_drop_stops_stream_and_closes_device() {
    let device = VirtualStereoCamera::builder().build();
    let stats = device.stats();
    {
        let mut camera = controller(device, settings("drop"));
        assert!(camera.open_device());
        camera.start_stream().unwrap();
        camera.take_picture().unwrap();
    }

    assert_eq!(stats.disable_recording_calls(), 1);
    assert_eq!(stats.close_calls(), 1);

    std::fs::remove_dir_all(temp_video_dir("drop")).ok();
}
