// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Taking snapshots
//! - Recording
//! - Showing and writing the configuration
//!
//! Commands drive the virtual stereo camera; a hardware binding plugs in
//! through the same `StereoDevice` trait.

use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use stereo_camera::backends::virtual_camera::VirtualStereoCamera;
use stereo_camera::{CameraController, Config, storage};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Load the configuration file, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn open_camera(config: &Config) -> Result<CameraController, Box<dyn std::error::Error>> {
    let device = VirtualStereoCamera::builder()
        .fps(config.device.fps)
        .build();
    let mut camera = CameraController::from_config(Box::new(device), config)?;

    println!(
        "Opening camera: {} @ {}fps, depth mode {}",
        config.device.resolution, config.device.fps, config.device.depth_mode
    );
    if !camera.open_device() {
        return Err("Failed to open the camera. Please unplug it and plug it back in.".into());
    }
    Ok(camera)
}

/// Take `count` snapshots and save them as PNG files
pub fn take_snapshots(
    config: &Config,
    count: u32,
    interval_ms: u64,
    output: Option<PathBuf>,
) -> CliResult {
    let output_dir = output.unwrap_or_else(storage::default_snapshot_dir);
    let mut camera = open_camera(config)?;
    camera.start_preview()?;

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    for n in 0..count {
        if n > 0 && interval_ms > 0 {
            std::thread::sleep(Duration::from_millis(interval_ms));
        }

        let frame = camera.take_picture()?;
        let stem = format!("snapshot_{}_{:03}", stamp, n + 1);
        let paths = storage::save_bundle(&frame, &output_dir, &stem)?;

        println!("Frame {}:", frame.frame_index());
        for path in paths {
            println!("  {}", path.display());
        }
    }

    let summary = camera.close_stream()?;
    println!(
        "Acquired {} frames, delivered {}",
        summary.worker.frames_acquired, summary.worker.frames_delivered
    );
    Ok(())
}

/// Record for `duration` seconds or until Ctrl+C
pub fn record(config: &Config, duration: u64) -> CliResult {
    let mut camera = open_camera(config)?;
    let path = camera.start_stream()?;

    println!("Output: {}", path.display());
    println!("Recording... (press Ctrl+C to stop early)");

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let start = Instant::now();
    let target = Duration::from_secs(duration);
    while start.elapsed() < target {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }

        let elapsed = start.elapsed().as_secs();
        print!(
            "\rRecording: {:02}:{:02} ({} frames)",
            elapsed / 60,
            elapsed % 60,
            camera.frames_recorded().unwrap_or(0)
        );
        std::io::Write::flush(&mut std::io::stdout())?;

        std::thread::sleep(Duration::from_millis(100));
    }
    println!();

    let summary = camera.close_stream()?;
    if let Some(recording) = summary.recording {
        println!(
            "Recorded {} frames to {}",
            recording.frames_recorded,
            recording.path.display()
        );
    }
    Ok(())
}

/// Print the configuration as JSON, or write it to `output`
pub fn write_config(config: &Config, output: Option<PathBuf>) -> CliResult {
    match output {
        Some(path) => {
            config.save(&path)?;
            println!("Configuration written to {}", path.display());
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}
