// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use stereo_camera::backends::virtual_camera::VirtualStereoCamera;
use stereo_camera::errors::ConfigError;
use stereo_camera::{CameraController, CameraError, Config, DeviceConfig, DepthMode, Resolution};

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.device.resolution, Resolution::Hd1080);
    assert_eq!(config.device.depth_mode, DepthMode::Performance);
    assert_eq!(config.device.fps, 10);
    assert!(config.device.depth_enabled && config.device.color_enabled);
    assert_eq!(config.stream.open_attempts, 5);
    assert!(
        config.stream.snapshot_timeout().is_none(),
        "Snapshots should wait indefinitely by default"
    );
}

#[test]
fn test_controller_rejects_config_without_streams() {
    let config = DeviceConfig {
        depth_enabled: false,
        color_enabled: false,
        ..DeviceConfig::default()
    };
    let device = VirtualStereoCamera::builder().build();
    let stats = device.stats();

    let result = CameraController::new(Box::new(device), config);
    assert!(matches!(
        result,
        Err(CameraError::Config(ConfigError::NoImageStreams))
    ));
    assert_eq!(stats.open_calls(), 0, "Device must not be touched");
}

#[test]
fn test_config_file_round_trip() {
    let dir = std::env::temp_dir().join(format!("stereo-camera-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");

    let mut config = Config::default();
    config.device.resolution = Resolution::Hd720;
    config.device.color_enabled = false;
    config.stream.snapshot_timeout_ms = Some(250);
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let dir = std::env::temp_dir().join(format!("stereo-camera-partial-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{ "device": { "fps": 30 } }"#).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.device.fps, 30);
    assert_eq!(loaded.device.resolution, Resolution::Hd1080);
    assert!(loaded.device.depth_enabled);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_resolution_names_parse() {
    assert_eq!("720p".parse::<Resolution>().unwrap(), Resolution::Hd720);
    assert_eq!("2k".parse::<Resolution>().unwrap(), Resolution::Hd2k);
    assert!("4k".parse::<Resolution>().is_err());
}
