// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for recordings and snapshots

use crate::backends::camera::{DeviceImage, FrameBundle, ImageView, PixelFormat};
use crate::constants::{RECORDING_EXTENSION, RECORDING_TIMESTAMP_FORMAT};
use crate::errors::{CameraError, CameraResult};
use chrono::{DateTime, Local};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Session id / file stem for a recording started at `now`
pub fn recording_timestamp(now: &DateTime<Local>) -> String {
    now.format(RECORDING_TIMESTAMP_FORMAT).to_string()
}

/// `<dir>/<timestamp>.svo`
pub fn recording_path(dir: &Path, now: &DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{}.{}",
        recording_timestamp(now),
        RECORDING_EXTENSION
    ))
}

/// Default directory for snapshots written by the CLI
pub fn default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("stereo-camera")
}

/// Write every image of a bundle as PNG, named `<stem>_<view>.png`
pub fn save_bundle(bundle: &FrameBundle, dir: &Path, stem: &str) -> CameraResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(bundle.len());
    for img in bundle.images() {
        let suffix = match img.view {
            ImageView::Depth => "depth",
            ImageView::SideBySide => "color",
        };
        let path = dir.join(format!("{}_{}.png", stem, suffix));

        let rgba = to_rgba(img).ok_or_else(|| {
            CameraError::Storage(format!(
                "{} image has inconsistent size ({}x{}, stride {}, {} bytes)",
                img.view,
                img.width,
                img.height,
                img.stride,
                img.data.len()
            ))
        })?;
        rgba.save(&path)
            .map_err(|e| CameraError::Storage(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), view = %img.view, "Saved image");
        written.push(path);
    }

    Ok(written)
}

/// Convert a device image to tightly packed RGBA
fn to_rgba(img: &DeviceImage) -> Option<RgbaImage> {
    let bpp = img.format.bytes_per_pixel();
    let row_bytes = img.width as usize * bpp;
    let stride = img.stride as usize;
    if img.width == 0
        || img.height == 0
        || stride < row_bytes
        || img.data.len() < stride * img.height as usize
    {
        return None;
    }

    let mut rgba = Vec::with_capacity(img.width as usize * img.height as usize * 4);
    for row in img.data.chunks_exact(stride).take(img.height as usize) {
        let row = &row[..row_bytes];
        match img.format {
            PixelFormat::Bgra8 => {
                for px in row.chunks_exact(4) {
                    rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
                }
            }
            PixelFormat::Gray8 => {
                for &v in row {
                    rgba.extend_from_slice(&[v, v, v, 255]);
                }
            }
        }
    }

    RgbaImage::from_raw(img.width, img.height, rgba)
}
