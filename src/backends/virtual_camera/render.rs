// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic image content for the virtual camera
//!
//! Patterns shift with the frame index so consecutive frames differ.

/// Depth view: a radial falloff rendered as gray BGRA, near = bright
pub fn depth_bgra(width: u32, height: u32, frame_index: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);
    let phase = (frame_index % 64) as f32 / 64.0;

    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt() / max_dist;
            let depth = ((1.0 - dist + phase).fract() * 255.0) as u8;
            data.extend_from_slice(&[depth, depth, depth, 255]);
        }
    }
    data
}

/// Side-by-side view: left and right eyes with a small horizontal disparity
pub fn side_by_side_bgra(eye_width: u32, height: u32, frame_index: u64) -> Vec<u8> {
    let width = eye_width * 2;
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    let shift = frame_index as u32;
    let disparity = (eye_width / 32).max(1);

    for y in 0..height {
        for x in 0..width {
            let (eye_x, offset) = if x < eye_width {
                (x, 0)
            } else {
                (x - eye_width, disparity)
            };
            let u = eye_x.wrapping_add(shift).wrapping_add(offset);
            let b = (u.wrapping_mul(255) / eye_width.max(1)) as u8;
            let g = (y.wrapping_mul(255) / height.max(1)) as u8;
            let r = ((u ^ y) & 0xff) as u8;
            data.extend_from_slice(&[b, g, r, 255]);
        }
    }
    data
}
