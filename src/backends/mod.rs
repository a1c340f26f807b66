// SPDX-License-Identifier: MPL-2.0

//! Backend layer for stereo depth cameras
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 CLI / caller                 │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌──────────────────────────────────────┐   │
//! │  │ Camera: controller, capture worker,  │   │
//! │  │ handoff channels, recording session  │   │
//! │  └──────────────────┬───────────────────┘   │
//! │                     │ StereoDevice          │
//! │  ┌──────────────────┴───────────────────┐   │
//! │  │ Hardware SDK binding or virtual cam  │   │
//! │  └──────────────────────────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device boundary and capture engine
//! - [`virtual_camera`]: Software device for tests and demos

pub mod camera;
pub mod virtual_camera;
