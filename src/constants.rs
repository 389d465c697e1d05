// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

/// Preview frame rate requested from the capture device
pub const DESIRED_PREVIEW_FPS: u32 = 30;

/// Default view dimensions used by the demo binary before the embedder
/// reports a real surface size
pub const DEFAULT_VIEW_WIDTH: u32 = 1920;
pub const DEFAULT_VIEW_HEIGHT: u32 = 1080;

/// Identity pixel transform, used until the capture texture reports one
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// How often the render loop emits per-frame debug log messages (every Nth draw)
pub const LOG_EVERY_N_DRAWS: u64 = 30;
