// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for the collaborator contracts

use std::sync::Arc;

/// Opaque GPU texture handle
///
/// Allocated by the [`GlBackend`](super::GlBackend) and threaded through the
/// filter chain; the core never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Opaque native drawable handle supplied by the windowing system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceHandle(pub u64);

/// Column-major 4x4 pixel transform matrix
pub type Matrix4 = [f32; 16];

/// Frame-available callback handed to the capture device
///
/// Invoked by the capture collaborator on an arbitrary thread, once per
/// produced frame. Implementations must be cheap and non-blocking; the
/// pipeline only bumps a counter and posts a coalesced draw request.
pub type FrameListener = Arc<dyn Fn() + Send + Sync>;
