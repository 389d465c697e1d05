// SPDX-License-Identifier: GPL-3.0-only

//! Camera preview render pipeline
//!
//! A single background render thread owns the GPU context and the camera,
//! receives asynchronous frame-available notifications, applies a chain of
//! image filters and presents the result to a display surface, while
//! lifecycle and configuration requests arrive concurrently from foreground
//! callers.
//!
//! # Architecture
//!
//! - [`drawer`]: the [`CameraDrawer`] control surface, message queue with
//!   draw coalescing, frame counter and the render loop itself
//! - [`backends`]: collaborator contracts (GPU, capture device, sinks) and a
//!   simulated stack for headless use
//! - [`filters`]: filter chain types and the filter factory contract
//! - [`config`]: session configuration
//!
//! Frames flow: capture device → frame-available signal → frame counter →
//! coalesced draw request → render thread drains the burst → camera-input
//! filter → optional effect filter → swap.

pub mod backends;
pub mod config;
pub mod constants;
pub mod drawer;
pub mod errors;
pub mod filters;

// Re-export commonly used types
pub use backends::{Matrix4, PreviewStack, SurfaceHandle, TextureId};
pub use config::PreviewConfig;
pub use drawer::CameraDrawer;
pub use errors::{BackendError, PreviewError};
pub use filters::FilterType;
