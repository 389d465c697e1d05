// SPDX-License-Identifier: GPL-3.0-only

//! Collaborator contracts consumed by the preview pipeline
//!
//! The pipeline core owns ordering and lifecycle; everything that touches
//! real hardware sits behind these traits:
//!
//! - [`GlBackend`]: GPU context + drawable surface primitives
//! - [`CaptureTexture`]: the texture the camera streams into
//! - [`CaptureDevice`]: the camera abstraction
//! - [`StillSink`] / [`RecordingSink`]: capture and encoder trigger points
//! - [`PreviewStack`]: per-session factory bundling the above
//!
//! Every trait object except [`PreviewStack`] is owned by the render thread
//! and is only ever called from it.

pub mod simulated;
pub mod types;

use crate::errors::BackendResult;
use crate::filters::FilterFactory;
pub use types::{FrameListener, Matrix4, SurfaceHandle, TextureId};

/// GPU context and drawable surface primitives
///
/// Created fresh for each preview session. All methods are called from the
/// render thread only; `create_context` is called exactly once per session,
/// before any other method.
pub trait GlBackend: Send {
    /// Create the GPU context and bind it to the native drawable
    fn create_context(&mut self, surface: SurfaceHandle) -> BackendResult<()>;

    /// Make the drawable surface current on the calling thread
    fn make_current(&mut self) -> BackendResult<()>;

    /// Present the rendered frame
    fn swap_buffers(&mut self) -> BackendResult<()>;

    /// Allocate an external (camera) texture object
    fn create_external_texture(&mut self) -> BackendResult<TextureId>;

    /// Bind `texture` to a new capture-texture object the camera can stream into
    fn create_capture_texture(
        &mut self,
        texture: TextureId,
    ) -> BackendResult<Box<dyn CaptureTexture>>;

    /// Configure the 2D blit pipeline (depth test and back-face culling off)
    fn prepare_2d_pipeline(&mut self);

    /// Release the drawable surface; must tolerate being called when absent
    fn release_surface(&mut self);

    /// Release the GPU context; must tolerate being called when absent
    fn release_context(&mut self);
}

/// The texture object camera frames are streamed into
pub trait CaptureTexture: Send {
    /// Consume the next pending camera buffer into the texture
    fn update_tex_image(&mut self);

    /// Pixel transform matrix for the most recently consumed buffer
    fn transform_matrix(&self) -> Matrix4;

    /// Release the texture object
    fn release(&mut self);
}

/// Camera capture device abstraction
///
/// Frame-available signals are delivered through the registered
/// [`FrameListener`] on an unspecified thread, at a rate decoupled from
/// consumption.
pub trait CaptureDevice: Send {
    /// Open the device, requesting the given preview frame rate
    fn open(&mut self, desired_fps: u32) -> BackendResult<()>;

    /// Reported preview size, if the device is open
    fn preview_size(&self) -> Option<(u32, u32)>;

    /// Sensor orientation in degrees (0, 90, 180 or 270)
    fn sensor_orientation(&self) -> u32;

    /// Register the frame-available listener
    fn set_frame_listener(&mut self, listener: FrameListener);

    /// Begin streaming frames into the given capture texture
    fn start_preview_texture(&mut self, texture: TextureId) -> BackendResult<()>;

    /// Release the device; must tolerate being called when already released
    fn release(&mut self);
}

/// Still-capture collaborator
///
/// Receives the trigger plus the currently rendered texture and matrix;
/// the photo encode pipeline behind it is out of scope here.
pub trait StillSink: Send {
    fn picture_ready(&mut self, texture: TextureId, matrix: &Matrix4);
}

/// Recording collaborator (encoder start/stop triggers)
pub trait RecordingSink: Send {
    fn recording_started(&mut self);
    fn recording_stopped(&mut self);

    /// Called once per drawn frame while recording is active
    fn frame_recorded(&mut self, texture: TextureId, matrix: &Matrix4);
}

/// Per-session collaborator factory
///
/// Invoked on the render thread each time a surface is created, so that a
/// fully torn-down session can be followed by a fresh one without leaking
/// GPU contexts or device handles.
pub trait PreviewStack: Send + Sync {
    fn gl_backend(&self) -> Box<dyn GlBackend>;
    fn capture_device(&self) -> Box<dyn CaptureDevice>;
    fn filter_factory(&self) -> Box<dyn FilterFactory>;

    /// Still-capture collaborator, if the embedder wants pictures
    fn still_sink(&self) -> Option<Box<dyn StillSink>> {
        None
    }

    /// Recording collaborator, if the embedder wants encoder triggers
    fn recording_sink(&self) -> Option<Box<dyn RecordingSink>> {
        None
    }
}
