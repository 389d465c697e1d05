// SPDX-License-Identifier: GPL-3.0-only

//! The render loop — owns all GPU and capture-device objects
//!
//! All collaborator objects (GL backend, capture texture, camera, filters)
//! are created and dropped on this single thread; no other code path may
//! touch them. Messages are processed strictly one at a time, in queue
//! order, and no handler suspends: every GPU and device call is synchronous
//! from the loop's perspective.

use super::SharedFlags;
use super::frames::FrameCounter;
use super::messages::{MessageReceiver, RenderMessage};
use crate::backends::{
    CaptureDevice, CaptureTexture, GlBackend, PreviewStack, RecordingSink, StillSink,
    SurfaceHandle, TextureId,
};
use crate::config::PreviewConfig;
use crate::constants::LOG_EVERY_N_DRAWS;
use crate::errors::{BackendError, BackendResult};
use crate::filters::{CameraInputFilter, FilterFactory, FilterType, ImageFilter};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

/// Everything the render thread needs, moved in at spawn
pub(crate) struct LoopParams {
    pub(crate) config: PreviewConfig,
    pub(crate) stack: Arc<dyn PreviewStack>,
    pub(crate) frames: Arc<FrameCounter>,
    pub(crate) flags: Arc<SharedFlags>,
    pub(crate) receiver: MessageReceiver,
}

/// Entry point for the render thread
pub(crate) fn render_thread_main(params: LoopParams) {
    let LoopParams {
        config,
        stack,
        frames,
        flags,
        receiver,
    } = params;
    let mut looper = RenderLoop::new(config, stack, frames, flags);

    debug!("render thread started");
    loop {
        let message = receiver.recv();
        if !looper.handle(message) {
            break;
        }
    }
    // Quit can arrive without an explicit destroy; never leak a context
    looper.on_destroy();
    info!("render thread exiting");
}

/// Map the capture device's reported preview size to image dimensions,
/// swapping width and height for 90/270 degree sensor orientations.
pub(crate) fn oriented_image_size(preview: Option<(u32, u32)>, orientation: u32) -> (u32, u32) {
    match preview {
        Some((width, height)) if orientation == 90 || orientation == 270 => (height, width),
        Some((width, height)) => (width, height),
        None => (0, 0),
    }
}

pub(crate) struct RenderLoop {
    config: PreviewConfig,
    stack: Arc<dyn PreviewStack>,
    frames: Arc<FrameCounter>,
    flags: Arc<SharedFlags>,

    // Live only between surface-created and surface-destroyed
    gl: Option<Box<dyn GlBackend>>,
    camera: Option<Box<dyn CaptureDevice>>,
    texture: Option<TextureId>,
    capture_texture: Option<Box<dyn CaptureTexture>>,

    factory: Option<Box<dyn FilterFactory>>,
    camera_filter: Option<Box<dyn CameraInputFilter>>,
    filter: Option<Box<dyn ImageFilter>>,
    still_sink: Option<Box<dyn StillSink>>,
    recording_sink: Option<Box<dyn RecordingSink>>,

    view_width: u32,
    view_height: u32,
    image_width: u32,
    image_height: u32,

    /// One-shot: the next draw hands its output to the still sink
    take_picture: bool,
    draws: u64,
}

impl RenderLoop {
    pub(crate) fn new(
        config: PreviewConfig,
        stack: Arc<dyn PreviewStack>,
        frames: Arc<FrameCounter>,
        flags: Arc<SharedFlags>,
    ) -> Self {
        Self {
            config,
            stack,
            frames,
            flags,
            gl: None,
            camera: None,
            texture: None,
            capture_texture: None,
            factory: None,
            camera_filter: None,
            filter: None,
            still_sink: None,
            recording_sink: None,
            view_width: 0,
            view_height: 0,
            image_width: 0,
            image_height: 0,
            take_picture: false,
            draws: 0,
        }
    }

    /// Process one message. Returns false when the loop should exit.
    pub(crate) fn handle(&mut self, message: RenderMessage) -> bool {
        match message {
            RenderMessage::SurfaceCreated(surface) => {
                if let Err(e) = self.on_surface_created(surface) {
                    error!(error = %e, "surface setup failed; tearing session down");
                    self.on_surface_destroyed();
                }
            }
            RenderMessage::SurfaceChanged { width, height } => {
                self.on_surface_changed(width, height);
            }
            RenderMessage::SurfaceDestroyed => self.on_surface_destroyed(),
            RenderMessage::DrawFrame => self.on_draw_frame(),
            RenderMessage::SetFilter(filter_type) => self.on_set_filter(filter_type),
            RenderMessage::UpdatePreview { width, height } => {
                debug!(width, height, "view size updated");
                self.view_width = width;
                self.view_height = height;
            }
            RenderMessage::StartPreview => debug!("preview started"),
            RenderMessage::StopPreview => debug!("preview stopped"),
            RenderMessage::StartRecording => {
                self.flags.recording.store(true, Ordering::SeqCst);
                if let Some(sink) = self.recording_sink.as_mut() {
                    sink.recording_started();
                }
                info!("recording started");
            }
            RenderMessage::StopRecording => {
                self.flags.recording.store(false, Ordering::SeqCst);
                if let Some(sink) = self.recording_sink.as_mut() {
                    sink.recording_stopped();
                }
                info!("recording stopped");
            }
            RenderMessage::TakePicture => self.take_picture = true,
            RenderMessage::Destroy => self.on_destroy(),
            RenderMessage::Quit => return false,
        }
        true
    }

    fn on_surface_created(&mut self, surface: SurfaceHandle) -> BackendResult<()> {
        info!(surface = surface.0, "surface created");

        let mut gl = self.stack.gl_backend();
        gl.create_context(surface)?;
        // The context is live from here on: it goes into `self` before any
        // further fallible step, so an error mid-setup still releases it
        // through the teardown fallback in `handle`.
        self.gl = Some(gl);
        self.build_session()
    }

    /// Construct the capture chain on an already-created context. Every
    /// resource lands in `self` the moment it exists; on error the caller
    /// tears down whatever was built.
    fn build_session(&mut self) -> BackendResult<()> {
        let Some(gl) = self.gl.as_mut() else {
            return Err(BackendError::SurfaceUnavailable);
        };
        gl.make_current()?;

        let mut factory = self
            .factory
            .take()
            .unwrap_or_else(|| self.stack.filter_factory());
        if self.camera_filter.is_none() {
            self.camera_filter = Some(factory.camera_filter());
        }
        if let Some(mut previous) = self.filter.take() {
            previous.release();
        }
        self.filter = factory.get_filter(self.config.default_filter);
        self.factory = Some(factory);

        let texture = gl.create_external_texture()?;
        self.texture = Some(texture);
        self.capture_texture = Some(gl.create_capture_texture(texture)?);

        let mut camera = self.stack.capture_device();
        let frames = Arc::clone(&self.frames);
        camera.set_frame_listener(Arc::new(move || frames.add_frame()));
        self.camera = Some(camera);
        if let Some(camera) = self.camera.as_mut() {
            camera.open(self.config.desired_fps)?;
            let (image_width, image_height) =
                oriented_image_size(camera.preview_size(), camera.sensor_orientation());
            self.image_width = image_width;
            self.image_height = image_height;
        }
        if let Some(camera_filter) = self.camera_filter.as_mut() {
            camera_filter.on_input_size_changed(self.image_width, self.image_height);
        }

        // 2D blit pipeline only
        gl.prepare_2d_pipeline();

        self.still_sink = self.stack.still_sink();
        self.recording_sink = self.stack.recording_sink();

        debug!(
            image_width = self.image_width,
            image_height = self.image_height,
            fps = self.config.desired_fps,
            "preview session ready"
        );
        Ok(())
    }

    fn on_surface_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "surface changed");
        self.view_width = width;
        self.view_height = height;
        self.on_filter_changed();

        if let (Some(camera), Some(texture)) = (self.camera.as_mut(), self.texture) {
            if let Err(e) = camera.start_preview_texture(texture) {
                warn!(error = %e, "failed to start preview stream");
            }
        }
    }

    /// Re-run camera filter sizing after a view or filter change: the
    /// intermediate framebuffer exists only while an effect filter does.
    fn on_filter_changed(&mut self) {
        let Some(camera_filter) = self.camera_filter.as_mut() else {
            return;
        };
        camera_filter.on_display_changed(self.view_width, self.view_height);
        if let Some(filter) = self.filter.as_mut() {
            camera_filter.init_framebuffer(self.image_width, self.image_height);
            filter.on_display_changed(self.view_width, self.view_height);
        } else {
            camera_filter.destroy_framebuffer();
        }
    }

    fn on_set_filter(&mut self, filter_type: FilterType) {
        let Some(factory) = self.factory.as_mut() else {
            debug!("filter change ignored; no active session");
            return;
        };
        debug!(filter = filter_type.display_name(), "setting filter");
        if let Some(mut previous) = self.filter.take() {
            previous.release();
        }
        self.filter = factory.get_filter(filter_type);
        self.on_filter_changed();
    }

    fn on_surface_destroyed(&mut self) {
        info!("surface destroyed");
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
        if let Some(mut capture_texture) = self.capture_texture.take() {
            capture_texture.release();
        }
        self.texture = None;
        if let Some(mut gl) = self.gl.take() {
            gl.release_surface();
            gl.release_context();
        }
    }

    fn on_destroy(&mut self) {
        if let Some(mut filter) = self.filter.take() {
            filter.release();
        }
        if let Some(mut camera_filter) = self.camera_filter.take() {
            camera_filter.release();
        }
        self.factory = None;
        self.still_sink = None;
        self.recording_sink = None;
        self.on_surface_destroyed();
    }

    fn on_draw_frame(&mut self) {
        let Some(gl) = self.gl.as_mut() else {
            return;
        };
        if let Err(e) = gl.make_current() {
            warn!(error = %e, "draw aborted; make-current failed");
            return;
        }
        // Context torn down mid-flight: skip this draw, not fatal
        let Some(capture_texture) = self.capture_texture.as_mut() else {
            debug!("draw aborted; capture texture released");
            return;
        };

        // Collapse the whole burst so only the newest camera buffer renders
        let outcome = self.frames.consume(|| capture_texture.update_tex_image());
        let matrix = capture_texture.transform_matrix();

        let Some(camera_filter) = self.camera_filter.as_mut() else {
            return;
        };
        let Some(texture) = self.texture else {
            return;
        };

        let rendered = match self.filter.as_mut() {
            None => {
                camera_filter.draw_frame(texture, &matrix);
                texture
            }
            Some(filter) => {
                let converted = camera_filter.draw_to_texture(texture, &matrix);
                filter.draw_frame(converted, &matrix);
                converted
            }
        };

        if self.take_picture {
            self.take_picture = false;
            if let Some(sink) = self.still_sink.as_mut() {
                sink.picture_ready(rendered, &matrix);
                info!("still capture handed off");
            }
        }
        if self.flags.recording.load(Ordering::SeqCst) {
            if let Some(sink) = self.recording_sink.as_mut() {
                sink.frame_recorded(rendered, &matrix);
            }
        }

        if let Err(e) = gl.swap_buffers() {
            warn!(error = %e, "swap failed");
        }

        self.draws += 1;
        if self.draws % LOG_EVERY_N_DRAWS == 0 {
            debug!(
                draws = self.draws,
                consumed = outcome.consumed,
                new_frame = outcome.has_new_frame,
                "preview draw"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::simulated::SimulatedStack;
    use crate::drawer::messages::channel;

    fn make_loop(
        config: PreviewConfig,
        stack: &Arc<SimulatedStack>,
    ) -> (RenderLoop, crate::drawer::messages::MessageReceiver, Arc<FrameCounter>) {
        let (tx, rx) = channel();
        let frames = Arc::new(FrameCounter::new());
        frames.attach(tx);
        let flags = Arc::new(SharedFlags::default());
        let looper = RenderLoop::new(
            config,
            Arc::clone(stack) as Arc<dyn PreviewStack>,
            Arc::clone(&frames),
            flags,
        );
        (looper, rx, frames)
    }

    fn drain(looper: &mut RenderLoop, rx: &crate::drawer::messages::MessageReceiver) {
        while let Some(message) = rx.try_recv() {
            looper.handle(message);
        }
    }

    #[test]
    fn orientation_mapping_swaps_at_quarter_turns() {
        assert_eq!(oriented_image_size(Some((1920, 1080)), 0), (1920, 1080));
        assert_eq!(oriented_image_size(Some((1920, 1080)), 90), (1080, 1920));
        assert_eq!(oriented_image_size(Some((1920, 1080)), 180), (1920, 1080));
        assert_eq!(oriented_image_size(Some((1920, 1080)), 270), (1080, 1920));
        assert_eq!(oriented_image_size(None, 90), (0, 0));
    }

    #[test]
    fn burst_renders_once_with_latest_frame() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 90));
        let (mut looper, rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SurfaceChanged {
            width: 1920,
            height: 1080,
        });

        // Three frames arrive before the loop runs again
        for _ in 0..3 {
            stack.emit_frame();
        }
        drain(&mut looper, &rx);

        let journal = stack.journal();
        assert_eq!(journal.tex_image_updates, 3, "all arrivals consumed in one pass");
        assert_eq!(journal.swaps, 1, "burst collapses to a single draw");
        assert_eq!(journal.last_presented_frame, Some(3), "latest buffer on screen");
    }

    #[test]
    fn image_size_follows_sensor_orientation() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 270));
        let (mut looper, _rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        assert_eq!(stack.journal().camera_input_size, Some((720, 1280)));
    }

    #[test]
    fn surface_changed_without_effect_filter_destroys_framebuffer() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let config = PreviewConfig {
            default_filter: FilterType::Standard,
            ..PreviewConfig::default()
        };
        let (mut looper, rx, _frames) = make_loop(config, &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SurfaceChanged {
            width: 800,
            height: 600,
        });

        let journal = stack.journal();
        assert_eq!(journal.display_size, Some((800, 600)));
        assert_eq!(journal.framebuffer_size, None);

        // Installing an effect filter re-initializes it with image dimensions
        looper.handle(RenderMessage::SetFilter(FilterType::Sepia));
        assert_eq!(stack.journal().framebuffer_size, Some((1280, 720)));

        stack.emit_frame();
        drain(&mut looper, &rx);
        let journal = stack.journal();
        assert_eq!(journal.offscreen_draws, 1);
        assert_eq!(journal.effect_draws, 1);
        assert_eq!(journal.direct_draws, 0);
    }

    #[test]
    fn standard_filter_draws_directly_to_surface() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let config = PreviewConfig {
            default_filter: FilterType::Standard,
            ..PreviewConfig::default()
        };
        let (mut looper, rx, _frames) = make_loop(config, &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SurfaceChanged {
            width: 800,
            height: 600,
        });
        stack.emit_frame();
        drain(&mut looper, &rx);

        let journal = stack.journal();
        assert_eq!(journal.direct_draws, 1);
        assert_eq!(journal.offscreen_draws, 0);
    }

    #[test]
    fn filter_swap_releases_previous_instance() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let (mut looper, _rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SetFilter(FilterType::Mono));

        let journal = stack.journal();
        assert_eq!(journal.effect_filters_released, 1, "default filter released on swap");
        assert_eq!(journal.last_effect_created, Some(FilterType::Mono));
    }

    #[test]
    fn take_picture_is_one_shot() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let (mut looper, rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SurfaceChanged {
            width: 800,
            height: 600,
        });
        looper.handle(RenderMessage::TakePicture);

        stack.emit_frame();
        drain(&mut looper, &rx);
        stack.emit_frame();
        drain(&mut looper, &rx);

        let journal = stack.journal();
        assert_eq!(journal.pictures.len(), 1, "only the draw after the trigger captures");
        assert_eq!(journal.swaps, 2);
    }

    #[test]
    fn recording_sink_gets_triggers_and_frames() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let (mut looper, rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SurfaceChanged {
            width: 800,
            height: 600,
        });

        looper.handle(RenderMessage::StartRecording);
        stack.emit_frame();
        drain(&mut looper, &rx);
        looper.handle(RenderMessage::StopRecording);
        stack.emit_frame();
        drain(&mut looper, &rx);

        let journal = stack.journal();
        assert_eq!(journal.recordings_started, 1);
        assert_eq!(journal.recordings_stopped, 1);
        assert_eq!(journal.frames_recorded, 1, "frames outside recording are not handed off");
    }

    #[test]
    fn draw_after_surface_destroyed_is_skipped() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let (mut looper, rx, frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));
        looper.handle(RenderMessage::SurfaceDestroyed);
        // A frame arrival straggling in after teardown still posts a draw
        frames.add_frame();
        drain(&mut looper, &rx);

        let journal = stack.journal();
        assert_eq!(journal.swaps, 0);
        assert!(journal.camera_released);
        assert!(journal.capture_texture_released);
        assert_eq!(journal.contexts_released, 1);
    }

    #[test]
    fn failed_camera_open_releases_gpu_resources() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        stack.fail_camera_open();
        let (mut looper, _rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceCreated(SurfaceHandle(1)));

        let journal = stack.journal();
        assert_eq!(journal.contexts_created, 1);
        assert_eq!(journal.contexts_released, 1, "failed setup must not keep the context");
        assert!(journal.camera_released);
        assert!(journal.capture_texture_released);
        assert_eq!(journal.camera_open_fps, None, "the open itself failed");
    }

    #[test]
    fn destroy_without_surface_is_idempotent() {
        let stack = Arc::new(SimulatedStack::new(Some((1280, 720)), 0));
        let (mut looper, _rx, _frames) = make_loop(PreviewConfig::default(), &stack);

        looper.handle(RenderMessage::SurfaceDestroyed);
        looper.handle(RenderMessage::Destroy);
        looper.handle(RenderMessage::Destroy);

        let journal = stack.journal();
        assert_eq!(journal.contexts_released, 0);
        assert!(!journal.camera_released);
    }
}
