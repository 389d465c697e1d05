// SPDX-License-Identifier: GPL-3.0-only

//! Simulated collaborator stack (no hardware, no GL)
//!
//! Stands in for the real windowing/EGL/camera collaborators when none are
//! present: every GPU and device call is recorded into a shared
//! [`StackJournal`], and camera frames are produced on demand via
//! [`SimulatedStack::emit_frame`]. Used by the demo binary and the
//! integration tests to exercise the pipeline core end to end.

use super::{
    CaptureDevice, CaptureTexture, FrameListener, GlBackend, Matrix4, PreviewStack, RecordingSink,
    StillSink, SurfaceHandle, TextureId,
};
use crate::constants::IDENTITY_MATRIX;
use crate::errors::{BackendError, BackendResult};
use crate::filters::{CameraInputFilter, FilterFactory, FilterType, ImageFilter};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::debug;

/// Texture id returned by the simulated camera filter's offscreen pass
const OFFSCREEN_TEXTURE: TextureId = TextureId(9000);

/// Record of every collaborator call made by the pipeline
#[derive(Debug, Default, Clone)]
pub struct StackJournal {
    pub contexts_created: u32,
    pub contexts_released: u32,
    pub surfaces_released: u32,
    pub make_current_calls: u64,
    pub swaps: u64,
    pub textures_created: u32,
    pub pipeline_2d_prepared: bool,

    pub tex_image_updates: u64,
    pub capture_texture_released: bool,
    /// Frame sequence number last consumed by `update_tex_image`
    pub last_consumed_frame: Option<u64>,
    /// Frame sequence number on screen after the last swap
    pub last_presented_frame: Option<u64>,

    pub camera_open_fps: Option<u32>,
    pub camera_released: bool,
    pub streaming_texture: Option<TextureId>,

    pub camera_filters_created: u32,
    pub camera_filter_released: bool,
    pub camera_input_size: Option<(u32, u32)>,
    pub display_size: Option<(u32, u32)>,
    /// `Some` while the camera filter's framebuffer is allocated
    pub framebuffer_size: Option<(u32, u32)>,
    pub direct_draws: u64,
    pub offscreen_draws: u64,

    pub last_effect_created: Option<FilterType>,
    pub effect_draws: u64,
    pub effect_filters_released: u32,

    pub pictures: Vec<(TextureId, Matrix4)>,
    pub recordings_started: u32,
    pub recordings_stopped: u32,
    pub frames_recorded: u64,
}

/// Producer-side camera state shared between the stack and the device object
struct CameraShared {
    /// Sequence number of the newest produced frame
    frame_seq: AtomicU64,
    listener: Mutex<Option<FrameListener>>,
    /// Signalled when a listener is installed
    listener_ready: Condvar,
    /// When set, `open` fails instead of succeeding
    open_fails: AtomicBool,
}

/// Headless [`PreviewStack`] implementation
pub struct SimulatedStack {
    journal: Arc<Mutex<StackJournal>>,
    camera: Arc<CameraShared>,
    preview_size: Option<(u32, u32)>,
    orientation: u32,
}

impl SimulatedStack {
    /// Create a stack whose camera reports the given preview size and
    /// sensor orientation (degrees)
    pub fn new(preview_size: Option<(u32, u32)>, orientation: u32) -> Self {
        Self {
            journal: Arc::new(Mutex::new(StackJournal::default())),
            camera: Arc::new(CameraShared {
                frame_seq: AtomicU64::new(0),
                listener: Mutex::new(None),
                listener_ready: Condvar::new(),
                open_fails: AtomicBool::new(false),
            }),
            preview_size,
            orientation,
        }
    }

    /// Snapshot of everything the pipeline has done so far
    pub fn journal(&self) -> StackJournal {
        self.journal.lock().unwrap().clone()
    }

    /// Produce one camera frame and fire the frame-available listener.
    /// Returns the frame's sequence number.
    ///
    /// Panics when no listener is installed yet: the signal would vanish
    /// and whatever emitted it would silently wait on a frame that never
    /// arrives. Call [`wait_for_camera`](Self::wait_for_camera) first.
    pub fn emit_frame(&self) -> u64 {
        let listener = self
            .camera
            .listener
            .lock()
            .unwrap()
            .clone()
            .expect("emit_frame called before the pipeline installed its frame listener");
        let seq = self.camera.frame_seq.fetch_add(1, Ordering::SeqCst) + 1;
        listener();
        seq
    }

    /// Block until the pipeline has installed its frame listener, which
    /// happens while the render thread constructs the camera. Emitting
    /// frames is only meaningful after this returns.
    pub fn wait_for_camera(&self) {
        let guard = self.camera.listener.lock().unwrap();
        let (_guard, timeout) = self
            .camera
            .listener_ready
            .wait_timeout_while(guard, Duration::from_secs(5), |listener| listener.is_none())
            .unwrap();
        if timeout.timed_out() {
            panic!("camera never started listening for frames");
        }
    }

    /// Make camera opens fail, to exercise session-setup error paths
    pub fn fail_camera_open(&self) {
        self.camera.open_fails.store(true, Ordering::SeqCst);
    }
}

impl PreviewStack for SimulatedStack {
    fn gl_backend(&self) -> Box<dyn GlBackend> {
        Box::new(SimulatedGl {
            journal: Arc::clone(&self.journal),
            camera: Arc::clone(&self.camera),
            context_live: false,
        })
    }

    fn capture_device(&self) -> Box<dyn CaptureDevice> {
        Box::new(SimulatedCamera {
            journal: Arc::clone(&self.journal),
            camera: Arc::clone(&self.camera),
            preview_size: self.preview_size,
            orientation: self.orientation,
        })
    }

    fn filter_factory(&self) -> Box<dyn FilterFactory> {
        Box::new(SimulatedFilters {
            journal: Arc::clone(&self.journal),
        })
    }

    fn still_sink(&self) -> Option<Box<dyn StillSink>> {
        Some(Box::new(JournalSink {
            journal: Arc::clone(&self.journal),
        }))
    }

    fn recording_sink(&self) -> Option<Box<dyn RecordingSink>> {
        Some(Box::new(JournalSink {
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct SimulatedGl {
    journal: Arc<Mutex<StackJournal>>,
    camera: Arc<CameraShared>,
    context_live: bool,
}

impl GlBackend for SimulatedGl {
    fn create_context(&mut self, surface: SurfaceHandle) -> BackendResult<()> {
        debug!(surface = surface.0, "simulated context created");
        self.context_live = true;
        self.journal.lock().unwrap().contexts_created += 1;
        Ok(())
    }

    fn make_current(&mut self) -> BackendResult<()> {
        if !self.context_live {
            return Err(BackendError::SurfaceUnavailable);
        }
        self.journal.lock().unwrap().make_current_calls += 1;
        Ok(())
    }

    fn swap_buffers(&mut self) -> BackendResult<()> {
        if !self.context_live {
            return Err(BackendError::SurfaceUnavailable);
        }
        let mut journal = self.journal.lock().unwrap();
        journal.swaps += 1;
        journal.last_presented_frame = journal.last_consumed_frame;
        Ok(())
    }

    fn create_external_texture(&mut self) -> BackendResult<TextureId> {
        let mut journal = self.journal.lock().unwrap();
        journal.textures_created += 1;
        Ok(TextureId(100 + journal.textures_created))
    }

    fn create_capture_texture(
        &mut self,
        texture: TextureId,
    ) -> BackendResult<Box<dyn CaptureTexture>> {
        debug!(texture = texture.0, "simulated capture texture bound");
        Ok(Box::new(SimulatedCaptureTexture {
            journal: Arc::clone(&self.journal),
            camera: Arc::clone(&self.camera),
        }))
    }

    fn prepare_2d_pipeline(&mut self) {
        self.journal.lock().unwrap().pipeline_2d_prepared = true;
    }

    fn release_surface(&mut self) {
        if self.context_live {
            self.journal.lock().unwrap().surfaces_released += 1;
        }
    }

    fn release_context(&mut self) {
        if self.context_live {
            self.context_live = false;
            self.journal.lock().unwrap().contexts_released += 1;
        }
    }
}

struct SimulatedCaptureTexture {
    journal: Arc<Mutex<StackJournal>>,
    camera: Arc<CameraShared>,
}

impl CaptureTexture for SimulatedCaptureTexture {
    fn update_tex_image(&mut self) {
        let mut journal = self.journal.lock().unwrap();
        journal.tex_image_updates += 1;
        journal.last_consumed_frame = Some(self.camera.frame_seq.load(Ordering::SeqCst));
    }

    fn transform_matrix(&self) -> Matrix4 {
        IDENTITY_MATRIX
    }

    fn release(&mut self) {
        self.journal.lock().unwrap().capture_texture_released = true;
    }
}

struct SimulatedCamera {
    journal: Arc<Mutex<StackJournal>>,
    camera: Arc<CameraShared>,
    preview_size: Option<(u32, u32)>,
    orientation: u32,
}

impl CaptureDevice for SimulatedCamera {
    fn open(&mut self, desired_fps: u32) -> BackendResult<()> {
        if self.camera.open_fails.load(Ordering::SeqCst) {
            return Err(BackendError::CameraOpenFailed("simulated open failure".into()));
        }
        self.journal.lock().unwrap().camera_open_fps = Some(desired_fps);
        Ok(())
    }

    fn preview_size(&self) -> Option<(u32, u32)> {
        self.preview_size
    }

    fn sensor_orientation(&self) -> u32 {
        self.orientation
    }

    fn set_frame_listener(&mut self, listener: FrameListener) {
        *self.camera.listener.lock().unwrap() = Some(listener);
        self.camera.listener_ready.notify_all();
    }

    fn start_preview_texture(&mut self, texture: TextureId) -> BackendResult<()> {
        self.journal.lock().unwrap().streaming_texture = Some(texture);
        Ok(())
    }

    fn release(&mut self) {
        self.journal.lock().unwrap().camera_released = true;
        // Stop signalling into a torn-down pipeline
        *self.camera.listener.lock().unwrap() = None;
    }
}

struct SimulatedFilters {
    journal: Arc<Mutex<StackJournal>>,
}

impl FilterFactory for SimulatedFilters {
    fn camera_filter(&mut self) -> Box<dyn CameraInputFilter> {
        self.journal.lock().unwrap().camera_filters_created += 1;
        Box::new(SimulatedCameraFilter {
            journal: Arc::clone(&self.journal),
        })
    }

    fn get_filter(&mut self, filter_type: FilterType) -> Option<Box<dyn ImageFilter>> {
        if filter_type == FilterType::Standard {
            return None;
        }
        self.journal.lock().unwrap().last_effect_created = Some(filter_type);
        Some(Box::new(SimulatedEffectFilter {
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct SimulatedCameraFilter {
    journal: Arc<Mutex<StackJournal>>,
}

impl CameraInputFilter for SimulatedCameraFilter {
    fn on_input_size_changed(&mut self, width: u32, height: u32) {
        self.journal.lock().unwrap().camera_input_size = Some((width, height));
    }

    fn on_display_changed(&mut self, width: u32, height: u32) {
        self.journal.lock().unwrap().display_size = Some((width, height));
    }

    fn init_framebuffer(&mut self, width: u32, height: u32) {
        self.journal.lock().unwrap().framebuffer_size = Some((width, height));
    }

    fn destroy_framebuffer(&mut self) {
        self.journal.lock().unwrap().framebuffer_size = None;
    }

    fn draw_frame(&mut self, _texture: TextureId, _matrix: &Matrix4) {
        self.journal.lock().unwrap().direct_draws += 1;
    }

    fn draw_to_texture(&mut self, _texture: TextureId, _matrix: &Matrix4) -> TextureId {
        self.journal.lock().unwrap().offscreen_draws += 1;
        OFFSCREEN_TEXTURE
    }

    fn release(&mut self) {
        let mut journal = self.journal.lock().unwrap();
        journal.camera_filter_released = true;
        journal.framebuffer_size = None;
    }
}

struct SimulatedEffectFilter {
    journal: Arc<Mutex<StackJournal>>,
}

impl ImageFilter for SimulatedEffectFilter {
    fn draw_frame(&mut self, _texture: TextureId, _matrix: &Matrix4) {
        self.journal.lock().unwrap().effect_draws += 1;
    }

    fn release(&mut self) {
        self.journal.lock().unwrap().effect_filters_released += 1;
    }
}

/// Journal-backed still + recording sink
struct JournalSink {
    journal: Arc<Mutex<StackJournal>>,
}

impl StillSink for JournalSink {
    fn picture_ready(&mut self, texture: TextureId, matrix: &Matrix4) {
        self.journal.lock().unwrap().pictures.push((texture, *matrix));
    }
}

impl RecordingSink for JournalSink {
    fn recording_started(&mut self) {
        self.journal.lock().unwrap().recordings_started += 1;
    }

    fn recording_stopped(&mut self) {
        self.journal.lock().unwrap().recordings_stopped += 1;
    }

    fn frame_recorded(&mut self, _texture: TextureId, _matrix: &Matrix4) {
        self.journal.lock().unwrap().frames_recorded += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn wait_for_camera_returns_once_a_listener_is_installed() {
        let stack = Arc::new(SimulatedStack::new(Some((640, 480)), 0));
        let device_stack = Arc::clone(&stack);
        let installer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let mut camera = device_stack.capture_device();
            camera.set_frame_listener(Arc::new(|| {}));
        });

        stack.wait_for_camera();
        installer.join().unwrap();
        assert_eq!(stack.emit_frame(), 1);
    }

    #[test]
    #[should_panic(expected = "frame listener")]
    fn emitting_without_a_listener_is_refused() {
        let stack = SimulatedStack::new(Some((640, 480)), 0);
        stack.emit_frame();
    }

    #[test]
    fn camera_open_failure_is_injectable() {
        let stack = SimulatedStack::new(Some((640, 480)), 0);
        stack.fail_camera_open();
        let mut camera = stack.capture_device();
        assert!(camera.open(30).is_err());
        assert_eq!(stack.journal().camera_open_fps, None);
    }
}
