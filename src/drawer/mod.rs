// SPDX-License-Identifier: GPL-3.0-only

//! Preview drawer — the pipeline's control surface
//!
//! [`CameraDrawer`] translates caller intent into ordered messages for the
//! render thread. Every public operation is a non-blocking enqueue, with one
//! exception: [`CameraDrawer::surface_destroyed`] blocks until the render
//! thread has fully terminated, so "destroyed" always means "no GPU work is
//! still in flight".
//!
//! Two lock domains guard distinct concerns: the session mutex serializes
//! lifecycle calls and owns the thread handle, while the frame counter has
//! its own lock so frame-available signals never contend with lifecycle
//! work. Preview/recording state is published through atomics for readers
//! on other threads.

pub mod frames;
pub(crate) mod messages;
pub(crate) mod render_loop;

use crate::backends::{PreviewStack, SurfaceHandle};
use crate::config::PreviewConfig;
use crate::filters::FilterType;
use self::frames::FrameCounter;
use self::messages::{MessageSender, RenderMessage};
use self::render_loop::{LoopParams, render_thread_main};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Coarse pipeline state visible to callers on any thread
#[derive(Default)]
pub(crate) struct SharedFlags {
    pub(crate) previewing: AtomicBool,
    pub(crate) recording: AtomicBool,
}

/// A live render thread plus its message queue
struct RenderSession {
    sender: MessageSender,
    thread: Option<JoinHandle<()>>,
}

/// Camera preview drawer
///
/// Owns one render thread per preview session. The thread is spun up lazily
/// by [`surface_created`](Self::surface_created) and joined by
/// [`surface_destroyed`](Self::surface_destroyed); until a surface exists,
/// every other operation is a silent no-op.
pub struct CameraDrawer {
    config: PreviewConfig,
    stack: Arc<dyn PreviewStack>,
    session: Mutex<Option<RenderSession>>,
    flags: Arc<SharedFlags>,
    frames: Arc<FrameCounter>,
}

impl CameraDrawer {
    pub fn new(config: PreviewConfig, stack: Arc<dyn PreviewStack>) -> Self {
        Self {
            config,
            stack,
            session: Mutex::new(None),
            flags: Arc::new(SharedFlags::default()),
            frames: Arc::new(FrameCounter::new()),
        }
    }

    /// The windowing system supplied a drawable surface. Spins up the render
    /// thread if absent and posts surface construction.
    pub fn surface_created(&self, surface: SurfaceHandle) {
        let mut session = self.session.lock().unwrap();
        if session.is_none() {
            *session = Some(self.spawn_session());
        }
        if let Some(session) = session.as_ref() {
            session.sender.send(RenderMessage::SurfaceCreated(surface));
        }
    }

    /// The drawable surface changed size; also starts the preview.
    pub fn surface_changed(&self, width: u32, height: u32) {
        let session = self.session.lock().unwrap();
        let Some(session) = session.as_ref() else {
            return;
        };
        session
            .sender
            .send(RenderMessage::SurfaceChanged { width, height });
        self.flags.previewing.store(true, Ordering::SeqCst);
        session.sender.send(RenderMessage::StartPreview);
    }

    /// The drawable surface is going away. Posts teardown and blocks until
    /// the render thread has terminated; on return no GPU call can execute.
    pub fn surface_destroyed(&self) {
        self.flags.previewing.store(false, Ordering::SeqCst);

        let mut guard = self.session.lock().unwrap();
        let Some(mut session) = guard.take() else {
            return;
        };
        session.sender.send(RenderMessage::StopPreview);
        session.sender.send(RenderMessage::SurfaceDestroyed);
        session.sender.send(RenderMessage::Destroy);
        session.sender.send(RenderMessage::Quit);

        // Frame arrivals from here on only bump the counter
        self.frames.detach();

        if let Some(thread) = session.thread.take() {
            debug!("waiting for render thread to terminate");
            if thread.join().is_err() {
                // Teardown proceeds best-effort; the handle is already cleared
                warn!("render thread panicked during teardown");
            }
        }
        info!("preview session torn down");
    }

    /// Start the preview. No-op until a surface has been created.
    pub fn start_preview(&self) {
        let session = self.session.lock().unwrap();
        let Some(session) = session.as_ref() else {
            return;
        };
        session.sender.send(RenderMessage::StartPreview);
        self.flags.previewing.store(true, Ordering::SeqCst);
    }

    /// Stop the preview. No-op until a surface has been created.
    pub fn stop_preview(&self) {
        let session = self.session.lock().unwrap();
        let Some(session) = session.as_ref() else {
            return;
        };
        session.sender.send(RenderMessage::StopPreview);
        self.flags.previewing.store(false, Ordering::SeqCst);
    }

    /// Swap the active effect filter
    pub fn change_filter(&self, filter_type: FilterType) {
        self.post(RenderMessage::SetFilter(filter_type));
    }

    /// Update view dimensions without a surface event
    pub fn update_preview(&self, width: u32, height: u32) {
        self.post(RenderMessage::UpdatePreview { width, height });
    }

    pub fn start_recording(&self) {
        self.post(RenderMessage::StartRecording);
    }

    /// Stop recording; the recording-active flag clears synchronously.
    pub fn stop_recording(&self) {
        let session = self.session.lock().unwrap();
        let Some(session) = session.as_ref() else {
            return;
        };
        session.sender.send(RenderMessage::StopRecording);
        self.flags.recording.store(false, Ordering::SeqCst);
    }

    /// Hand the next rendered frame to the still-capture collaborator
    pub fn take_picture(&self) {
        self.post(RenderMessage::TakePicture);
    }

    /// Frame-available signal from the capture collaborator; callable from
    /// any thread.
    pub fn on_frame_available(&self) {
        self.frames.add_frame();
    }

    /// Discard the next consumed camera frame (skip one stale frame after a
    /// reconfiguration).
    pub fn drop_next_frame(&self) {
        self.frames.drop_next_frame();
    }

    /// Whether the last draw left fresh camera content on screen
    pub fn has_new_frame(&self) -> bool {
        self.frames.has_new_frame()
    }

    pub fn is_previewing(&self) -> bool {
        self.flags.previewing.load(Ordering::SeqCst)
    }

    pub fn is_recording(&self) -> bool {
        self.flags.recording.load(Ordering::SeqCst)
    }

    fn post(&self, message: RenderMessage) {
        let session = self.session.lock().unwrap();
        if let Some(session) = session.as_ref() {
            session.sender.send(message);
        }
    }

    fn spawn_session(&self) -> RenderSession {
        let (sender, receiver) = messages::channel();
        self.frames.attach(sender.clone());

        let params = LoopParams {
            config: self.config.clone(),
            stack: Arc::clone(&self.stack),
            frames: Arc::clone(&self.frames),
            flags: Arc::clone(&self.flags),
            receiver,
        };
        info!("spawning render thread");
        let thread = thread::spawn(move || render_thread_main(params));

        RenderSession {
            sender,
            thread: Some(thread),
        }
    }
}

impl Drop for CameraDrawer {
    fn drop(&mut self) {
        // Never leak the render thread or its GPU context
        self.surface_destroyed();
    }
}
