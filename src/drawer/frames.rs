// SPDX-License-Identifier: GPL-3.0-only

//! Frame arrival counter and coalescer
//!
//! Camera frame-available signals arrive on an arbitrary thread at a rate
//! decoupled from consumption. Instead of queueing one draw per frame, the
//! counter tracks how many frames are pending and keeps at most one draw
//! request in the render queue; the next draw drains the whole burst in one
//! pass, so only the most recent camera buffer is ever rendered.

use super::messages::MessageSender;
use std::sync::Mutex;

/// Outcome of draining the counter for one draw pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DrainOutcome {
    /// Number of frame arrivals consumed
    pub consumed: u64,
    /// Whether the drain left a fresh frame in the capture texture
    pub has_new_frame: bool,
}

#[derive(Default)]
struct CounterState {
    pending: u64,
    drop_next: bool,
    has_new_frame: bool,
    sender: Option<MessageSender>,
}

/// Pending-frame count, drop-next-frame flag and the installed draw sender,
/// all guarded by one lock. This lock is never held across any other lock
/// except the render queue's own mutex (via `send_draw`).
#[derive(Default)]
pub struct FrameCounter {
    state: Mutex<CounterState>,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the render queue sender for a new session, resetting any
    /// state left over from a previous one.
    pub(crate) fn attach(&self, sender: MessageSender) {
        let mut state = self.state.lock().unwrap();
        state.pending = 0;
        state.drop_next = false;
        state.has_new_frame = false;
        state.sender = Some(sender);
    }

    /// Detach from the session's queue; later arrivals only bump the counter.
    pub(crate) fn detach(&self) {
        self.state.lock().unwrap().sender = None;
    }

    /// Record one frame arrival and post a coalesced draw request
    pub fn add_frame(&self) {
        let mut state = self.state.lock().unwrap();
        state.pending += 1;
        if let Some(sender) = &state.sender {
            sender.send_draw();
        }
    }

    /// Arrange for the next consumed frame to be discarded without marking
    /// "new frame available". Used to skip one stale frame after a
    /// reconfiguration.
    pub fn drop_next_frame(&self) {
        self.state.lock().unwrap().drop_next = true;
    }

    /// Whether the last drain left a fresh frame available
    pub fn has_new_frame(&self) -> bool {
        self.state.lock().unwrap().has_new_frame
    }

    /// Current number of unconsumed frame arrivals
    pub fn pending(&self) -> u64 {
        self.state.lock().unwrap().pending
    }

    /// Consume every pending arrival, invoking `on_frame` once per frame
    /// while the counter lock is held (the render loop passes the capture
    /// texture's `update_tex_image` here). The drop-next flag suppresses the
    /// "new frame" mark for the first consumed frame only.
    pub(crate) fn consume<F: FnMut()>(&self, mut on_frame: F) -> DrainOutcome {
        let mut state = self.state.lock().unwrap();
        let mut consumed = 0;
        while state.pending > 0 {
            on_frame();
            state.pending -= 1;
            consumed += 1;
            if state.drop_next {
                state.drop_next = false;
                state.has_new_frame = false;
            } else {
                state.has_new_frame = true;
            }
        }
        DrainOutcome {
            consumed,
            has_new_frame: state.has_new_frame,
        }
    }
}
