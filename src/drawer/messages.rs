// SPDX-License-Identifier: GPL-3.0-only

//! Render thread message type and queue
//!
//! The queue is FIFO with one exception: draw requests are latency-sensitive
//! and superseding, so [`MessageSender::send_draw`] removes any still-queued
//! draw and inserts a fresh one at the front. Only the newest draw request
//! needs to survive; an older undrawn request is redundant once a newer
//! frame has arrived. Lifecycle and config messages are never reordered
//! relative to each other.

use crate::backends::SurfaceHandle;
use crate::filters::FilterType;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Messages processed by the render loop, one at a time, in queue order
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RenderMessage {
    /// Construct GPU context, camera texture and filter chain
    SurfaceCreated(SurfaceHandle),
    /// Drawable surface dimensions changed
    SurfaceChanged { width: u32, height: u32 },
    /// Release camera, capture texture, surface and context
    SurfaceDestroyed,
    /// Drain accumulated frames and render once
    DrawFrame,
    /// Swap the active effect filter
    SetFilter(FilterType),
    /// View dimensions changed without a surface event
    UpdatePreview { width: u32, height: u32 },
    /// Preview state transition hooks
    StartPreview,
    StopPreview,
    /// Recording collaborator triggers
    StartRecording,
    StopRecording,
    /// Hand the next rendered frame to the still-capture collaborator
    TakePicture,
    /// Release anything not already released (idempotent)
    Destroy,
    /// Exit the loop once the queue has drained up to this message
    Quit,
}

struct Shared {
    queue: Mutex<VecDeque<RenderMessage>>,
    available: Condvar,
}

/// Sending half of the render queue; cheap to clone
#[derive(Clone)]
pub(crate) struct MessageSender {
    shared: Arc<Shared>,
}

/// Receiving half, owned by the render thread
pub(crate) struct MessageReceiver {
    shared: Arc<Shared>,
}

pub(crate) fn channel() -> (MessageSender, MessageReceiver) {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::new()),
        available: Condvar::new(),
    });
    (
        MessageSender {
            shared: Arc::clone(&shared),
        },
        MessageReceiver { shared },
    )
}

impl MessageSender {
    /// Append a message in FIFO order
    pub(crate) fn send(&self, message: RenderMessage) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(message);
        self.shared.available.notify_one();
    }

    /// Coalesce and prioritize a draw request: any queued but not yet
    /// processed draw is dropped, and a fresh one goes to the front.
    pub(crate) fn send_draw(&self) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.retain(|m| !matches!(m, RenderMessage::DrawFrame));
        queue.push_front(RenderMessage::DrawFrame);
        self.shared.available.notify_one();
    }
}

impl MessageReceiver {
    /// Block until the next message is available
    pub(crate) fn recv(&self) -> RenderMessage {
        let mut queue = self.shared.queue.lock().unwrap();
        loop {
            if let Some(message) = queue.pop_front() {
                return message;
            }
            queue = self.shared.available.wait(queue).unwrap();
        }
    }

    /// Pop the next message without blocking
    #[cfg(test)]
    pub(crate) fn try_recv(&self) -> Option<RenderMessage> {
        self.shared.queue.lock().unwrap().pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_for_non_draw_messages() {
        let (tx, rx) = channel();
        tx.send(RenderMessage::StartPreview);
        tx.send(RenderMessage::SetFilter(FilterType::Sepia));
        tx.send(RenderMessage::StopPreview);

        assert_eq!(rx.try_recv(), Some(RenderMessage::StartPreview));
        assert_eq!(rx.try_recv(), Some(RenderMessage::SetFilter(FilterType::Sepia)));
        assert_eq!(rx.try_recv(), Some(RenderMessage::StopPreview));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn draws_coalesce_to_a_single_front_entry() {
        let (tx, rx) = channel();
        tx.send(RenderMessage::StartPreview);
        tx.send_draw();
        tx.send(RenderMessage::SetFilter(FilterType::Mono));
        tx.send_draw();
        tx.send_draw();

        // Exactly one draw survives, ahead of everything still queued
        assert_eq!(rx.try_recv(), Some(RenderMessage::DrawFrame));
        assert_eq!(rx.try_recv(), Some(RenderMessage::StartPreview));
        assert_eq!(rx.try_recv(), Some(RenderMessage::SetFilter(FilterType::Mono)));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn draw_never_jumps_a_message_already_dequeued() {
        let (tx, rx) = channel();
        tx.send(RenderMessage::StartPreview);
        assert_eq!(rx.try_recv(), Some(RenderMessage::StartPreview));

        tx.send_draw();
        assert_eq!(rx.try_recv(), Some(RenderMessage::DrawFrame));
    }

    #[test]
    fn recv_blocks_until_send() {
        let (tx, rx) = channel();
        let handle = std::thread::spawn(move || rx.recv());
        std::thread::sleep(std::time::Duration::from_millis(20));
        tx.send(RenderMessage::Quit);
        assert_eq!(handle.join().unwrap(), RenderMessage::Quit);
    }
}
