//! Single-slot mailbox carrying window lifecycle events to the render thread
//!
//! The platform reports window creation, geometry changes and destruction on
//! its UI thread. Instead of mutating the surface manager from that thread, the
//! UI side posts a [`WindowMessage`] and the render thread applies the latest
//! one between frames. Only the most recent state matters, so the mailbox keeps
//! one pending message and coalesces newer posts into it.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::render::window::NativeWindow;
use crate::render::SurfaceSize;

/// Window lifecycle event posted by the UI thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowMessage {
    /// A window became available; bind a fresh on-screen surface to it
    Attach(NativeWindow),
    /// The bound window's drawable area changed
    Resize(SurfaceSize),
    /// The window is going away; release the on-screen surface
    Teardown,
}

#[derive(Default)]
struct Slot {
    pending: Option<WindowMessage>,
    posted: u64,
    coalesced: u64,
}

struct Shared {
    slot: Mutex<Slot>,
    ready: Condvar,
}

/// Posting side of the mailbox, held by the UI thread
#[derive(Clone)]
pub struct MailboxSender {
    shared: Arc<Shared>,
}

impl MailboxSender {
    /// Post a message, folding it into any message still pending
    pub fn post(&self, message: WindowMessage) {
        let mut slot = self.shared.slot.lock();
        slot.posted += 1;

        let merged = match (slot.pending.take(), message) {
            (None, message) => message,
            // The new surface is created at the window's current geometry
            (Some(WindowMessage::Attach(window)), WindowMessage::Resize(size)) => {
                slot.coalesced += 1;
                window.set_size(size);
                WindowMessage::Attach(window)
            }
            // Nothing left to resize once teardown is pending
            (Some(WindowMessage::Teardown), WindowMessage::Resize(size)) => {
                slot.coalesced += 1;
                log::trace!("Dropping resize to {} behind pending teardown", size);
                WindowMessage::Teardown
            }
            (Some(previous), message) => {
                slot.coalesced += 1;
                log::trace!("Replacing pending {:?} with {:?}", previous, message);
                message
            }
        };

        slot.pending = Some(merged);
        drop(slot);
        self.shared.ready.notify_one();
    }
}

/// Receiving side of the mailbox, held by the render thread
pub struct WindowMailbox {
    shared: Arc<Shared>,
}

impl Default for WindowMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowMailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::default()),
                ready: Condvar::new(),
            }),
        }
    }

    /// Create a sender for the UI thread
    pub fn sender(&self) -> MailboxSender {
        MailboxSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Take the pending message without blocking
    pub fn take(&self) -> Option<WindowMessage> {
        self.shared.slot.lock().pending.take()
    }

    /// Wait up to `timeout` for a message
    pub fn wait_timeout(&self, timeout: Duration) -> Option<WindowMessage> {
        let mut slot = self.shared.slot.lock();
        if slot.pending.is_none() {
            let _ = self.shared.ready.wait_for(&mut slot, timeout);
        }
        slot.pending.take()
    }

    /// True when a message is waiting
    pub fn has_pending(&self) -> bool {
        self.shared.slot.lock().pending.is_some()
    }

    /// Messages posted so far and how many of them were coalesced
    pub fn stats(&self) -> (u64, u64) {
        let slot = self.shared.slot.lock();
        (slot.posted, slot.coalesced)
    }
}
