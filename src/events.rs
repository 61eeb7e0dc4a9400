//! Interrupt → main-context event handoff.
//!
//! The pulse timeout interrupt does the time-critical work (zero the duty
//! register) itself and pushes a [`LaserEvent`] here for everything else.
//! The main loop drains the queue and decides whether to emit diagnostics.
//!
//! ```text
//! ┌───────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Pulse timeout │────▶│  EventQueue  │────▶│  Main loop   │
//! │ ISR           │     │ (try_send)   │     │ (consumer)   │
//! └───────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Pushing never blocks: a full queue drops the event, which is harmless
//! because the events are advisory.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::events::LaserEvent;

/// Maximum number of pending events.
const EVENT_QUEUE_CAP: usize = 8;

/// Bounded, lock-free-to-the-caller event queue.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, LaserEvent, EVENT_QUEUE_CAP>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push an event.  Safe to call from interrupt context.
    /// Returns `false` if the queue is full (event dropped).
    pub fn push_event(&self, event: LaserEvent) -> bool {
        self.channel.try_send(event).is_ok()
    }

    /// Pop the next event, `None` if empty.
    pub fn pop_event(&self) -> Option<LaserEvent> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, FIFO order.
    pub fn drain_events(&self, mut handler: impl FnMut(LaserEvent)) {
        while let Some(event) = self.pop_event() {
            handler(event);
        }
    }

    pub fn queue_is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn queue_len(&self) -> usize {
        self.channel.len()
    }
}
