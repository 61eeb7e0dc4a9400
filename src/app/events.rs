//! Outbound diagnostic events.
//!
//! The firing core and the [`LaserService`](super::service::LaserService)
//! emit these through the [`EventSink`](super::ports::EventSink) port, but
//! only while diagnostics are enabled.

use super::ports::EventSink;

/// Diagnostic events emitted by the laser core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaserEvent {
    /// Duty was written for a fire request (clamped intensity, %).
    Fired { intensity: f32 },

    /// The laser went from on to off; `on_ms` was added to the active total.
    Extinguished { on_ms: u64 },

    /// The pulse cut-off interrupt zeroed the duty register.
    PulseExpired,

    PeripheralsEnabled,
    PeripheralsDisabled,

    /// `wait_ready` started polling the peripheral board.
    WaitingForPeripherals,

    /// The peripheral board never reported ready; emergency stop invoked.
    PeripheralTimeout { waited_ms: u64 },
}

/// Forward `event` to `sink` when diagnostics are on.
pub(crate) fn emit_diagnostic(enabled: bool, sink: &mut impl EventSink, event: LaserEvent) {
    if enabled {
        sink.emit(&event);
    }
}
