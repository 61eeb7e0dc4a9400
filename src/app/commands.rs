//! Inbound commands to the laser service.
//!
//! These represent requests from the motion planner or a host link that
//! the [`LaserService`](super::service::LaserService) interprets and acts
//! upon.

/// Commands that external adapters can send into the laser core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaserCommand {
    /// Turn on (or change power) at the given intensity (%).
    Fire { intensity: f32 },

    /// Fire for a bounded time; the hardware cut-off ends the pulse.
    FirePulse { intensity: f32, duration_us: u32 },

    Extinguish,

    /// Mode code: 0 continuous, 1 pulsed, 2 raster.  Others are ignored.
    SetMode(i32),

    /// Turn diagnostic event output on or off.
    SetDiagnostics(bool),

    PeripheralsOn,
    PeripheralsOff,

    /// Block until the peripheral board is ready, or stop on timeout.
    WaitForPeripherals,
}
