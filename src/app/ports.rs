//! Port traits: the boundary between the firing core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Laser / LaserService (domain)
//! ```
//!
//! The two hardware capabilities, [`ProgramDutyCycle`] and [`ArmTimeout`],
//! are what a board has to provide for the laser.  Everything else (time,
//! diagnostics output, the firmware-wide stop) is a collaborator injected at
//! call sites, so the core can be exercised on the host with mocks.

use crate::config::PwmBackendKind;
use crate::error::DriverError;

use super::events::LaserEvent;

// ───────────────────────────────────────────────────────────────
// Hardware capabilities (driven adapters: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A waveform generator whose duty register encodes laser power.
///
/// `write_duty` is also called from the pulse timeout interrupt, so
/// implementations must not block or allocate in it.
pub trait ProgramDutyCycle {
    /// Program the period for `frequency_hz` and return the duty count that
    /// means 100 %.  Called once, inside a critical section.
    fn program_frequency(&mut self, frequency_hz: u32) -> Result<u32, DriverError>;

    /// Load a raw duty count (`0..=max`).  Takes effect immediately.
    fn write_duty(&mut self, count: u32) -> Result<(), DriverError>;

    /// Which backend family this is.
    fn kind(&self) -> PwmBackendKind;
}

/// A one-shot countdown whose expiry raises the pulse timeout interrupt.
pub trait ArmTimeout {
    /// Reset the count to zero and start counting towards `duration_us`.
    fn start_once(&mut self, duration_us: u32) -> Result<(), DriverError>;

    /// Stop counting.  Does not touch a latched expiry.
    fn stop(&mut self);

    /// Drop an expiry that has latched but not yet been serviced.
    fn clear_pending(&mut self);

    /// Longest countdown the hardware can represent.
    fn max_duration_us(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Monotonic clocks.  Two reads are offered because the active-time
/// accounting contract can mix them (see `ActiveTimeAccounting`).
pub trait Clock {
    fn now_us(&self) -> u64;
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Diagnostics sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// Receives human-readable status events.  Advisory only: nothing in the
/// core depends on an event having been delivered.
pub trait EventSink {
    fn emit(&mut self, event: &LaserEvent);
}

// ───────────────────────────────────────────────────────────────
// Firmware-wide emergency stop
// ───────────────────────────────────────────────────────────────

/// The global stop owned by the surrounding firmware.  Implementations may
/// never return.
pub trait EmergencyStop {
    fn emergency_stop(&mut self, reason: &'static str);
}
