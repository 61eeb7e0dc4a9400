//! GPIO / peripheral pin assignments for the laser controller board.
//!
//! Single source of truth: config defaults and the firmware entry point
//! reference this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Laser output
// ---------------------------------------------------------------------------

/// Output compare pin of the direct PWM counter.  The register backend can
/// only drive this pin.
pub const LASER_FIRING_GPIO: i32 = 5;
/// LEDC-driven intensity pin used by the library PWM backend.
pub const LASER_INTENSITY_GPIO: i32 = 6;
/// Arm line for drivers that need a separate fire/enable signal (active HIGH).
pub const LASER_ARM_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Peripheral control board handshake
// ---------------------------------------------------------------------------

/// Digital output: enables the peripheral board (active LOW).
pub const PERIPHERALS_ENABLE_GPIO: i32 = 40;
/// Digital input: peripheral board ready (active LOW, pulled up).
pub const PERIPHERALS_STATUS_GPIO: i32 = 41;
/// How long `wait_ready` polls before escalating to an emergency stop.
pub const PERIPHERALS_TIMEOUT_MS: u32 = 30_000;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// Default laser PWM frequency.
pub const LASER_PWM_FREQ_HZ: u32 = 5_000;
/// Input clock of the direct PWM counter (no prescaler).
pub const COUNTER_CLOCK_HZ: u32 = 16_000_000;

// ---------------------------------------------------------------------------
// Pulse cut-off timer
// ---------------------------------------------------------------------------

/// Longest pulse the cut-off counter can time (16-bit at 0.5 µs/tick).
pub const MAX_PULSE_US: u32 = 32_767;
