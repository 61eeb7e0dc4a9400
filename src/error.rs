//! Unified error types for the laser firmware core.
//!
//! Only initialisation and configuration can fail with an `Error`.  The
//! runtime firing path clamps bad input instead of rejecting it, and the
//! interlock timeout has its own type in [`crate::interlock`].
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible initialisation step funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A waveform generator or pulse timer could not be programmed.
    Driver(DriverError),
    /// Configuration is invalid or does not match the fitted hardware.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The backend cannot generate the requested PWM frequency.
    UnsupportedFrequency(u32),
    /// A duty register write was rejected by the HAL.
    PwmWriteFailed,
    /// The arm output could not be driven.
    GpioWriteFailed,
    /// The one-shot timer could not be created (ESP-IDF return code).
    TimerCreateFailed(i32),
    /// The one-shot timer refused to start (ESP-IDF return code).
    TimerStartFailed(i32),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFrequency(hz) => write!(f, "unsupported PWM frequency {hz} Hz"),
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::TimerCreateFailed(rc) => write!(f, "pulse timer create failed (rc={rc})"),
            Self::TimerStartFailed(rc) => write!(f, "pulse timer start failed (rc={rc})"),
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration blob could not be deserialised.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The configured backend differs from the one handed to the hardware.
    BackendMismatch,
    /// A configured GPIO differs from the pin the board code claimed.
    PinMismatch {
        signal: &'static str,
        configured: i32,
        fitted: Option<i32>,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::BackendMismatch => write!(f, "configured PWM backend does not match hardware"),
            Self::PinMismatch {
                signal,
                configured,
                fitted: Some(pin),
            } => write!(f, "{signal}: configured GPIO{configured}, board uses GPIO{pin}"),
            Self::PinMismatch {
                signal,
                configured,
                fitted: None,
            } => write!(f, "{signal}: configured GPIO{configured}, board has no such line"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
