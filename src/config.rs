//! Laser configuration parameters.
//!
//! Supplied by an external loader (NVS, SD card, host link) and consumed
//! once at initialisation.  Values are validated before any hardware is
//! programmed; invalid ranges are rejected, not clamped.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Which PWM implementation drives the laser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PwmBackendKind {
    /// Direct counter register programming (TOP + compare).
    TimerRegister,
    /// HAL-assisted PWM channel plus an arm output.
    Library,
}

/// Whether fire requests reach the hardware at all.
///
/// One firmware lineage returned early from the fire routine and so never
/// energised the laser; another ran the full sequence.  Which one is
/// intended is still open, so the choice is explicit here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FiringGate {
    /// `fire` and `fire_pulse` run the full sequence.
    Enabled,
    /// `fire` and `fire_pulse` return before any state change or duty write.
    Inhibited,
}

/// Unit contract used when adding an on-period to the active-time total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveTimeAccounting {
    /// `now_ms - last_firing_us / 1000`: the millisecond clock against the
    /// microsecond firing timestamp.  Drift between the two clocks shows up
    /// in the total.
    MixedClocks,
    /// `(now_us - last_firing_us) / 1000`: both ends on the microsecond clock.
    Microseconds,
}

/// Peripheral control board handshake lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeripheralsConfig {
    pub enable_gpio: i32,
    pub status_gpio: i32,
    /// Maximum time `wait_for_peripherals` polls before an emergency stop.
    pub timeout_ms: u32,
}

impl Default for PeripheralsConfig {
    fn default() -> Self {
        Self {
            enable_gpio: pins::PERIPHERALS_ENABLE_GPIO,
            status_gpio: pins::PERIPHERALS_STATUS_GPIO,
            timeout_ms: pins::PERIPHERALS_TIMEOUT_MS,
        }
    }
}

/// Raster engraving defaults handed to the image feeder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterConfig {
    pub aspect_ratio: f32,
    pub mm_per_pulse: f32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: 1.33,
            mm_per_pulse: 0.2,
        }
    }
}

/// Platform peel move defaults (resin printers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeelConfig {
    pub distance_mm: f32,
    pub speed: f32,
    pub pause_ms: f32,
}

impl Default for PeelConfig {
    fn default() -> Self {
        Self {
            distance_mm: 2.0,
            speed: 2.0,
            pause_ms: 0.0,
        }
    }
}

/// GPIO numbers the board code claimed for the laser, checked against the
/// configuration before any driver is built.  `None` means the line is not
/// wired on this board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FittedPins {
    /// Pin carrying the waveform (counter output or LEDC channel).
    pub pwm_output: Option<i32>,
    pub arm: Option<i32>,
    pub peripherals_enable: Option<i32>,
    pub peripherals_status: Option<i32>,
}

/// Core laser configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaserConfig {
    // --- PWM ---
    /// Target PWM frequency (Hz).
    pub pwm_frequency_hz: u32,
    /// Which backend variant is fitted.
    pub backend: PwmBackendKind,
    /// Input clock of the direct counter (register backend only).
    pub counter_clock_hz: u32,
    /// Pin driven by the waveform generator.
    pub firing_gpio: i32,
    /// Intensity pin for the library backend.
    pub intensity_gpio: i32,
    /// Arm line for the library backend.
    pub arm_gpio: i32,
    /// Minimum drive level (%) for drivers that emit nothing below it.
    /// Non-zero intensities are remapped into `[floor, 100]`; 0 disables.
    pub intensity_floor_percent: f32,

    // --- Pulse cut-off ---
    /// Longest pulse the cut-off timer is allowed to time (µs).
    pub max_pulse_us: u32,

    // --- Behaviour ---
    pub firing_gate: FiringGate,
    pub active_time_accounting: ActiveTimeAccounting,
    /// Emit diagnostic events from boot.
    pub diagnostics: bool,

    // --- Optional capabilities ---
    pub peripherals: Option<PeripheralsConfig>,
    pub raster: Option<RasterConfig>,
    pub peel: Option<PeelConfig>,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: pins::LASER_PWM_FREQ_HZ,
            backend: PwmBackendKind::TimerRegister,
            counter_clock_hz: pins::COUNTER_CLOCK_HZ,
            firing_gpio: pins::LASER_FIRING_GPIO,
            intensity_gpio: pins::LASER_INTENSITY_GPIO,
            arm_gpio: pins::LASER_ARM_GPIO,
            intensity_floor_percent: 0.0,

            max_pulse_us: pins::MAX_PULSE_US,

            firing_gate: FiringGate::Enabled,
            active_time_accounting: ActiveTimeAccounting::MixedClocks,
            diagnostics: false,

            peripherals: None,
            raster: None,
            peel: None,
        }
    }
}

impl LaserConfig {
    /// Deserialise and validate a JSON blob from the config loader.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Counter TOP for the register backend: phase and frequency correct
    /// mode counts up then down, so one period is `2 * TOP` clocks.
    pub fn counter_top(&self) -> u32 {
        if self.pwm_frequency_hz == 0 {
            return 0;
        }
        self.counter_clock_hz / self.pwm_frequency_hz / 2
    }

    /// Reject a board whose claimed pins differ from the configured ones.
    /// Peripheral lines are only checked when the interlock is configured.
    pub fn check_pins(&self, fitted: &FittedPins) -> Result<(), ConfigError> {
        match self.backend {
            PwmBackendKind::TimerRegister => {
                expect_pin("firing output", self.firing_gpio, fitted.pwm_output)?;
            }
            PwmBackendKind::Library => {
                expect_pin("intensity output", self.intensity_gpio, fitted.pwm_output)?;
                expect_pin("arm line", self.arm_gpio, fitted.arm)?;
            }
        }
        if let Some(p) = &self.peripherals {
            expect_pin("peripherals enable", p.enable_gpio, fitted.peripherals_enable)?;
            expect_pin("peripherals status", p.status_gpio, fitted.peripherals_status)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pwm_frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("pwm_frequency_hz must be > 0"));
        }
        if self.backend == PwmBackendKind::TimerRegister {
            let top = self.counter_top();
            if top == 0 || top > u32::from(u16::MAX) {
                return Err(ConfigError::ValidationFailed(
                    "pwm_frequency_hz out of range for the 16-bit counter",
                ));
            }
            if self.firing_gpio != pins::LASER_FIRING_GPIO {
                return Err(ConfigError::ValidationFailed(
                    "register backend can only drive the counter output pin",
                ));
            }
        }
        if !(0.0..100.0).contains(&self.intensity_floor_percent) {
            return Err(ConfigError::ValidationFailed(
                "intensity_floor_percent must be in [0, 100)",
            ));
        }
        if self.max_pulse_us == 0 {
            return Err(ConfigError::ValidationFailed("max_pulse_us must be > 0"));
        }
        if let Some(p) = &self.peripherals {
            if p.timeout_ms == 0 {
                return Err(ConfigError::ValidationFailed(
                    "peripherals.timeout_ms must be > 0",
                ));
            }
        }
        if let Some(r) = &self.raster {
            if !(r.aspect_ratio > 0.0 && r.mm_per_pulse > 0.0) {
                return Err(ConfigError::ValidationFailed(
                    "raster aspect_ratio and mm_per_pulse must be > 0",
                ));
            }
        }
        if let Some(p) = &self.peel {
            if !(p.distance_mm >= 0.0 && p.speed >= 0.0 && p.pause_ms >= 0.0) {
                return Err(ConfigError::ValidationFailed(
                    "peel parameters must not be negative",
                ));
            }
        }
        Ok(())
    }
}

fn expect_pin(signal: &'static str, configured: i32, fitted: Option<i32>) -> Result<(), ConfigError> {
    if fitted == Some(configured) {
        Ok(())
    } else {
        Err(ConfigError::PinMismatch {
            signal,
            configured,
            fitted,
        })
    }
}
