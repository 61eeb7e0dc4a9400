//! Laser runtime state.
//!
//! One [`LaserState`] exists per emitter.  It is owned by the motion
//! context and lent to the firing state machine by `&mut`; the pulse
//! timeout interrupt never sees it.  An expiry reaches the state only when
//! the main context collects it from the guard.

use crate::config::{LaserConfig, PeelConfig, RasterConfig};

/// Operating mode selected by the motion planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaserMode {
    #[default]
    Continuous,
    Pulsed,
    Raster,
}

impl LaserMode {
    /// Map a numeric mode code (0, 1, 2) to a mode.  Other codes are `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Continuous),
            1 => Some(Self::Pulsed),
            2 => Some(Self::Raster),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Continuous => 0,
            Self::Pulsed => 1,
            Self::Raster => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Firing {
    #[default]
    Off,
    On,
}

/// Raster scan direction along the fast axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    #[default]
    Forward,
    Reverse,
}

impl ScanDirection {
    pub fn sign(self) -> i8 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}

/// Raster parameters handed to the image feeder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterParams {
    pub aspect_ratio: f32,
    pub mm_per_pulse: f32,
    pub direction: ScanDirection,
}

impl From<RasterConfig> for RasterParams {
    fn from(c: RasterConfig) -> Self {
        Self {
            aspect_ratio: c.aspect_ratio,
            mm_per_pulse: c.mm_per_pulse,
            direction: ScanDirection::Forward,
        }
    }
}

/// Peel move parameters for resin printers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeelParams {
    pub distance_mm: f32,
    pub speed: f32,
    pub pause_ms: f32,
}

impl From<PeelConfig> for PeelParams {
    fn from(c: PeelConfig) -> Self {
        Self {
            distance_mm: c.distance_mm,
            speed: c.speed,
            pause_ms: c.pause_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaserState {
    pub(crate) intensity: f32,
    pub(crate) mode: LaserMode,
    pub(crate) firing: Firing,
    pub(crate) last_firing_us: u64,
    pub(crate) active_time_ms: u64,
    pub(crate) diagnostics_enabled: bool,
    /// When the armed cut-off is due (µs); `None` while no pulse runs.
    pub(crate) pulse_end_us: Option<u64>,

    /// Pulses per millimetre, set by the motion planner.
    pub ppm: f32,
    /// Requested pulse duration of the last `fire_pulse` (µs).
    pub duration_us: u32,

    pub raster: Option<RasterParams>,
    pub peel: Option<PeelParams>,
}

impl LaserState {
    pub fn new(config: &LaserConfig) -> Self {
        Self {
            intensity: 0.0,
            mode: LaserMode::Continuous,
            firing: Firing::Off,
            last_firing_us: 0,
            active_time_ms: 0,
            diagnostics_enabled: config.diagnostics,
            pulse_end_us: None,
            ppm: 0.0,
            duration_us: 0,
            raster: config.raster.map(RasterParams::from),
            peel: config.peel.map(PeelParams::from),
        }
    }

    /// Last commanded intensity (%), always within `[0, 100]`.
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn mode(&self) -> LaserMode {
        self.mode
    }

    pub fn firing(&self) -> Firing {
        self.firing
    }

    pub fn is_firing(&self) -> bool {
        self.firing == Firing::On
    }

    /// Timestamp (µs) of the most recent off → on transition.
    pub fn last_firing_us(&self) -> u64 {
        self.last_firing_us
    }

    /// Total on-time (ms), updated when the laser is extinguished.
    pub fn active_time_ms(&self) -> u64 {
        self.active_time_ms
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.diagnostics_enabled
    }
}
