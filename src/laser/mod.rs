//! Firing state machine.
//!
//! ```text
//!            fire / fire_pulse
//!   ┌─────┐ ─────────────────▶ ┌────┐
//!   │ Off │                    │ On │ ◀─┐ fire (re-fire keeps the
//!   └─────┘ ◀───────────────── └────┘ ──┘  original timestamp)
//!                extinguish
//! ```
//!
//! [`Laser`] owns no state of its own.  Every operation takes the
//! [`LaserState`] by `&mut` together with the clock and the diagnostics
//! sink, and drives the hardware through [`LaserHardware`].
//!
//! A pulse that runs out is cut by the timeout interrupt, which zeroes the
//! duty register and raises the guard's expiry flag.  The main context
//! collects the flag at its next operation (or in `service_events`), moves
//! the state to `Off` and accounts the on-period only up to the cut.

pub mod state;

use log::{debug, error};

use crate::adapters::hardware::LaserHardware;
use crate::app::events::{LaserEvent, emit_diagnostic};
use crate::app::ports::{ArmTimeout, Clock, EventSink, ProgramDutyCycle};
use crate::config::{ActiveTimeAccounting, FiringGate, LaserConfig};
use crate::drivers::pwm::clamp_intensity;

pub use state::{Firing, LaserMode, LaserState, PeelParams, RasterParams, ScanDirection};

pub struct Laser<'hw, P, T> {
    hw: &'hw LaserHardware<P, T>,
    gate: FiringGate,
    accounting: ActiveTimeAccounting,
    floor_percent: f32,
}

impl<'hw, P: ProgramDutyCycle, T: ArmTimeout> Laser<'hw, P, T> {
    pub fn new(hw: &'hw LaserHardware<P, T>, config: &LaserConfig) -> Self {
        Self {
            hw,
            gate: config.firing_gate,
            accounting: config.active_time_accounting,
            floor_percent: config.intensity_floor_percent,
        }
    }

    pub fn hardware(&self) -> &'hw LaserHardware<P, T> {
        self.hw
    }

    /// Turn the laser on (or change power while on) at `intensity` %.
    pub fn fire(
        &self,
        state: &mut LaserState,
        intensity: f32,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) {
        if self.gate == FiringGate::Inhibited {
            debug!("laser: fire inhibited");
            return;
        }

        self.collect_cut(state, clock, sink);

        let intensity = clamp_intensity(intensity);
        state.intensity = intensity;
        if state.firing == Firing::Off {
            state.firing = Firing::On;
            state.last_firing_us = clock.now_us();
        }
        self.hw.pwm().set_duty(self.drive_level(intensity));

        emit_diagnostic(
            state.diagnostics_enabled,
            sink,
            LaserEvent::Fired { intensity },
        );
    }

    /// Fire and arm the hardware cut-off for `duration_us`.
    pub fn fire_pulse(
        &self,
        state: &mut LaserState,
        intensity: f32,
        duration_us: u32,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) {
        if self.gate == FiringGate::Inhibited {
            debug!("laser: pulse inhibited");
            return;
        }

        // An expiry of the previous pulse that latched but was not yet
        // serviced would zero the duty written below.
        self.hw.guard().disarm();
        self.fire(state, intensity, clock, sink);
        state.duration_us = duration_us;

        // Without a cut-off the pulse would not end on time.
        match self.hw.guard().arm(duration_us) {
            Ok(armed_us) => {
                state.pulse_end_us = Some(clock.now_us().saturating_add(u64::from(armed_us)));
            }
            Err(e) => {
                error!("laser: pulse timer arm failed: {}, extinguishing", e);
                self.extinguish(state, clock, sink);
            }
        }
    }

    /// Turn the laser off and add the on-period to the active total.
    /// Does nothing if the laser is already off.
    pub fn extinguish(&self, state: &mut LaserState, clock: &impl Clock, sink: &mut impl EventSink) {
        self.collect_cut(state, clock, sink);
        if state.firing != Firing::On {
            return;
        }

        state.firing = Firing::Off;
        state.pulse_end_us = None;
        self.hw.pwm().zero();
        self.hw.guard().disarm();
        // An expiry that raced the disarm belongs to this on-period.
        self.hw.guard().take_expired();

        let on_ms = self.elapsed_ms(state.last_firing_us, clock);
        state.active_time_ms = state.active_time_ms.saturating_add(on_ms);

        emit_diagnostic(
            state.diagnostics_enabled,
            sink,
            LaserEvent::Extinguished { on_ms },
        );
    }

    /// Select the operating mode by code.  Unknown codes are ignored.
    pub fn set_mode(&self, state: &mut LaserState, code: i32) {
        match LaserMode::from_code(code) {
            Some(mode) => state.mode = mode,
            None => debug!("laser: ignoring mode code {}", code),
        }
    }

    /// Forward events queued by the timeout interrupt and apply a pulse
    /// cut-off to the logical state.
    pub fn service_events(
        &self,
        state: &mut LaserState,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) {
        let diagnostics = state.diagnostics_enabled;
        self.hw
            .events()
            .drain_events(|event| emit_diagnostic(diagnostics, sink, event));
        self.collect_cut(state, clock, sink);
    }

    /// Apply an expiry serviced by the interrupt: the pulse ended at its
    /// cut-off, so the on-period stops there rather than now.
    fn collect_cut(&self, state: &mut LaserState, clock: &impl Clock, sink: &mut impl EventSink) {
        if !self.hw.guard().take_expired() {
            return;
        }
        let Some(end_us) = state.pulse_end_us.take() else {
            return;
        };
        if state.firing != Firing::On {
            return;
        }

        state.firing = Firing::Off;
        // The cut is only known on the microsecond clock.
        let cut_us = end_us.min(clock.now_us());
        let on_ms = cut_us.saturating_sub(state.last_firing_us) / 1_000;
        state.active_time_ms = state.active_time_ms.saturating_add(on_ms);
        debug!("laser: pulse cut after {} ms", on_ms);

        emit_diagnostic(
            state.diagnostics_enabled,
            sink,
            LaserEvent::Extinguished { on_ms },
        );
    }

    /// Remap non-zero intensities into `[floor, 100]` for drivers that
    /// emit nothing below a minimum level.
    fn drive_level(&self, intensity: f32) -> f32 {
        if self.floor_percent > 0.0 && intensity > 0.0 {
            self.floor_percent + intensity * (100.0 - self.floor_percent) / 100.0
        } else {
            intensity
        }
    }

    fn elapsed_ms(&self, last_firing_us: u64, clock: &impl Clock) -> u64 {
        match self.accounting {
            ActiveTimeAccounting::MixedClocks => clock.now_ms().saturating_sub(last_firing_us / 1_000),
            ActiveTimeAccounting::Microseconds => clock.now_us().saturating_sub(last_firing_us) / 1_000,
        }
    }
}
