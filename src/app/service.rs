//! Laser service: the external interface of the laser core.
//!
//! [`LaserService`] owns the [`LaserState`], the firing state machine and
//! the optional peripheral interlock.  Clock, diagnostics sink and the
//! firmware's emergency stop are injected at call sites, so the whole
//! service runs on the host against mocks.
//!
//! ```text
//!                 ┌──────────────────────────┐ ──▶ EventSink
//!  LaserCommand ─▶│       LaserService        │
//!                 │  Laser · State · Interlock│ ──▶ EmergencyStop
//!                 └──────────────────────────┘
//!                        │ &LaserHardware
//!                        ▼
//!               DutyCycleDriver · PulseTimeoutGuard
//! ```

use embedded_hal::digital::{InputPin, OutputPin};
use log::info;

use crate::adapters::hardware::LaserHardware;
use crate::config::LaserConfig;
use crate::interlock::{InterlockError, PeripheralInterlock};
use crate::laser::{Laser, LaserState};
use crate::pins;

use super::commands::LaserCommand;
use super::events::{LaserEvent, emit_diagnostic};
use super::ports::{ArmTimeout, Clock, EmergencyStop, EventSink, ProgramDutyCycle};

pub struct LaserService<'hw, P, T, EN, ST> {
    laser: Laser<'hw, P, T>,
    state: LaserState,
    interlock: Option<PeripheralInterlock<EN, ST>>,
    /// Timeout used by `wait_for_peripherals`.
    peripherals_timeout_ms: u32,
}

impl<'hw, P, T, EN, ST> LaserService<'hw, P, T, EN, ST>
where
    P: ProgramDutyCycle,
    T: ArmTimeout,
    EN: OutputPin,
    ST: InputPin,
{
    /// Build the service over initialised hardware.  The laser starts off,
    /// in continuous mode, with no active time.
    pub fn new(
        hw: &'hw LaserHardware<P, T>,
        config: &LaserConfig,
        interlock: Option<PeripheralInterlock<EN, ST>>,
    ) -> Self {
        let peripherals_timeout_ms = config
            .peripherals
            .map_or(pins::PERIPHERALS_TIMEOUT_MS, |p| p.timeout_ms);
        info!(
            "LaserService ready (interlock: {})",
            if interlock.is_some() { "fitted" } else { "none" }
        );
        Self {
            laser: Laser::new(hw, config),
            state: LaserState::new(config),
            interlock,
            peripherals_timeout_ms,
        }
    }

    // ── Firing ────────────────────────────────────────────────

    pub fn fire(&mut self, intensity: f32, clock: &impl Clock, sink: &mut impl EventSink) {
        self.laser.fire(&mut self.state, intensity, clock, sink);
    }

    pub fn fire_pulse(
        &mut self,
        intensity: f32,
        duration_us: u32,
        clock: &impl Clock,
        sink: &mut impl EventSink,
    ) {
        self.laser
            .fire_pulse(&mut self.state, intensity, duration_us, clock, sink);
    }

    pub fn extinguish(&mut self, clock: &impl Clock, sink: &mut impl EventSink) {
        self.laser.extinguish(&mut self.state, clock, sink);
    }

    pub fn set_mode(&mut self, code: i32) {
        self.laser.set_mode(&mut self.state, code);
    }

    pub fn set_diagnostics(&mut self, enabled: bool) {
        self.state.diagnostics_enabled = enabled;
    }

    /// Forward events raised by the pulse timeout interrupt and end a pulse
    /// the cut-off has stopped.  Call from the main loop.
    pub fn service_events(&mut self, clock: &impl Clock, sink: &mut impl EventSink) {
        self.laser.service_events(&mut self.state, clock, sink);
    }

    // ── Peripherals ───────────────────────────────────────────

    /// Peripherals ready.  Always `true` when no interlock is fitted.
    pub fn peripherals_ok(&mut self) -> bool {
        self.interlock.as_mut().is_none_or(PeripheralInterlock::ok)
    }

    pub fn peripherals_enable(&mut self, sink: &mut impl EventSink) {
        if let Some(il) = self.interlock.as_mut() {
            il.enable();
            emit_diagnostic(
                self.state.diagnostics_enabled,
                sink,
                LaserEvent::PeripheralsEnabled,
            );
        }
    }

    /// Release the peripherals.  Returns `false` when no interlock is
    /// fitted or the board is not ready yet.
    pub fn peripherals_disable(&mut self, sink: &mut impl EventSink) -> bool {
        let Some(il) = self.interlock.as_mut() else {
            return false;
        };
        let released = il.disable();
        if released {
            emit_diagnostic(
                self.state.diagnostics_enabled,
                sink,
                LaserEvent::PeripheralsDisabled,
            );
        }
        released
    }

    /// Block until the peripherals are ready or `timeout_ms` passes.  On
    /// timeout the emergency stop has already been invoked.
    pub fn wait_ready(
        &mut self,
        timeout_ms: u32,
        clock: &impl Clock,
        estop: &mut impl EmergencyStop,
        sink: &mut impl EventSink,
    ) -> Result<(), InterlockError> {
        let diagnostics = self.state.diagnostics_enabled;
        let Some(il) = self.interlock.as_mut() else {
            return Ok(());
        };
        if il.ok() {
            return Ok(());
        }

        emit_diagnostic(diagnostics, sink, LaserEvent::WaitingForPeripherals);
        il.wait_ready(timeout_ms, clock, estop).inspect_err(|e| {
            let InterlockError::Timeout { waited_ms } = *e;
            emit_diagnostic(
                diagnostics,
                sink,
                LaserEvent::PeripheralTimeout { waited_ms },
            );
        })
    }

    /// [`wait_ready`](Self::wait_ready) with the configured timeout.
    pub fn wait_for_peripherals(
        &mut self,
        clock: &impl Clock,
        estop: &mut impl EmergencyStop,
        sink: &mut impl EventSink,
    ) -> Result<(), InterlockError> {
        self.wait_ready(self.peripherals_timeout_ms, clock, estop, sink)
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.  Only the peripheral wait can fail.
    pub fn handle_command(
        &mut self,
        cmd: LaserCommand,
        clock: &impl Clock,
        estop: &mut impl EmergencyStop,
        sink: &mut impl EventSink,
    ) -> Result<(), InterlockError> {
        match cmd {
            LaserCommand::Fire { intensity } => self.fire(intensity, clock, sink),
            LaserCommand::FirePulse {
                intensity,
                duration_us,
            } => self.fire_pulse(intensity, duration_us, clock, sink),
            LaserCommand::Extinguish => self.extinguish(clock, sink),
            LaserCommand::SetMode(code) => self.set_mode(code),
            LaserCommand::SetDiagnostics(enabled) => self.set_diagnostics(enabled),
            LaserCommand::PeripheralsOn => self.peripherals_enable(sink),
            LaserCommand::PeripheralsOff => {
                self.peripherals_disable(sink);
            }
            LaserCommand::WaitForPeripherals => {
                return self.wait_for_peripherals(clock, estop, sink);
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> &LaserState {
        &self.state
    }

    /// Motion parameters (`ppm`, raster, peel) are written by the planner.
    pub fn state_mut(&mut self) -> &mut LaserState {
        &mut self.state
    }

    pub fn hardware(&self) -> &'hw LaserHardware<P, T> {
        self.laser.hardware()
    }

    pub fn has_interlock(&self) -> bool {
        self.interlock.is_some()
    }
}
