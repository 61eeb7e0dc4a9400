//! Hardware adapter: the laser's duty-cycle driver and pulse cut-off.
//!
//! [`LaserHardware`] is shared between the main loop and the pulse timeout
//! interrupt, so every method takes `&self` except initialisation.  On the
//! target it lives in a `static`; on the host tests own it directly.

use log::info;

use crate::app::events::LaserEvent;
use crate::app::ports::{ArmTimeout, ProgramDutyCycle};
use crate::config::LaserConfig;
use crate::drivers::pulse_guard::PulseTimeoutGuard;
use crate::drivers::pwm::DutyCycleDriver;
use crate::error::{ConfigError, Error};
use crate::events::EventQueue;

pub struct LaserHardware<P, T> {
    pwm: DutyCycleDriver<P>,
    guard: PulseTimeoutGuard<T>,
    events: EventQueue,
}

impl<P: ProgramDutyCycle, T: ArmTimeout> LaserHardware<P, T> {
    pub fn new(backend: P, timer: T) -> Self {
        Self {
            pwm: DutyCycleDriver::new(backend),
            guard: PulseTimeoutGuard::new(timer),
            events: EventQueue::new(),
        }
    }

    /// Program the waveform for `config` and leave the laser dark with no
    /// countdown pending.
    pub fn initialize(&mut self, config: &LaserConfig) -> Result<(), Error> {
        config.validate()?;
        if self.pwm.kind() != config.backend {
            return Err(ConfigError::BackendMismatch.into());
        }
        self.pwm.configure(config.pwm_frequency_hz)?;
        self.guard.disarm();
        info!(
            "laser hw: ready ({:?} @ {} Hz, pulse max {} us)",
            config.backend,
            config.pwm_frequency_hz,
            self.guard.max_duration_us()
        );
        Ok(())
    }

    /// Pulse cut-off interrupt body.  Zeroes the duty register before
    /// anything else; the event is advisory.
    pub fn on_pulse_timeout(&self) {
        self.pwm.zero_from_isr();
        self.guard.on_expiry();
        let _ = self.events.push_event(LaserEvent::PulseExpired);
    }

    pub fn pwm(&self) -> &DutyCycleDriver<P> {
        &self.pwm
    }

    pub fn guard(&self) -> &PulseTimeoutGuard<T> {
        &self.guard
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }
}
