//! Peripheral interlock.
//!
//! Handshake with the external control board that supplies air assist,
//! exhaust and cooling.  Both lines are active-low:
//!
//! | Line   | Direction | Low means                  |
//! |--------|-----------|----------------------------|
//! | enable | output    | peripherals requested on   |
//! | status | input     | peripherals report ready   |
//!
//! The interlock is independent of the firing state machine.  Callers
//! consult it (usually via [`wait_ready`](PeripheralInterlock::wait_ready))
//! before firing; a timeout is terminal and hands over to the firmware's
//! emergency stop.

use core::fmt;

use embedded_hal::digital::{InputPin, OutputPin};
use log::{error, info, warn};

use crate::app::ports::{Clock, EmergencyStop};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterlockError {
    /// Peripherals did not report ready; the emergency stop was invoked.
    Timeout { waited_ms: u64 },
}

impl fmt::Display for InterlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { waited_ms } => {
                write!(f, "peripherals not ready after {waited_ms} ms")
            }
        }
    }
}

impl core::error::Error for InterlockError {}

pub struct PeripheralInterlock<EN, ST> {
    enable: EN,
    status: ST,
}

impl<EN: OutputPin, ST: InputPin> PeripheralInterlock<EN, ST> {
    /// Take the handshake lines and drive enable inactive (high).
    pub fn new(mut enable: EN, status: ST) -> Self {
        if enable.set_high().is_err() {
            warn!("interlock: could not drive enable line inactive");
        }
        Self { enable, status }
    }

    /// Peripherals report ready.  A failed read counts as not ready.
    pub fn ok(&mut self) -> bool {
        self.status.is_low().unwrap_or(false)
    }

    /// Request the peripherals on.
    pub fn enable(&mut self) {
        if self.enable.set_low().is_err() {
            warn!("interlock: enable line write failed");
        }
    }

    /// Release the peripherals, but only while they report ready.
    /// Returns `false` when the release was deferred.
    pub fn disable(&mut self) -> bool {
        if !self.ok() {
            return false;
        }
        if self.enable.set_high().is_err() {
            warn!("interlock: enable line write failed");
            return false;
        }
        true
    }

    /// Busy-wait until the peripherals report ready.
    ///
    /// Readiness is checked before the deadline on every pass, so a board
    /// that is already ready never times out.  On timeout the emergency
    /// stop is invoked once and the error is returned; nothing is retried.
    pub fn wait_ready(
        &mut self,
        timeout_ms: u32,
        clock: &impl Clock,
        estop: &mut impl EmergencyStop,
    ) -> Result<(), InterlockError> {
        let start_ms = clock.now_ms();
        loop {
            if self.ok() {
                info!("interlock: peripherals ready");
                return Ok(());
            }
            let waited_ms = clock.now_ms().saturating_sub(start_ms);
            if waited_ms >= u64::from(timeout_ms) {
                error!("interlock: peripherals not ready after {} ms", waited_ms);
                estop.emergency_stop("peripherals not ready");
                return Err(InterlockError::Timeout { waited_ms });
            }
            core::hint::spin_loop();
        }
    }
}
