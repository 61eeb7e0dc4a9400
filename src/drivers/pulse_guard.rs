//! Hardware pulse cut-off.
//!
//! A pulse must end after its requested duration even if the main loop is
//! busy, so the end of the pulse is timed by a one-shot hardware timer.
//! [`PulseTimeoutGuard`] wraps the timer; the expiry interrupt calls
//! [`on_expiry`](PulseTimeoutGuard::on_expiry) after zeroing the duty
//! register (see `LaserHardware::on_pulse_timeout`).
//!
//! At most one countdown is ever pending.  Re-arming stops the running
//! count, drops any latched expiry and starts over from zero.
//!
//! A serviced expiry raises a flag that stays up until the main context
//! collects it with [`take_expired`](PulseTimeoutGuard::take_expired);
//! neither `arm` nor `disarm` touches it.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use critical_section::Mutex;
use log::warn;

use crate::app::ports::ArmTimeout;
use crate::error::DriverError;

pub struct PulseTimeoutGuard<T> {
    timer: Mutex<RefCell<T>>,
    armed: AtomicBool,
    /// Set by the interrupt, cleared by `take_expired`.
    expired: AtomicBool,
    /// Expiries serviced since boot.
    expiries: AtomicU32,
}

impl<T: ArmTimeout> PulseTimeoutGuard<T> {
    pub fn new(timer: T) -> Self {
        Self {
            timer: Mutex::new(RefCell::new(timer)),
            armed: AtomicBool::new(false),
            expired: AtomicBool::new(false),
            expiries: AtomicU32::new(0),
        }
    }

    /// Start a countdown of `duration_us`.  Durations beyond the timer's
    /// range are clamped; the duration actually armed is returned.
    pub fn arm(&self, duration_us: u32) -> Result<u32, DriverError> {
        let max = self.max_duration_us();
        let duration_us = if duration_us > max {
            warn!(
                "pulse: {} us exceeds timer range, clamped to {} us",
                duration_us, max
            );
            max
        } else {
            duration_us
        };

        critical_section::with(|cs| {
            let mut timer = self.timer.borrow_ref_mut(cs);
            timer.stop();
            timer.clear_pending();
            timer.start_once(duration_us)?;
            self.armed.store(true, Ordering::Release);
            Ok(duration_us)
        })
    }

    /// Cancel a pending countdown, if any.
    pub fn disarm(&self) {
        critical_section::with(|cs| {
            let mut timer = self.timer.borrow_ref_mut(cs);
            timer.stop();
            timer.clear_pending();
            self.armed.store(false, Ordering::Release);
        });
    }

    /// Expiry bookkeeping, called from the timer interrupt.
    pub fn on_expiry(&self) {
        critical_section::with(|cs| self.timer.borrow_ref_mut(cs).stop());
        self.armed.store(false, Ordering::Release);
        self.expired.store(true, Ordering::Release);
        self.expiries.fetch_add(1, Ordering::Relaxed);
    }

    /// Collect an expiry serviced since the last call.
    pub fn take_expired(&self) -> bool {
        self.expired.swap(false, Ordering::AcqRel)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn expiry_count(&self) -> u32 {
        self.expiries.load(Ordering::Relaxed)
    }

    pub fn max_duration_us(&self) -> u32 {
        critical_section::with(|cs| self.timer.borrow_ref(cs).max_duration_us())
    }
}
