//! Host simulation of the laser hardware.
//!
//! Everything here is shared through `Arc` so a test can keep a handle on
//! a peripheral after handing it to the driver that owns it.  Only built
//! for non-espidf targets.

use core::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType as DigitalErrorType, InputPin, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};

use crate::app::ports::{ArmTimeout, Clock};
use crate::drivers::pwm::CounterRegisters;
use crate::error::DriverError;

// ── Clock ─────────────────────────────────────────────────────

/// Manually driven clock.  The millisecond read can be skewed against the
/// microsecond read, and every read can advance time by a fixed step so
/// polling loops make progress.
#[derive(Debug, Default)]
pub struct SimClock {
    us: AtomicU64,
    ms_skew: AtomicI64,
    step_us: AtomicU64,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that advances `step_us` after every read.
    pub fn with_step(step_us: u64) -> Self {
        let clock = Self::new();
        clock.step_us.store(step_us, Ordering::Relaxed);
        clock
    }

    pub fn set_us(&self, us: u64) {
        self.us.store(us, Ordering::Relaxed);
    }

    pub fn advance_us(&self, us: u64) {
        self.us.fetch_add(us, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_us(ms * 1_000);
    }

    /// Offset the millisecond clock relative to `now_us / 1000`.
    pub fn set_ms_skew(&self, skew_ms: i64) {
        self.ms_skew.store(skew_ms, Ordering::Relaxed);
    }

    fn read_us(&self) -> u64 {
        let step = self.step_us.load(Ordering::Relaxed);
        self.us.fetch_add(step, Ordering::Relaxed)
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u64 {
        self.read_us()
    }

    fn now_ms(&self) -> u64 {
        let ms = self.read_us() / 1_000;
        ms.saturating_add_signed(self.ms_skew.load(Ordering::Relaxed))
    }
}

// ── One-shot timer ────────────────────────────────────────────

#[derive(Debug, Default)]
struct OneShotState {
    running: bool,
    remaining_us: u32,
    pending: bool,
    starts: u32,
}

/// Simulated one-shot countdown.  Time only moves through
/// [`SimOneShotHandle::advance_us`].
pub struct SimOneShot {
    state: Arc<Mutex<OneShotState>>,
    max_duration_us: u32,
}

/// Test-side view of a [`SimOneShot`].
#[derive(Clone)]
pub struct SimOneShotHandle {
    state: Arc<Mutex<OneShotState>>,
}

impl SimOneShot {
    pub fn new(max_duration_us: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(OneShotState::default())),
            max_duration_us,
        }
    }

    pub fn handle(&self) -> SimOneShotHandle {
        SimOneShotHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut OneShotState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }
}

impl ArmTimeout for SimOneShot {
    fn start_once(&mut self, duration_us: u32) -> Result<(), DriverError> {
        self.with_state(|s| {
            s.running = true;
            s.remaining_us = duration_us;
            s.starts += 1;
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.with_state(|s| s.running = false);
    }

    fn clear_pending(&mut self) {
        self.with_state(|s| s.pending = false);
    }

    fn max_duration_us(&self) -> u32 {
        self.max_duration_us
    }
}

impl SimOneShotHandle {
    fn with_state<R>(&self, f: impl FnOnce(&mut OneShotState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut state)
    }

    /// Let `us` microseconds pass.  Returns `true` if the countdown ran out
    /// during this step, i.e. the expiry interrupt should fire now.
    pub fn advance_us(&self, us: u32) -> bool {
        self.with_state(|s| {
            if !s.running {
                return false;
            }
            if us >= s.remaining_us {
                s.running = false;
                s.remaining_us = 0;
                s.pending = true;
                true
            } else {
                s.remaining_us -= us;
                false
            }
        })
    }

    /// Time left on a running countdown.
    pub fn remaining_us(&self) -> Option<u32> {
        self.with_state(|s| s.running.then_some(s.remaining_us))
    }

    pub fn is_pending(&self) -> bool {
        self.with_state(|s| s.pending)
    }

    /// Number of `start_once` calls so far.
    pub fn starts(&self) -> u32 {
        self.with_state(|s| s.starts)
    }
}

// ── Counter registers ─────────────────────────────────────────

#[derive(Debug, Default)]
struct Registers {
    top: u16,
    compare: u16,
    connected: bool,
    running: bool,
}

/// Simulated 16-bit counter register block.
#[derive(Clone, Default)]
pub struct SimCounterRegisters {
    regs: Arc<Mutex<Registers>>,
}

impl SimCounterRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_regs<R>(&self, f: impl FnOnce(&mut Registers) -> R) -> R {
        let mut regs = self.regs.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut regs)
    }

    pub fn top(&self) -> u16 {
        self.with_regs(|r| r.top)
    }

    pub fn compare(&self) -> u16 {
        self.with_regs(|r| r.compare)
    }

    pub fn running(&self) -> bool {
        self.with_regs(|r| r.running)
    }

    pub fn output_connected(&self) -> bool {
        self.with_regs(|r| r.connected)
    }
}

impl CounterRegisters for SimCounterRegisters {
    fn stop(&mut self) {
        self.with_regs(|r| r.running = false);
    }

    fn set_top(&mut self, top: u16) {
        self.with_regs(|r| r.top = top);
    }

    fn set_compare(&mut self, value: u16) {
        self.with_regs(|r| r.compare = value);
    }

    fn connect_output(&mut self) {
        self.with_regs(|r| r.connected = true);
    }

    fn start(&mut self) {
        self.with_regs(|r| r.running = true);
    }
}

// ── GPIO ──────────────────────────────────────────────────────

/// A digital line that is both driven and read back.
#[derive(Clone, Debug)]
pub struct SimPin {
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(high)),
        }
    }

    /// Current line level (`true` = high).
    pub fn level(&self) -> bool {
        self.level.load(Ordering::Acquire)
    }

    /// Force the line level, e.g. to emulate the far end driving it.
    pub fn set_level(&self, high: bool) {
        self.level.store(high, Ordering::Release);
    }
}

impl DigitalErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set_level(true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

// ── PWM channel ───────────────────────────────────────────────

/// Simulated HAL PWM channel with a fixed resolution.
#[derive(Clone, Debug)]
pub struct SimPwmChannel {
    duty: Arc<AtomicU32>,
    max: u16,
}

impl SimPwmChannel {
    pub fn new(max: u16) -> Self {
        Self {
            duty: Arc::new(AtomicU32::new(0)),
            max,
        }
    }

    pub fn duty(&self) -> u32 {
        self.duty.load(Ordering::Acquire)
    }
}

impl PwmErrorType for SimPwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        self.max
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.duty.store(u32::from(duty.min(self.max)), Ordering::Release);
        Ok(())
    }
}
