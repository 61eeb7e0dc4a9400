//! Laser duty-cycle driver.
//!
//! [`DutyCycleDriver`] turns an intensity percentage into a duty count and
//! writes it through a [`ProgramDutyCycle`] backend.  The backend sits in a
//! `critical_section::Mutex` because the pulse timeout interrupt writes the
//! same register; an atomic mirror makes the current duty readable without
//! taking the lock.
//!
//! ## Backends
//!
//! | Backend            | Hardware                                  |
//! |--------------------|-------------------------------------------|
//! | `TimerRegisterPwm` | 16-bit up/down counter, TOP + compare     |
//! | `LibraryPwm`       | HAL PWM channel (LEDC) plus an arm output |
//!
//! [`PwmChannel`] picks one of them at initialisation so callers never
//! depend on which is fitted.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use critical_section::Mutex;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{info, warn};

use crate::app::ports::ProgramDutyCycle;
use crate::config::PwmBackendKind;
use crate::error::DriverError;

/// Clamp a requested intensity to `[0, 100]`.  NaN counts as off.
pub fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 100.0)
    }
}

/// `round(intensity / 100 * max_count)` over the clamped intensity.
pub fn duty_count(intensity: f32, max_count: u32) -> u32 {
    let intensity = clamp_intensity(intensity);
    (f64::from(intensity) / 100.0 * f64::from(max_count)).round() as u32
}

// ───────────────────────────────────────────────────────────────
// DutyCycleDriver
// ───────────────────────────────────────────────────────────────

pub struct DutyCycleDriver<B> {
    backend: Mutex<RefCell<B>>,
    max_count: u32,
    frequency_hz: u32,
    /// Last count accepted by the backend.
    duty: AtomicU32,
}

impl<B: ProgramDutyCycle> DutyCycleDriver<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(RefCell::new(backend)),
            max_count: 0,
            frequency_hz: 0,
            duty: AtomicU32::new(0),
        }
    }

    /// Program the waveform period and leave the output at zero duty.
    /// The whole register sequence runs with interrupts suspended.
    pub fn configure(&mut self, frequency_hz: u32) -> Result<(), DriverError> {
        let max_count = critical_section::with(|cs| {
            let mut backend = self.backend.borrow_ref_mut(cs);
            let max_count = backend.program_frequency(frequency_hz)?;
            backend.write_duty(0)?;
            Ok::<u32, DriverError>(max_count)
        })?;

        self.max_count = max_count;
        self.frequency_hz = frequency_hz;
        self.duty.store(0, Ordering::Release);
        info!(
            "pwm: {:?} backend at {} Hz (max count {})",
            self.kind(),
            frequency_hz,
            max_count
        );
        Ok(())
    }

    /// Map `intensity_percent` onto the duty register.  Out-of-range input
    /// is clamped; a backend write failure is logged and the old duty stays.
    pub fn set_duty(&self, intensity_percent: f32) {
        let count = duty_count(intensity_percent, self.max_count);
        if let Err(e) = self.write_count(count) {
            warn!("pwm: duty write {} failed: {}", count, e);
        }
    }

    /// Zero the duty register from the main context.
    pub fn zero(&self) {
        if let Err(e) = self.write_count(0) {
            warn!("pwm: zero duty failed: {}", e);
        }
    }

    /// Zero the duty register from interrupt context.  No logging.
    pub fn zero_from_isr(&self) {
        let _ = self.write_count(0);
    }

    /// Duty count currently loaded.
    pub fn duty(&self) -> u32 {
        self.duty.load(Ordering::Acquire)
    }

    /// Duty count that means 100 %.  Zero until [`configure`](Self::configure).
    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn frequency_hz(&self) -> u32 {
        self.frequency_hz
    }

    pub fn kind(&self) -> PwmBackendKind {
        critical_section::with(|cs| self.backend.borrow_ref(cs).kind())
    }

    fn write_count(&self, count: u32) -> Result<(), DriverError> {
        critical_section::with(|cs| {
            self.backend.borrow_ref_mut(cs).write_duty(count)?;
            self.duty.store(count, Ordering::Release);
            Ok(())
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Direct counter backend
// ───────────────────────────────────────────────────────────────

/// Register block of a 16-bit phase and frequency correct PWM counter.
pub trait CounterRegisters {
    /// Remove the clock source.
    fn stop(&mut self);
    fn set_top(&mut self, top: u16);
    fn set_compare(&mut self, value: u16);
    /// Route the compare match to the output pin.
    fn connect_output(&mut self);
    /// Attach the clock source (no prescaler).
    fn start(&mut self);
}

/// Direct timer-register backend: `TOP = clock / frequency / 2`.
pub struct TimerRegisterPwm<R> {
    regs: R,
    clock_hz: u32,
    top: u16,
}

impl<R: CounterRegisters> TimerRegisterPwm<R> {
    pub fn new(regs: R, clock_hz: u32) -> Self {
        Self {
            regs,
            clock_hz,
            top: 0,
        }
    }
}

impl<R: CounterRegisters> ProgramDutyCycle for TimerRegisterPwm<R> {
    fn program_frequency(&mut self, frequency_hz: u32) -> Result<u32, DriverError> {
        if frequency_hz == 0 {
            return Err(DriverError::UnsupportedFrequency(frequency_hz));
        }
        let top = u16::try_from(self.clock_hz / frequency_hz / 2)
            .ok()
            .filter(|top| *top > 0)
            .ok_or(DriverError::UnsupportedFrequency(frequency_hz))?;

        self.regs.stop();
        self.regs.set_top(top);
        self.regs.set_compare(0);
        self.regs.connect_output();
        self.regs.start();

        self.top = top;
        Ok(u32::from(top))
    }

    fn write_duty(&mut self, count: u32) -> Result<(), DriverError> {
        let count = count.min(u32::from(self.top)) as u16;
        self.regs.set_compare(count);
        Ok(())
    }

    fn kind(&self) -> PwmBackendKind {
        PwmBackendKind::TimerRegister
    }
}

// ───────────────────────────────────────────────────────────────
// HAL-assisted backend
// ───────────────────────────────────────────────────────────────

/// Library PWM backend: a HAL channel whose timer was configured by the
/// HAL, plus an arm line held active whenever duty is non-zero.
pub struct LibraryPwm<P, A> {
    pwm: P,
    arm: A,
    /// Frequency the HAL timer was built with.
    frequency_hz: u32,
}

impl<P: SetDutyCycle, A: OutputPin> LibraryPwm<P, A> {
    pub fn new(pwm: P, arm: A, frequency_hz: u32) -> Self {
        Self {
            pwm,
            arm,
            frequency_hz,
        }
    }
}

impl<P: SetDutyCycle, A: OutputPin> ProgramDutyCycle for LibraryPwm<P, A> {
    fn program_frequency(&mut self, frequency_hz: u32) -> Result<u32, DriverError> {
        if frequency_hz != self.frequency_hz {
            return Err(DriverError::UnsupportedFrequency(frequency_hz));
        }
        self.pwm
            .set_duty_cycle_fully_off()
            .map_err(|_| DriverError::PwmWriteFailed)?;
        self.arm.set_low().map_err(|_| DriverError::GpioWriteFailed)?;
        Ok(u32::from(self.pwm.max_duty_cycle()))
    }

    fn write_duty(&mut self, count: u32) -> Result<(), DriverError> {
        let count = count.min(u32::from(self.pwm.max_duty_cycle())) as u16;
        self.pwm
            .set_duty_cycle(count)
            .map_err(|_| DriverError::PwmWriteFailed)?;
        let armed = if count > 0 {
            self.arm.set_high()
        } else {
            self.arm.set_low()
        };
        armed.map_err(|_| DriverError::GpioWriteFailed)
    }

    fn kind(&self) -> PwmBackendKind {
        PwmBackendKind::Library
    }
}

// ───────────────────────────────────────────────────────────────
// Runtime backend selection
// ───────────────────────────────────────────────────────────────

/// The backend chosen at initialisation.
pub enum PwmChannel<R, P, A> {
    TimerRegister(TimerRegisterPwm<R>),
    Library(LibraryPwm<P, A>),
}

impl<R, P, A> ProgramDutyCycle for PwmChannel<R, P, A>
where
    R: CounterRegisters,
    P: SetDutyCycle,
    A: OutputPin,
{
    fn program_frequency(&mut self, frequency_hz: u32) -> Result<u32, DriverError> {
        match self {
            Self::TimerRegister(b) => b.program_frequency(frequency_hz),
            Self::Library(b) => b.program_frequency(frequency_hz),
        }
    }

    fn write_duty(&mut self, count: u32) -> Result<(), DriverError> {
        match self {
            Self::TimerRegister(b) => b.write_duty(count),
            Self::Library(b) => b.write_duty(count),
        }
    }

    fn kind(&self) -> PwmBackendKind {
        match self {
            Self::TimerRegister(b) => b.kind(),
            Self::Library(b) => b.kind(),
        }
    }
}
