//! Laser firmware entry point (ESP32-S3).
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                      │
//! │                                                              │
//! │  LEDC + arm pin     EspOneShot      SystemClock  LogEventSink│
//! │  (ProgramDutyCycle) (ArmTimeout)    (Clock)      (EventSink) │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ──────────────────      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │        LaserService (pure logic)                   │      │
//! │  │  Laser state machine · Peripheral interlock        │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  esp_timer ISR ─▶ LaserHardware::on_pulse_timeout            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::ffi::c_void;
use std::sync::OnceLock;

use anyhow::{Result, bail};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{Gpio7, Output, Pin, PinDriver, Pull};
use esp_idf_hal::ledc::config::TimerConfig;
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info};

use laserfw::adapters::hardware::LaserHardware;
use laserfw::adapters::log_sink::LogEventSink;
use laserfw::adapters::time::SystemClock;
use laserfw::app::ports::EmergencyStop;
use laserfw::app::service::LaserService;
use laserfw::config::{FittedPins, LaserConfig, PeripheralsConfig, PwmBackendKind};
use laserfw::drivers::hw_timer::EspOneShot;
use laserfw::drivers::pwm::LibraryPwm;
use laserfw::interlock::PeripheralInterlock;

type BoardPwm = LibraryPwm<LedcDriver<'static>, PinDriver<'static, Gpio7, Output>>;
type BoardHardware = LaserHardware<BoardPwm, EspOneShot>;

/// Shared with the pulse timeout ISR.
static LASER_HW: OnceLock<BoardHardware> = OnceLock::new();

/// esp_timer ISR dispatch callback.
unsafe extern "C" fn pulse_timeout_isr(_arg: *mut c_void) {
    if let Some(hw) = LASER_HW.get() {
        hw.on_pulse_timeout();
    }
}

/// Firmware-wide stop: laser dark, then halt until reset.
struct HaltStop;

impl EmergencyStop for HaltStop {
    fn emergency_stop(&mut self, reason: &'static str) {
        if let Some(hw) = LASER_HW.get() {
            hw.pwm().zero();
            hw.guard().disarm();
        }
        error!("EMERGENCY STOP: {} (halted, reset required)", reason);
        loop {
            FreeRtos::delay_ms(1_000);
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("laserfw v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = LaserConfig {
        backend: PwmBackendKind::Library,
        peripherals: Some(PeripheralsConfig::default()),
        ..LaserConfig::default()
    };
    config.validate().map_err(anyhow::Error::msg)?;
    if config.backend != PwmBackendKind::Library {
        // No direct counter register block on this chip.
        bail!("{:?} backend is not available on this board", config.backend);
    }

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let board = &peripherals.pins;
    config
        .check_pins(&FittedPins {
            pwm_output: Some(i32::from(board.gpio6.pin())),
            arm: Some(i32::from(board.gpio7.pin())),
            peripherals_enable: Some(i32::from(board.gpio40.pin())),
            peripherals_status: Some(i32::from(board.gpio41.pin())),
        })
        .map_err(anyhow::Error::msg)?;

    let ledc_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(Hertz(config.pwm_frequency_hz))
            .resolution(Resolution::Bits12),
    )?;
    let intensity = LedcDriver::new(peripherals.ledc.channel0, ledc_timer, peripherals.pins.gpio6)?;
    let arm = PinDriver::output(peripherals.pins.gpio7)?;

    let enable = PinDriver::output(peripherals.pins.gpio40)?;
    let mut status = PinDriver::input(peripherals.pins.gpio41)?;
    status.set_pull(Pull::Up)?;
    let interlock = PeripheralInterlock::new(enable, status);

    // ── 4. Laser hardware ─────────────────────────────────────
    let timer = EspOneShot::new(pulse_timeout_isr, config.max_pulse_us)
        .map_err(anyhow::Error::msg)?;
    let mut hw = LaserHardware::new(
        LibraryPwm::new(intensity, arm, config.pwm_frequency_hz),
        timer,
    );
    hw.initialize(&config)?;
    if LASER_HW.set(hw).is_err() {
        bail!("laser hardware initialised twice");
    }
    let Some(hw) = LASER_HW.get() else {
        bail!("laser hardware missing after init");
    };

    // ── 5. Service ────────────────────────────────────────────
    let clock = SystemClock::new();
    let mut sink = LogEventSink::new();
    let mut estop = HaltStop;
    let mut laser = LaserService::new(hw, &config, Some(interlock));

    laser.peripherals_enable(&mut sink);
    laser.wait_for_peripherals(&clock, &mut estop, &mut sink)?;

    info!("Laser ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    // Fire requests arrive from the motion planner through
    // `LaserService::handle_command`; this loop only drains ISR events.
    loop {
        laser.service_events(&clock, &mut sink);
        FreeRtos::delay_ms(10);
    }
}
