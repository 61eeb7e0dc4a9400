//! Fuzz target: `LaserConfig::from_json`
//!
//! Any byte string either fails with a `ConfigError` or yields a config
//! that passes validation again and can initialise simulated hardware
//! when its backend matches.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use laserfw::adapters::hardware::LaserHardware;
use laserfw::adapters::sim::{SimCounterRegisters, SimOneShot};
use laserfw::config::{LaserConfig, PwmBackendKind};
use laserfw::drivers::pwm::TimerRegisterPwm;

fuzz_target!(|data: &[u8]| {
    let Ok(config) = LaserConfig::from_json(data) else {
        return;
    };
    assert!(config.validate().is_ok());

    if config.backend == PwmBackendKind::TimerRegister {
        let mut hw = LaserHardware::new(
            TimerRegisterPwm::new(SimCounterRegisters::new(), config.counter_clock_hz),
            SimOneShot::new(config.max_pulse_us),
        );
        assert!(hw.initialize(&config).is_ok());
        assert_eq!(hw.pwm().max_count(), config.counter_top());
    }
});
