//! Fuzz target: laser operation sequences
//!
//! Decodes the input as a stream of 6-byte operations (fire, pulse,
//! extinguish, mode, time advance, pulse expiry) and checks after each:
//! - No panics under arbitrary input, including NaN intensities
//! - Stored intensity stays in [0, 100]
//! - Duty never exceeds the programmed period
//! - Duty is zero and no pulse is pending while the laser is off
//!
//! cargo fuzz run fuzz_laser_ops

#![no_main]

use libfuzzer_sys::fuzz_target;
use laserfw::adapters::hardware::LaserHardware;
use laserfw::adapters::sim::{SimClock, SimCounterRegisters, SimOneShot, SimPin};
use laserfw::app::events::LaserEvent;
use laserfw::app::ports::EventSink;
use laserfw::app::service::LaserService;
use laserfw::config::LaserConfig;
use laserfw::drivers::pwm::TimerRegisterPwm;
use laserfw::laser::Firing;

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &LaserEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let config = LaserConfig::default();
    let timer = SimOneShot::new(config.max_pulse_us);
    let pulse = timer.handle();
    let mut hw = LaserHardware::new(
        TimerRegisterPwm::new(SimCounterRegisters::new(), config.counter_clock_hz),
        timer,
    );
    if hw.initialize(&config).is_err() {
        return;
    }
    let mut svc: LaserService<'_, _, _, SimPin, SimPin> = LaserService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = NullSink;

    for op in data.chunks_exact(6) {
        let arg = f32::from_le_bytes([op[1], op[2], op[3], op[4]]);
        let small = u32::from(u16::from_le_bytes([op[4], op[5]]));
        match op[0] % 6 {
            0 => svc.fire(arg, &clock, &mut sink),
            1 => svc.fire_pulse(arg, small, &clock, &mut sink),
            2 => svc.extinguish(&clock, &mut sink),
            3 => svc.set_mode(i32::from(op[1] as i8)),
            4 => {
                clock.advance_us(u64::from(small));
                if pulse.advance_us(small) {
                    hw.on_pulse_timeout();
                }
            }
            _ => svc.service_events(&clock, &mut sink),
        }

        let state = svc.state();
        assert!((0.0..=100.0).contains(&state.intensity()));
        assert!(hw.pwm().duty() <= hw.pwm().max_count());
        if state.firing() == Firing::Off {
            assert_eq!(hw.pwm().duty(), 0);
            assert!(!hw.guard().is_armed());
        }
    }
});
