//! Pulse cut-off integration tests.

use laserfw::adapters::sim::SimOneShot;
use laserfw::config::LaserConfig;
use laserfw::drivers::pulse_guard::PulseTimeoutGuard;

use crate::mock_hw::register_hw;

#[test]
fn rearm_clears_latched_expiry() {
    let timer = SimOneShot::new(32_767);
    let handle = timer.handle();
    let guard = PulseTimeoutGuard::new(timer);

    guard.arm(1_000).unwrap();
    assert!(handle.advance_us(1_000));
    assert!(handle.is_pending());

    // The stale expiry must not cut the new pulse.
    guard.arm(1_000).unwrap();
    assert!(!handle.is_pending());
    assert_eq!(handle.remaining_us(), Some(1_000));
    assert_eq!(handle.starts(), 2);
}

#[test]
fn overlong_pulse_is_clamped_to_timer_range() {
    let config = LaserConfig {
        max_pulse_us: 5_000,
        ..LaserConfig::default()
    };
    let (hw, _, timer) = register_hw(&config);

    assert_eq!(hw.guard().arm(60_000), Ok(5_000));
    assert!(!timer.advance_us(4_999));
    assert!(timer.advance_us(1));
}

#[test]
fn interrupt_without_pulse_is_harmless() {
    let (hw, regs, _) = register_hw(&LaserConfig::default());
    hw.on_pulse_timeout();
    assert_eq!(regs.compare(), 0);
    assert_eq!(hw.guard().expiry_count(), 1);
    assert!(!hw.guard().is_armed());
}

#[test]
fn full_event_queue_still_cuts_the_pulse() {
    let (hw, regs, _) = register_hw(&LaserConfig::default());
    for _ in 0..32 {
        hw.pwm().set_duty(100.0);
        hw.on_pulse_timeout();
        assert_eq!(regs.compare(), 0);
    }
    assert_eq!(hw.guard().expiry_count(), 32);
    assert!(!hw.events().queue_is_empty());
}
