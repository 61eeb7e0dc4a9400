//! LaserService integration tests.
//!
//! Full firing, pulse and interlock flows against the host simulation.

use laserfw::adapters::sim::{SimClock, SimPin};
use laserfw::app::commands::LaserCommand;
use laserfw::app::events::LaserEvent;
use laserfw::config::{LaserConfig, PeripheralsConfig};
use laserfw::interlock::{InterlockError, PeripheralInterlock};
use laserfw::laser::{Firing, LaserMode};

use crate::mock_hw::{
    CountingEstop, MockService, RecordingSink, library_hw, register_hw, sim_interlock,
};

fn config_500hz() -> LaserConfig {
    LaserConfig {
        pwm_frequency_hz: 500,
        ..LaserConfig::default()
    }
}

// ── Firing ────────────────────────────────────────────────────

#[test]
fn half_power_at_500hz() {
    let config = config_500hz();
    let (hw, regs, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire(50.0, &clock, &mut sink);

    assert_eq!(hw.pwm().max_count(), 16_000);
    assert!(regs.compare().abs_diff(8_000) <= 1);
    assert_eq!(svc.state().firing(), Firing::On);
}

#[test]
fn out_of_range_intensity_is_clamped() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire(140.0, &clock, &mut sink);
    assert_eq!(svc.state().intensity(), 100.0);
    assert_eq!(hw.pwm().duty(), 16_000);

    svc.fire(-3.0, &clock, &mut sink);
    assert_eq!(svc.state().intensity(), 0.0);
    assert_eq!(hw.pwm().duty(), 0);

    svc.fire(f32::NAN, &clock, &mut sink);
    assert_eq!(svc.state().intensity(), 0.0);
}

#[test]
fn refire_while_on_keeps_timestamp() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    clock.set_us(2_000);
    svc.fire(30.0, &clock, &mut sink);
    clock.set_us(7_000);
    svc.fire(80.0, &clock, &mut sink);

    assert_eq!(svc.state().last_firing_us(), 2_000);
    assert_eq!(hw.pwm().duty(), 12_800);
}

#[test]
fn extinguish_twice_accumulates_once() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire(40.0, &clock, &mut sink);
    clock.advance_ms(75);
    svc.extinguish(&clock, &mut sink);
    clock.advance_ms(500);
    svc.extinguish(&clock, &mut sink);

    assert_eq!(svc.state().active_time_ms(), 75);
    assert_eq!(svc.state().firing(), Firing::Off);
    assert_eq!(hw.pwm().duty(), 0);
}

#[test]
fn both_backends_agree_on_duty() {
    let config = config_500hz();
    let (reg_hw, _, _) = register_hw(&config);
    let (lib_hw, channel, arm, _) = library_hw(&config, 16_000);

    for intensity in [0.0, 0.01, 12.5, 33.3, 50.0, 99.99, 100.0] {
        reg_hw.pwm().set_duty(intensity);
        lib_hw.pwm().set_duty(intensity);
        assert_eq!(reg_hw.pwm().duty(), lib_hw.pwm().duty(), "intensity {intensity}");
        assert_eq!(channel.duty(), lib_hw.pwm().duty());
        assert_eq!(arm.level(), lib_hw.pwm().duty() > 0);
    }
}

// ── Pulses ────────────────────────────────────────────────────

#[test]
fn pulse_is_cut_by_interrupt() {
    let config = config_500hz();
    let (hw, regs, timer) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire_pulse(100.0, 20_000, &clock, &mut sink);
    assert_eq!(regs.compare(), 16_000);
    assert!(hw.guard().is_armed());
    assert_eq!(svc.state().duration_us, 20_000);

    assert!(!timer.advance_us(19_999));
    assert_eq!(regs.compare(), 16_000);
    assert!(timer.advance_us(1));
    clock.advance_us(20_000);
    hw.on_pulse_timeout();

    assert_eq!(regs.compare(), 0);
    assert_eq!(hw.pwm().duty(), 0);
    assert!(!hw.guard().is_armed());
    assert_eq!(hw.guard().expiry_count(), 1);
    // The interrupt only cuts the output; the main loop ends the pulse.
    assert_eq!(svc.state().firing(), Firing::On);

    svc.service_events(&clock, &mut sink);
    assert_eq!(svc.state().firing(), Firing::Off);
    assert_eq!(svc.state().active_time_ms(), 20);
}

#[test]
fn late_extinguish_counts_only_the_pulse() {
    let config = config_500hz();
    let (hw, _, timer) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire_pulse(100.0, 1_000, &clock, &mut sink);
    clock.advance_us(1_000);
    assert!(timer.advance_us(1_000));
    hw.on_pulse_timeout();

    clock.advance_ms(10_000);
    svc.extinguish(&clock, &mut sink);

    assert_eq!(svc.state().firing(), Firing::Off);
    assert_eq!(svc.state().active_time_ms(), 1);
}

#[test]
fn latched_expiry_does_not_cut_next_pulse() {
    let config = config_500hz();
    let (hw, regs, timer) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire_pulse(50.0, 1_000, &clock, &mut sink);
    // Runs out while interrupts are held off: latched, not yet serviced.
    assert!(timer.advance_us(1_000));
    assert!(timer.is_pending());

    svc.fire_pulse(80.0, 1_000, &clock, &mut sink);
    assert!(!timer.is_pending());

    assert_eq!(regs.compare(), 12_800);
    assert_eq!(hw.pwm().duty(), 12_800);
    assert!(hw.guard().is_armed());
    assert!(svc.state().is_firing());
}

#[test]
fn rearm_before_expiry_extends_pulse() {
    let config = config_500hz();
    let (hw, regs, timer) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire_pulse(60.0, 10_000, &clock, &mut sink);
    assert!(!timer.advance_us(6_000));
    svc.fire_pulse(60.0, 10_000, &clock, &mut sink);
    assert!(!timer.advance_us(6_000));

    assert!(hw.guard().is_armed());
    assert_eq!(regs.compare(), 9_600);
    assert!(timer.advance_us(4_000));
}

#[test]
fn extinguish_cancels_pending_pulse() {
    let config = config_500hz();
    let (hw, _, timer) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire_pulse(60.0, 10_000, &clock, &mut sink);
    svc.extinguish(&clock, &mut sink);

    assert!(!hw.guard().is_armed());
    assert!(!timer.advance_us(20_000));
}

// ── Modes and diagnostics ─────────────────────────────────────

#[test]
fn invalid_mode_code_changes_nothing() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);

    svc.set_mode(1);
    let before = svc.state().clone();
    svc.set_mode(9);
    assert_eq!(svc.state(), &before);
    assert_eq!(svc.state().mode(), LaserMode::Pulsed);
}

#[test]
fn diagnostics_follow_the_flag() {
    let config = config_500hz();
    let (hw, _, timer) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut sink = RecordingSink::new();

    svc.fire(10.0, &clock, &mut sink);
    svc.extinguish(&clock, &mut sink);
    assert!(sink.events.is_empty());

    svc.set_diagnostics(true);
    svc.fire_pulse(25.0, 5_000, &clock, &mut sink);
    assert!(timer.advance_us(5_000));
    clock.advance_us(5_000);
    hw.on_pulse_timeout();
    assert!(!sink.contains(&LaserEvent::PulseExpired));

    svc.service_events(&clock, &mut sink);
    clock.advance_ms(3);
    svc.extinguish(&clock, &mut sink);

    assert_eq!(
        sink.events,
        vec![
            LaserEvent::Fired { intensity: 25.0 },
            LaserEvent::PulseExpired,
            LaserEvent::Extinguished { on_ms: 5 },
        ]
    );
}

#[test]
fn commands_dispatch_to_operations() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut estop = CountingEstop::default();
    let mut sink = RecordingSink::new();

    let script = [
        LaserCommand::SetDiagnostics(true),
        LaserCommand::SetMode(2),
        LaserCommand::Fire { intensity: 75.0 },
        LaserCommand::FirePulse {
            intensity: 75.0,
            duration_us: 1_000,
        },
        LaserCommand::Extinguish,
        LaserCommand::PeripheralsOn,
        LaserCommand::PeripheralsOff,
        LaserCommand::WaitForPeripherals,
    ];
    for cmd in script {
        svc.handle_command(cmd, &clock, &mut estop, &mut sink).unwrap();
    }

    assert_eq!(svc.state().mode(), LaserMode::Raster);
    assert_eq!(svc.state().firing(), Firing::Off);
    assert_eq!(svc.state().duration_us, 1_000);
    assert_eq!(estop.calls, 0);
    assert_eq!(
        sink.events
            .iter()
            .filter(|e| matches!(e, LaserEvent::Fired { .. }))
            .count(),
        2
    );
}

// ── Peripherals ───────────────────────────────────────────────

#[test]
fn no_interlock_means_always_ready() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, None);
    let clock = SimClock::new();
    let mut estop = CountingEstop::default();
    let mut sink = RecordingSink::new();
    svc.set_diagnostics(true);

    assert!(!svc.has_interlock());
    assert!(svc.peripherals_ok());
    svc.peripherals_enable(&mut sink);
    assert!(!svc.peripherals_disable(&mut sink));
    assert_eq!(svc.wait_ready(0, &clock, &mut estop, &mut sink), Ok(()));
    assert!(sink.events.is_empty());
    assert_eq!(estop.calls, 0);
}

#[test]
fn peripheral_enable_and_deferred_disable() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let (interlock, enable, status) = sim_interlock(false);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, Some(interlock));
    let mut sink = RecordingSink::new();
    svc.set_diagnostics(true);

    svc.peripherals_enable(&mut sink);
    assert!(!enable.level());
    assert!(!svc.peripherals_ok());

    assert!(!svc.peripherals_disable(&mut sink));
    assert!(!enable.level());

    status.set_level(false);
    assert!(svc.peripherals_ok());
    assert!(svc.peripherals_disable(&mut sink));
    assert!(enable.level());

    assert_eq!(
        sink.events,
        vec![LaserEvent::PeripheralsEnabled, LaserEvent::PeripheralsDisabled]
    );
}

#[test]
fn configured_timeout_triggers_single_stop() {
    let config = LaserConfig {
        peripherals: Some(PeripheralsConfig {
            timeout_ms: 40,
            ..PeripheralsConfig::default()
        }),
        ..config_500hz()
    };
    let (hw, _, _) = register_hw(&config);
    let (interlock, _, _) = sim_interlock(false);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, Some(interlock));
    let clock = SimClock::with_step(1_000);
    let mut estop = CountingEstop::default();
    let mut sink = RecordingSink::new();
    svc.set_diagnostics(true);

    let result = svc.wait_for_peripherals(&clock, &mut estop, &mut sink);

    let Err(InterlockError::Timeout { waited_ms }) = result else {
        panic!("expected timeout, got {result:?}");
    };
    assert!(waited_ms >= 40);
    assert_eq!(estop.calls, 1);
    assert_eq!(sink.events.first(), Some(&LaserEvent::WaitingForPeripherals));
    assert_eq!(
        sink.events.last(),
        Some(&LaserEvent::PeripheralTimeout { waited_ms })
    );
}

#[test]
fn ready_interlock_does_not_wait() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let (interlock, _, _) = sim_interlock(true);
    let mut svc: MockService<'_> = MockService::new(&hw, &config, Some(interlock));
    let clock = SimClock::new();
    let mut estop = CountingEstop::default();
    let mut sink = RecordingSink::new();
    svc.set_diagnostics(true);

    assert_eq!(
        svc.handle_command(LaserCommand::WaitForPeripherals, &clock, &mut estop, &mut sink),
        Ok(())
    );
    assert!(sink.events.is_empty());
}

#[test]
fn service_accepts_plain_interlock_type() {
    let config = config_500hz();
    let (hw, _, _) = register_hw(&config);
    let interlock = PeripheralInterlock::new(SimPin::new(true), SimPin::new(false));
    let mut svc: MockService<'_> = MockService::new(&hw, &config, Some(interlock));
    assert!(svc.has_interlock());
    assert!(svc.peripherals_ok());
}
