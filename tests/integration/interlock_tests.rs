//! Peripheral interlock integration tests.

use laserfw::adapters::sim::{SimClock, SimPin};
use laserfw::interlock::{InterlockError, PeripheralInterlock};

use crate::mock_hw::{CountingEstop, FaultyInput, ReadyAfter};

#[test]
fn read_error_counts_as_not_ready() {
    let mut il = PeripheralInterlock::new(SimPin::new(false), FaultyInput);
    assert!(!il.ok());
    assert!(!il.disable());
}

#[test]
fn read_error_times_out() {
    let mut il = PeripheralInterlock::new(SimPin::new(false), FaultyInput);
    let clock = SimClock::with_step(500);
    let mut estop = CountingEstop::default();

    assert!(matches!(
        il.wait_ready(10, &clock, &mut estop),
        Err(InterlockError::Timeout { .. })
    ));
    assert_eq!(estop.calls, 1);
    assert_eq!(estop.last_reason, Some("peripherals not ready"));
}

#[test]
fn becomes_ready_before_deadline() {
    let mut il = PeripheralInterlock::new(SimPin::new(false), ReadyAfter::new(5));
    // 1 ms per clock read; ready after five polls, well inside 100 ms.
    let clock = SimClock::with_step(1_000);
    let mut estop = CountingEstop::default();

    assert_eq!(il.wait_ready(100, &clock, &mut estop), Ok(()));
    assert_eq!(estop.calls, 0);
}

#[test]
fn readiness_wins_over_elapsed_deadline() {
    // Second pass starts with the clock already at 18 ms; the status read
    // comes first, so a ready board is never reported as a timeout.
    let mut il = PeripheralInterlock::new(SimPin::new(false), ReadyAfter::new(1));
    let clock = SimClock::with_step(9_000);
    let mut estop = CountingEstop::default();

    assert_eq!(il.wait_ready(10, &clock, &mut estop), Ok(()));
    assert_eq!(estop.calls, 0);
}

#[test]
fn zero_timeout_stops_immediately_when_not_ready() {
    let mut il = PeripheralInterlock::new(SimPin::new(false), SimPin::new(true));
    let clock = SimClock::new();
    let mut estop = CountingEstop::default();

    assert_eq!(
        il.wait_ready(0, &clock, &mut estop),
        Err(InterlockError::Timeout { waited_ms: 0 })
    );
    assert_eq!(estop.calls, 1);
}

#[test]
fn timeout_error_displays_wait() {
    let e = InterlockError::Timeout { waited_ms: 30_000 };
    assert_eq!(e.to_string(), "peripherals not ready after 30000 ms");
}
