//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the host simulation.  All tests run on the host (x86_64) with
//! no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod interlock_tests;
mod laser_service_tests;
mod pulse_guard_tests;
