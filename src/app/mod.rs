//! Application core: pure domain logic, zero I/O.
//!
//! The laser service, its commands and diagnostic events.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
