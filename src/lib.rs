//! Laser firing core.
//!
//! Exposes the laser state machine, its drivers and the peripheral
//! interlock for the firmware binary and for host-side testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod interlock;
pub mod laser;
pub mod pins;

pub mod adapters;
pub mod drivers;
