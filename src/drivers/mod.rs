//! Laser drivers: waveform generation and the hardware pulse cut-off.

#[cfg(target_os = "espidf")]
pub mod hw_timer;
pub mod pulse_guard;
pub mod pwm;
