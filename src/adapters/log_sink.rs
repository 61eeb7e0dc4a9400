//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing laser diagnostics to the logger
//! (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::LaserEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`LaserEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LaserEvent) {
        match event {
            LaserEvent::Fired { intensity } => info!("LASER | fired at {:.1}%", intensity),
            LaserEvent::Extinguished { on_ms } => info!("LASER | extinguished after {} ms", on_ms),
            LaserEvent::PulseExpired => info!("LASER | pulse timer expired"),
            LaserEvent::PeripheralsEnabled => info!("PERIPH | enabled"),
            LaserEvent::PeripheralsDisabled => info!("PERIPH | disabled"),
            LaserEvent::WaitingForPeripherals => info!("PERIPH | waiting for ready"),
            LaserEvent::PeripheralTimeout { waited_ms } => {
                warn!("PERIPH | not ready after {} ms, stopping", waited_ms);
            }
        }
    }
}
