//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements                    | Connects to            |
//! |------------|-------------------------------|------------------------|
//! | `hardware` | (owns ProgramDutyCycle,       | PWM backend, one-shot  |
//! |            |  ArmTimeout, ISR entry)       | timer, event queue     |
//! | `log_sink` | EventSink                     | Serial log output      |
//! | `time`     | Clock                         | ESP32 system timer     |
//! | `sim`      | Clock, ArmTimeout, pins, PWM  | Host simulation        |

pub mod hardware;
pub mod log_sink;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
pub mod time;
