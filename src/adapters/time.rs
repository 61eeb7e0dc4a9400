//! Monotonic system clock.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()` (µs since boot).
//! - **`not(target_os = "espidf")`** uses `std::time::Instant`.
//!
//! Both reads come from the same source here, so the two-clock skew the
//! `MixedClocks` accounting is sensitive to never appears on this adapter.

use crate::app::ports::Clock;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    #[cfg(target_os = "espidf")]
    fn now_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time has no preconditions once the system
        // timer is running, which it is before app_main.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn now_ms(&self) -> u64 {
        self.now_us() / 1_000
    }
}
