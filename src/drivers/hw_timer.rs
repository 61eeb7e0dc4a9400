//! One-shot pulse timer on ESP-IDF's `esp_timer`.
//!
//! The timer is created with ISR dispatch so the expiry callback runs in
//! interrupt context, not in the esp_timer task.  The callback is supplied
//! by the firmware binary and must only call
//! `LaserHardware::on_pulse_timeout`.
//!
//! That callback reaches the LEDC duty write (`set_duty_cycle`) from the
//! ISR, so the build needs these options (shipped in `sdkconfig.defaults`):
//!
//! - `CONFIG_ESP_TIMER_SUPPORTS_ISR_DISPATCH_METHOD=y`: without it
//!   `esp_timer_create` rejects `ESP_TIMER_ISR` and boot fails with
//!   `TimerCreateFailed`.
//! - `CONFIG_LEDC_CTRL_FUNC_IN_IRAM=y`: the LEDC control functions must be
//!   callable while the flash cache is disabled.

use core::ffi::c_void;

use esp_idf_svc::sys::*;
use log::info;

use crate::app::ports::ArmTimeout;
use crate::error::DriverError;

/// Expiry callback signature expected by `esp_timer`.
pub type ExpiryCallback = unsafe extern "C" fn(arg: *mut c_void);

pub struct EspOneShot {
    handle: esp_timer_handle_t,
    max_duration_us: u32,
}

// SAFETY: the handle is an opaque pointer owned by esp_timer; the API is
// thread safe and every call on it goes through a critical section.
unsafe impl Send for EspOneShot {}

impl EspOneShot {
    pub fn new(callback: ExpiryCallback, max_duration_us: u32) -> Result<Self, DriverError> {
        let args = esp_timer_create_args_t {
            callback: Some(callback),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_ISR,
            name: c"laser_pulse".as_ptr(),
            skip_unhandled_events: true,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: `args` outlives the call and `handle` is a valid out-pointer.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK {
            return Err(DriverError::TimerCreateFailed(ret));
        }
        info!("hw_timer: pulse one-shot ready (max {} us)", max_duration_us);
        Ok(Self {
            handle,
            max_duration_us,
        })
    }
}

impl ArmTimeout for EspOneShot {
    fn start_once(&mut self, duration_us: u32) -> Result<(), DriverError> {
        // SAFETY: handle was returned by esp_timer_create and never deleted.
        let ret = unsafe { esp_timer_start_once(self.handle, u64::from(duration_us)) };
        if ret != ESP_OK {
            return Err(DriverError::TimerStartFailed(ret));
        }
        Ok(())
    }

    fn stop(&mut self) {
        // ESP_ERR_INVALID_STATE just means it was not running.
        // SAFETY: see start_once.
        unsafe {
            esp_timer_stop(self.handle);
        }
    }

    fn clear_pending(&mut self) {
        // esp_timer drops an undelivered callback on stop; nothing latches.
    }

    fn max_duration_us(&self) -> u32 {
        self.max_duration_us
    }
}

impl Drop for EspOneShot {
    fn drop(&mut self) {
        // SAFETY: handle is valid; stop before delete as esp_timer requires.
        unsafe {
            esp_timer_stop(self.handle);
            esp_timer_delete(self.handle);
        }
    }
}
