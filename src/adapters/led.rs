//! Status LED adapter.
//!
//! The LED toggles from a periodic `esp_timer`, so it keeps blinking while
//! the wake cycle blocks on wifi association. The LED is active LOW.

use crate::app::ports::IndicatorPort;

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};

    use esp_idf_svc::sys::*;
    use log::warn;

    use crate::error::Error;
    use crate::pins;

    static LIT: AtomicBool = AtomicBool::new(false);

    fn drive(lit: bool) {
        LIT.store(lit, Ordering::Relaxed);
        // SAFETY: LED_GPIO was configured as an output in `StatusLed::new`.
        unsafe {
            gpio_set_level(pins::LED_GPIO, u32::from(!lit));
        }
    }

    unsafe extern "C" fn on_toggle(_arg: *mut core::ffi::c_void) {
        drive(!LIT.load(Ordering::Relaxed));
    }

    pub struct StatusLed {
        handle: esp_timer_handle_t,
        period_ms: u32,
    }

    impl StatusLed {
        pub fn new() -> Result<Self, Error> {
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pins::LED_GPIO,
                mode: gpio_mode_t_GPIO_MODE_OUTPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
            };
            // SAFETY: `cfg` outlives the call.
            let ret = unsafe { gpio_config(&cfg) };
            if ret != ESP_OK as i32 {
                return Err(Error::Init("LED GPIO config failed"));
            }
            drive(false);

            let args = esp_timer_create_args_t {
                callback: Some(on_toggle),
                arg: core::ptr::null_mut(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"led".as_ptr(),
                skip_unhandled_events: true,
            };
            let mut handle: esp_timer_handle_t = core::ptr::null_mut();
            // SAFETY: `args` outlives the call; `handle` receives the new timer.
            let ret = unsafe { esp_timer_create(&args, &raw mut handle) };
            if ret != ESP_OK as i32 {
                return Err(Error::Init("LED timer create failed"));
            }
            Ok(Self { handle, period_ms: 0 })
        }
    }

    impl IndicatorPort for StatusLed {
        fn blink(&mut self, period_ms: u32) {
            if period_ms == self.period_ms {
                return;
            }
            // SAFETY: handle is valid for the lifetime of `self`; stopping an
            // idle timer only returns an error code.
            unsafe {
                esp_timer_stop(self.handle);
            }
            self.period_ms = period_ms;
            if period_ms == 0 {
                drive(false);
                return;
            }
            // SAFETY: as above.
            let ret = unsafe { esp_timer_start_periodic(self.handle, u64::from(period_ms) * 1_000) };
            if ret != ESP_OK as i32 {
                warn!("LED: timer start failed (rc={})", ret);
            }
        }
    }

    impl Drop for StatusLed {
        fn drop(&mut self) {
            // SAFETY: handle came from esp_timer_create and is deleted once.
            unsafe {
                esp_timer_stop(self.handle);
                esp_timer_delete(self.handle);
            }
            drive(false);
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::StatusLed;

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// Records every blink request.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct SimIndicator {
    pub history: Vec<u32>,
}

#[cfg(not(target_os = "espidf"))]
impl SimIndicator {
    pub fn current(&self) -> u32 {
        self.history.last().copied().unwrap_or(0)
    }
}

#[cfg(not(target_os = "espidf"))]
impl IndicatorPort for SimIndicator {
    fn blink(&mut self, period_ms: u32) {
        log::trace!("LED(sim): period {} ms", period_ms);
        self.history.push(period_ms);
    }
}
