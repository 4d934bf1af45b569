//! One-shot timer adapter (DS18B20 conversion wait).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_timer` one-shot; the callback runs in
//!   the esp_timer task and posts onto the global [`EVENTS`] queue.
//! - **all other targets**: posts the event immediately and records the
//!   requested delay.
//!
//! [`EVENTS`]: crate::events::EVENTS

use core::time::Duration;

use crate::app::ports::OneShotTimer;
use crate::events::Event;

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;
    use std::sync::Mutex;

    use esp_idf_svc::sys::*;
    use log::{error, warn};

    use crate::error::Error;
    use crate::events::post_global;

    /// Event delivered by the next shot.
    static PENDING: Mutex<Option<Event>> = Mutex::new(None);

    unsafe extern "C" fn on_fire(_arg: *mut core::ffi::c_void) {
        let event = PENDING.lock().ok().and_then(|mut pending| pending.take());
        if let Some(event) = event {
            post_global(event);
        }
    }

    pub struct EspOneShotTimer {
        handle: esp_timer_handle_t,
    }

    impl EspOneShotTimer {
        pub fn new() -> Result<Self, Error> {
            let args = esp_timer_create_args_t {
                callback: Some(on_fire),
                arg: core::ptr::null_mut(),
                dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                name: c"conversion".as_ptr(),
                skip_unhandled_events: false,
            };
            let mut handle: esp_timer_handle_t = core::ptr::null_mut();
            // SAFETY: `args` outlives the call; `handle` receives the new timer.
            let ret = unsafe { esp_timer_create(&args, &mut handle) };
            if ret != ESP_OK as i32 {
                return Err(Error::Init("esp_timer_create failed"));
            }
            Ok(Self { handle })
        }

        fn cancel(&mut self) {
            // SAFETY: handle is valid; stopping an idle timer only returns an error code.
            unsafe {
                esp_timer_stop(self.handle);
            }
            if let Ok(mut pending) = PENDING.lock() {
                *pending = None;
            }
        }
    }

    impl OneShotTimer for EspOneShotTimer {
        fn arm(&mut self, after: Duration, event: Event) {
            self.cancel();
            if let Ok(mut pending) = PENDING.lock() {
                *pending = Some(event);
            }
            // SAFETY: handle is valid for the lifetime of `self`.
            let ret = unsafe { esp_timer_start_once(self.handle, after.as_micros() as u64) };
            if ret != ESP_OK as i32 {
                error!("Timer: start failed (rc={}), waiting inline", ret);
                std::thread::sleep(after);
                if let Some(event) = PENDING.lock().ok().and_then(|mut p| p.take()) {
                    post_global(event);
                }
            }
        }

        fn disarm(&mut self) {
            self.cancel();
        }
    }

    impl Drop for EspOneShotTimer {
        fn drop(&mut self) {
            // SAFETY: handle came from esp_timer_create and is deleted once.
            let ret = unsafe {
                esp_timer_stop(self.handle);
                esp_timer_delete(self.handle)
            };
            if ret != ESP_OK as i32 {
                warn!("Timer: delete failed (rc={})", ret);
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspOneShotTimer;

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct SimOneShotTimer<'q> {
    events: crate::events::EventSender<'q>,
    /// Every `arm` call, in order.
    pub armed: Vec<(Duration, Event)>,
    pub disarms: u32,
}

#[cfg(not(target_os = "espidf"))]
impl<'q> SimOneShotTimer<'q> {
    pub fn new(events: crate::events::EventSender<'q>) -> Self {
        Self {
            events,
            armed: Vec::new(),
            disarms: 0,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl OneShotTimer for SimOneShotTimer<'_> {
    fn arm(&mut self, after: Duration, event: Event) {
        log::debug!("Timer(sim): {:?} after {:?}, firing now", event, after);
        self.armed.push((after, event));
        crate::events::post(&self.events, event);
    }

    fn disarm(&mut self) {
        self.disarms += 1;
    }
}
