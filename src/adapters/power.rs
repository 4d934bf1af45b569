//! Power / sleep controller adapter.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_reset_reason`, ADC1 oneshot read of
//!   the battery divider, `esp_deep_sleep`.
//! - **all other targets**: fixed values; `deep_sleep` ends the process.

use core::time::Duration;

use log::info;

use crate::app::ports::{PowerPort, ResetReason};

/// Full-scale input of the ADC at 12 dB attenuation, in millivolts.
pub const ADC_FULL_SCALE_MV: u32 = 3_100;
const ADC_MAX_RAW: u32 = 4_095;

/// Convert a 12-bit reading of the divided supply to millivolts.
pub fn raw_to_supply_millivolts(raw: u16, divider: u32) -> u32 {
    u32::from(raw.min(ADC_MAX_RAW as u16)) * ADC_FULL_SCALE_MV * divider / ADC_MAX_RAW
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;

    use esp_idf_svc::sys::*;
    use log::warn;

    use crate::error::Error;
    use crate::pins;

    pub struct EspPower {
        adc: adc_oneshot_unit_handle_t,
    }

    impl EspPower {
        pub fn new() -> Result<Self, Error> {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let mut adc: adc_oneshot_unit_handle_t = core::ptr::null_mut();
            // SAFETY: `init_cfg` outlives the call; `adc` receives the unit handle.
            let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut adc) };
            if ret != ESP_OK as i32 {
                return Err(Error::Init("ADC1 unit init failed"));
            }

            let chan_cfg = adc_oneshot_chan_cfg_t {
                atten: adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            // SAFETY: `adc` is the unit created above.
            let ret = unsafe { adc_oneshot_config_channel(adc, pins::SUPPLY_ADC1_CHANNEL, &chan_cfg) };
            if ret != ESP_OK as i32 {
                return Err(Error::Init("ADC1 channel config failed"));
            }
            info!("Power: ADC1 CH{} configured for supply sense", pins::SUPPLY_ADC1_CHANNEL);
            Ok(Self { adc })
        }
    }

    impl PowerPort for EspPower {
        fn supply_millivolts(&self) -> u32 {
            let mut raw: i32 = 0;
            // SAFETY: `self.adc` is a live oneshot unit owned by `self`.
            let ret = unsafe { adc_oneshot_read(self.adc, pins::SUPPLY_ADC1_CHANNEL, &mut raw) };
            if ret != ESP_OK as i32 {
                warn!("Power: supply read failed (rc={})", ret);
                return 0;
            }
            raw_to_supply_millivolts(raw.clamp(0, i32::from(u16::MAX)) as u16, pins::SUPPLY_DIVIDER)
        }

        fn reset_reason(&self) -> ResetReason {
            // SAFETY: reads a value latched by the ROM at boot.
            let reason = unsafe { esp_reset_reason() };
            #[allow(non_upper_case_globals)]
            match reason {
                esp_reset_reason_t_ESP_RST_POWERON => ResetReason::PowerOn,
                esp_reset_reason_t_ESP_RST_DEEPSLEEP => ResetReason::DeepSleep,
                esp_reset_reason_t_ESP_RST_INT_WDT
                | esp_reset_reason_t_ESP_RST_TASK_WDT
                | esp_reset_reason_t_ESP_RST_WDT => ResetReason::Watchdog,
                esp_reset_reason_t_ESP_RST_BROWNOUT => ResetReason::Brownout,
                esp_reset_reason_t_ESP_RST_SW => ResetReason::Software,
                esp_reset_reason_t_ESP_RST_PANIC => ResetReason::Panic,
                _ => ResetReason::Other,
            }
        }

        #[allow(unreachable_code)]
        fn deep_sleep(&mut self, duration: Duration) -> ! {
            info!("Power: deep sleep for {} s", duration.as_secs());
            // SAFETY: `adc` was created by adc_oneshot_new_unit and is not used again.
            unsafe {
                adc_oneshot_del_unit(self.adc);
                esp_deep_sleep(duration.as_micros() as u64);
            }
            loop {
                core::hint::spin_loop();
            }
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::EspPower;

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimPower {
    pub millivolts: u32,
    pub reason: ResetReason,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimPower {
    fn default() -> Self {
        Self {
            millivolts: 3_012,
            reason: ResetReason::DeepSleep,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl PowerPort for SimPower {
    fn supply_millivolts(&self) -> u32 {
        self.millivolts
    }

    fn reset_reason(&self) -> ResetReason {
        self.reason
    }

    fn deep_sleep(&mut self, duration: Duration) -> ! {
        info!("Power(sim): deep sleep for {} s, exiting", duration.as_secs());
        std::process::exit(0)
    }
}
