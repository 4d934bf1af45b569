//! Boot banner, wake diagnostics and panic logging.
//!
//! A snapshot of the chip state is logged once per wake, before sampling
//! starts. Nothing here is persisted: a panic is logged and the chip resets.

use core::fmt;

use crate::app::ports::ResetReason;

/// Per-wake snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeDiagnostics {
    pub reset_reason: ResetReason,
    pub supply_millivolts: u32,
    pub heap_free: u32,
    pub heap_min_free: u32,
}

impl WakeDiagnostics {
    #[cfg(target_os = "espidf")]
    pub fn collect(reset_reason: ResetReason, supply_millivolts: u32) -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: heap statistics reads, no preconditions.
        let (heap_free, heap_min_free) =
            unsafe { (esp_get_free_heap_size(), esp_get_minimum_free_heap_size()) };
        Self {
            reset_reason,
            supply_millivolts,
            heap_free,
            heap_min_free,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect(reset_reason: ResetReason, supply_millivolts: u32) -> Self {
        Self {
            reset_reason,
            supply_millivolts,
            heap_free: 307_200,
            heap_min_free: 261_120,
        }
    }

    /// True when the last reset was not a planned wake-up.
    pub fn is_abnormal(&self) -> bool {
        matches!(
            self.reset_reason,
            ResetReason::Watchdog | ResetReason::Brownout | ResetReason::Panic
        )
    }
}

impl fmt::Display for WakeDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reset={:?} supply={}mV heap={}B (min {}B)",
            self.reset_reason, self.supply_millivolts, self.heap_free, self.heap_min_free
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Chip and SDK info
// ───────────────────────────────────────────────────────────────

/// Static facts about the chip and the SDK build, read once at boot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipInfo {
    pub idf_version: String,
    /// `esp_chip_model_t` value.
    pub model: u32,
    pub revision: u16,
    pub cores: u8,
    pub cpu_mhz: u32,
    pub flash_bytes: u32,
    /// Factory base MAC, doubles as the chip ID.
    pub mac: [u8; 6],
}

impl ChipInfo {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;

        // SAFETY: returns a pointer to a static NUL-terminated string.
        let idf_version = unsafe { core::ffi::CStr::from_ptr(esp_get_idf_version()) }
            .to_str()
            .unwrap_or("?")
            .to_owned();

        // SAFETY: plain C struct; all-zero is a valid value.
        let mut chip: esp_chip_info_t = unsafe { core::mem::zeroed() };
        let mut flash_bytes = 0u32;
        let mut mac = [0u8; 6];
        // SAFETY: every out-pointer refers to a live local of the right type;
        // a null chip selects the default flash chip.
        let (cpu_mhz, flash_ret, mac_ret) = unsafe {
            esp_chip_info(&mut chip);
            (
                ets_get_cpu_frequency(),
                esp_flash_get_size(core::ptr::null_mut(), &mut flash_bytes),
                esp_efuse_mac_get_default(mac.as_mut_ptr()),
            )
        };
        if flash_ret != ESP_OK as i32 {
            log::warn!("Diagnostics: flash size unavailable (rc={})", flash_ret);
        }
        if mac_ret != ESP_OK as i32 {
            log::warn!("Diagnostics: base MAC unavailable (rc={})", mac_ret);
        }

        Self {
            idf_version,
            model: chip.model as u32,
            revision: chip.revision as u16,
            cores: chip.cores as u8,
            cpu_mhz,
            flash_bytes,
            mac,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            idf_version: "host".to_owned(),
            model: 1,
            revision: 3,
            cores: 2,
            cpu_mhz: 240,
            flash_bytes: 4 * 1024 * 1024,
            mac: [0x02, 0, 0, 0, 0, 0x01],
        }
    }

    pub fn model_name(&self) -> &'static str {
        match self.model {
            1 => "ESP32",
            2 => "ESP32-S2",
            5 => "ESP32-C3",
            9 => "ESP32-S3",
            12 => "ESP32-C2",
            13 => "ESP32-C6",
            16 => "ESP32-H2",
            _ => "unknown",
        }
    }

    /// The lines logged under the banner.
    pub fn banner_lines(&self) -> [String; 3] {
        let m = self.mac;
        [
            format!("ThermoNode v{} on ESP-IDF {}", env!("CARGO_PKG_VERSION"), self.idf_version),
            format!(
                "chip={} rev={} cores={} cpu={}MHz flash={}KB",
                self.model_name(),
                self.revision,
                self.cores,
                self.cpu_mhz,
                self.flash_bytes / 1024
            ),
            format!(
                "chip id={:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
        ]
    }
}

/// Firmware banner with chip and SDK info, logged once from `main`.
pub fn log_banner() {
    log::info!("╔══════════════════════════════════════╗");
    log::info!("║  ThermoNode v{:<24}║", env!("CARGO_PKG_VERSION"));
    log::info!("╚══════════════════════════════════════╝");
    for line in ChipInfo::collect().banner_lines() {
        log::info!("{}", line);
    }
}

// ───────────────────────────────────────────────────────────────
// Panic hook
// ───────────────────────────────────────────────────────────────

/// Log panics through `log` so they reach the serial console before reset.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        match info.location() {
            Some(at) => log::error!("PANIC at {}:{}: {}", at.file(), at.line(), reason),
            None => log::error!("PANIC: {}", reason),
        }
    }));
}
