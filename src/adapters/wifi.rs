//! WiFi station-mode adapter.
//!
//! Implements [`WifiPort`]. The association itself is one attempt; retries
//! are driven by the wake cycle through `WIFI_SETUP_FAIL`.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi` in STA
//!   mode, WPA2-Personal (open when the password is empty).
//! - **all other targets**: simulation with scripted failures.

use core::fmt;

use log::{info, warn};

use crate::app::ports::WifiPort;
use crate::error::WifiError;
use crate::events::{Event, EventSender, post};

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), WifiError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(WifiError::InvalidSsid);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), WifiError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(WifiError::InvalidPassword);
    }
    Ok(())
}

/// Station state as seen by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Started,
    Associated,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Started => write!(f, "started"),
            Self::Associated => write!(f, "associated"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use super::*;

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sys::{ESP_OK, esp_wifi_sta_get_ap_info, wifi_ap_record_t};
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::error;

    use crate::config::NodeConfig;

    pub struct WifiStation<'q> {
        wifi: BlockingWifi<EspWifi<'static>>,
        events: EventSender<'q>,
        config: Configuration,
        state: LinkState,
    }

    impl<'q> WifiStation<'q> {
        pub fn new(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
            node: &NodeConfig,
            events: EventSender<'q>,
        ) -> Result<Self, WifiError> {
            validate_ssid(&node.wifi_ssid)?;
            validate_password(&node.wifi_password)?;

            let auth_method = if node.wifi_password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            };
            let config = Configuration::Client(ClientConfiguration {
                ssid: node.wifi_ssid.as_str().try_into().map_err(|_| WifiError::InvalidSsid)?,
                password: node
                    .wifi_password
                    .as_str()
                    .try_into()
                    .map_err(|_| WifiError::InvalidPassword)?,
                auth_method,
                ..Default::default()
            });

            let driver = EspWifi::new(modem, sysloop.clone(), Some(nvs)).map_err(|e| {
                error!("WiFi: driver init failed: {:?}", e);
                WifiError::ConfigureFailed
            })?;
            let wifi = BlockingWifi::wrap(driver, sysloop).map_err(|e| {
                error!("WiFi: event loop wrap failed: {:?}", e);
                WifiError::ConfigureFailed
            })?;

            Ok(Self {
                wifi,
                events,
                config,
                state: LinkState::Down,
            })
        }

        fn try_associate(&mut self) -> Result<(), esp_idf_svc::sys::EspError> {
            self.wifi.connect()?;
            self.wifi.wait_netif_up()
        }
    }

    impl WifiPort for WifiStation<'_> {
        fn associate(&mut self) -> Result<(), WifiError> {
            if self.state == LinkState::Down {
                self.wifi.set_configuration(&self.config).map_err(|e| {
                    error!("WiFi: set_configuration failed: {:?}", e);
                    WifiError::ConfigureFailed
                })?;
                self.wifi.start().map_err(|e| {
                    error!("WiFi: start failed: {:?}", e);
                    WifiError::StartFailed
                })?;
                self.state = LinkState::Started;
            }

            match self.try_associate() {
                Ok(()) => {
                    self.state = LinkState::Associated;
                    if let Ok(ip) = self.wifi.wifi().sta_netif().get_ip_info() {
                        info!("WiFi: associated, ip {}", ip.ip);
                    }
                    post(&self.events, Event::WifiAssociated);
                }
                Err(e) => {
                    warn!("WiFi: association failed: {:?}", e);
                    post(&self.events, Event::WifiFailed);
                }
            }
            Ok(())
        }

        fn disassociate(&mut self) -> Result<(), WifiError> {
            if self.state == LinkState::Associated {
                if let Err(e) = self.wifi.disconnect() {
                    warn!("WiFi: disconnect failed: {:?}", e);
                }
            }
            if self.state != LinkState::Down {
                self.wifi.stop().map_err(|e| {
                    error!("WiFi: stop failed: {:?}", e);
                    WifiError::StopFailed
                })?;
            }
            self.state = LinkState::Down;
            info!("WiFi: stopped");
            post(&self.events, Event::WifiDisassociated);
            Ok(())
        }

        fn rssi(&self) -> Option<i8> {
            if self.state != LinkState::Associated {
                return None;
            }
            // SAFETY: plain C struct, all-zero is a valid value.
            let mut ap: wifi_ap_record_t = unsafe { core::mem::zeroed() };
            // SAFETY: `ap` is a valid out-pointer for the duration of the call.
            let ret = unsafe { esp_wifi_sta_get_ap_info(&mut ap) };
            (ret == ESP_OK as i32).then_some(ap.rssi)
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::WifiStation;

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub struct SimWifi<'q> {
    events: EventSender<'q>,
    state: LinkState,
    /// The next `fail_attempts` associations report `WifiFailed`.
    pub fail_attempts: u32,
    /// `associate` returns `Err` without posting anything.
    pub refuse_start: bool,
    pub attempts: u32,
    pub disassociations: u32,
    pub rssi: Option<i8>,
}

#[cfg(not(target_os = "espidf"))]
impl<'q> SimWifi<'q> {
    pub fn new(events: EventSender<'q>) -> Self {
        Self {
            events,
            state: LinkState::Down,
            fail_attempts: 0,
            refuse_start: false,
            attempts: 0,
            disassociations: 0,
            rssi: Some(-67),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiPort for SimWifi<'_> {
    fn associate(&mut self) -> Result<(), WifiError> {
        if self.refuse_start {
            return Err(WifiError::StartFailed);
        }
        self.attempts += 1;
        self.state = LinkState::Started;
        if self.fail_attempts > 0 {
            self.fail_attempts -= 1;
            warn!("WiFi(sim): association failed (attempt {})", self.attempts);
            post(&self.events, Event::WifiFailed);
        } else {
            self.state = LinkState::Associated;
            info!("WiFi(sim): associated (attempt {})", self.attempts);
            post(&self.events, Event::WifiAssociated);
        }
        Ok(())
    }

    fn disassociate(&mut self) -> Result<(), WifiError> {
        self.disassociations += 1;
        info!("WiFi(sim): {} -> down", self.state);
        self.state = LinkState::Down;
        post(&self.events, Event::WifiDisassociated);
        Ok(())
    }

    fn rssi(&self) -> Option<i8> {
        match self.state {
            LinkState::Associated => self.rssi,
            _ => None,
        }
    }
}
