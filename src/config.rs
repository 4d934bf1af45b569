//! Node configuration.
//!
//! Operational constants (round/record counts, the sensor address table)
//! are fixed at compile time. Deployment parameters such as the report
//! server and wifi credentials live in [`NodeConfig`], whose defaults can be
//! overridden at build time through `THERMONODE_*` environment variables.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensors::SensorAddress;

/// Measurement rounds attempted per wake before giving up on a sensor.
pub const ROUNDS_MAX: usize = 3;

/// Wakes accumulated in RTC memory before a report is sent.
pub const RECORDS_MAX: usize = 4;

/// Upper bound on the sensor table (sizes the sample arrays).
pub const MAX_SENSORS: usize = 8;

/// Installed sensors, in report order.
pub static SENSORS: [SensorAddress; 7] = [
    SensorAddress::new([0x28, 0x1C, 0xF0, 0x1E, 0x00, 0x00, 0x80, 0x3F]),
    SensorAddress::new([0x28, 0x3A, 0x00, 0x03, 0x00, 0x00, 0x80, 0x38]),
    SensorAddress::new([0x28, 0xE9, 0xFF, 0x02, 0x00, 0x00, 0x80, 0xE3]),
    SensorAddress::new([0x28, 0x97, 0xCF, 0x1E, 0x00, 0x00, 0x80, 0xC6]),
    SensorAddress::new([0x28, 0x2A, 0x9B, 0x1E, 0x00, 0x00, 0x80, 0x01]),
    SensorAddress::new([0x28, 0x65, 0xD0, 0x1E, 0x00, 0x00, 0x80, 0xC9]),
    SensorAddress::new([0x28, 0x43, 0x87, 0x1E, 0x00, 0x00, 0x80, 0x09]),
];

/// Tunable deployment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Report server ---
    /// `ip:port` of the collector.
    pub server_addr: heapless::String<48>,
    /// Value of the HTTP `Host` header.
    pub http_host: heapless::String<32>,
    /// Request path for the POST.
    pub http_path: heapless::String<32>,

    // --- Wifi ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Extra association attempts after the first failure.
    pub wifi_max_retries: u8,

    // --- Timing ---
    /// DS18B20 12-bit conversion wait (milliseconds).
    pub conversion_delay_ms: u32,
    /// Deep sleep between wakes (seconds).
    pub sleep_secs: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            server_addr: bounded("192.168.1.10:8080"),
            http_host: bounded("esp8266-ds18b20"),
            http_path: bounded("/"),
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            wifi_max_retries: 3,
            conversion_delay_ms: 800,
            sleep_secs: 900,
        }
    }
}

impl NodeConfig {
    /// Defaults, with any `THERMONODE_*` variables present at build time applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(addr) = option_env!("THERMONODE_SERVER") {
            config.server_addr = bounded(addr);
        }
        if let Some(host) = option_env!("THERMONODE_HTTP_HOST") {
            config.http_host = bounded(host);
        }
        if let Some(ssid) = option_env!("THERMONODE_WIFI_SSID") {
            config.wifi_ssid = bounded(ssid);
        }
        if let Some(password) = option_env!("THERMONODE_WIFI_PASSWORD") {
            config.wifi_password = bounded(password);
        }
        config
    }

    /// Reject values the wake cycle cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.is_empty() {
            return Err(Error::Config("server address empty"));
        }
        if !self.http_path.starts_with('/') {
            return Err(Error::Config("HTTP path must start with '/'"));
        }
        if self.conversion_delay_ms < 750 {
            return Err(Error::Config("conversion delay below 12-bit conversion time"));
        }
        if self.sleep_secs == 0 {
            return Err(Error::Config("sleep duration zero"));
        }
        Ok(())
    }

    pub fn conversion_delay(&self) -> Duration {
        Duration::from_millis(self.conversion_delay_ms as u64)
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(self.sleep_secs as u64)
    }
}

/// Copy as much of `s` as fits into a bounded string.
fn bounded<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = NodeConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.sleep_duration(), Duration::from_secs(900));
        assert_eq!(c.conversion_delay(), Duration::from_millis(800));
        assert_eq!(c.wifi_max_retries, 3);
    }

    #[test]
    fn serde_roundtrip() {
        let c = NodeConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: NodeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.server_addr, c2.server_addr);
        assert_eq!(c.http_host, c2.http_host);
        assert_eq!(c.sleep_secs, c2.sleep_secs);
    }

    #[test]
    fn validate_rejects_short_conversion_delay() {
        let c = NodeConfig {
            conversion_delay_ms: 100,
            ..NodeConfig::default()
        };
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_relative_path() {
        let c = NodeConfig {
            http_path: bounded("report"),
            ..NodeConfig::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn sensor_table_fits_and_is_valid() {
        assert!(SENSORS.len() <= MAX_SENSORS);
        assert!(SENSORS.iter().all(SensorAddress::is_valid));
    }

    #[test]
    fn bounded_truncates() {
        let s: heapless::String<4> = bounded("abcdef");
        assert_eq!(s.as_str(), "abcd");
    }
}
