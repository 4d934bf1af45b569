//! Sensor data model and the per-wake [`SamplingEngine`].
//!
//! A [`Sample`] is one temperature plus a [`StatusKind`]. Rounds of samples
//! are folded into one record per wake, and records into one aggregate per
//! report, by the same [`consolidate`] rule: the status is the "most alive"
//! status seen, the temperature is the mean of the successful readings.

pub mod sampling;

use core::cmp::Ordering;
use core::fmt;

use crate::config::MAX_SENSORS;
use crate::drivers::onewire::crc8;

pub use sampling::{SamplingEngine, consolidate_records};

/// One consolidated sample per configured sensor.
pub type Record = heapless::Vec<Sample, MAX_SENSORS>;

// ---------------------------------------------------------------------------
// Sensor address
// ---------------------------------------------------------------------------

/// 64-bit 1-Wire ROM code: family byte, 48-bit serial, CRC8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorAddress([u8; 8]);

impl SensorAddress {
    pub const fn new(rom: [u8; 8]) -> Self {
        Self(rom)
    }

    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// True when the trailing CRC byte matches the first seven.
    pub fn is_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }
}

impl fmt::Display for SensorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Outcome of probing one sensor.
///
/// Ordered from least to most alive. The order is what consolidation relies
/// on and is defined by [`StatusKind::rank`], not by the persisted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusKind {
    /// Never probed this wake.
    #[default]
    Unprobed,
    /// No presence pulse, or a GPIO fault on the bus.
    BusError,
    /// Device selected but every scratchpad byte read back as 0xFF.
    Silence,
    /// Scratchpad CRC mismatch.
    ChecksumError,
    /// Power-on value (85 °C): conversion did not run.
    ResetValue,
    Success,
}

impl StatusKind {
    pub const ALL: [Self; 6] = [
        Self::Unprobed,
        Self::BusError,
        Self::Silence,
        Self::ChecksumError,
        Self::ResetValue,
        Self::Success,
    ];

    pub const fn rank(self) -> u8 {
        match self {
            Self::Unprobed => 0,
            Self::BusError => 1,
            Self::Silence => 2,
            Self::ChecksumError => 3,
            Self::ResetValue => 4,
            Self::Success => 5,
        }
    }

    /// Text used in logs and in the report body.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unprobed => "unprobed",
            Self::BusError => "bus error",
            Self::Silence => "no response",
            Self::ChecksumError => "checksum error",
            Self::ResetValue => "reset value",
            Self::Success => "success",
        }
    }

    /// Byte stored in RTC memory.
    pub const fn to_wire(self) -> u8 {
        match self {
            Self::Unprobed => 0x00,
            Self::BusError => 0x01,
            Self::Silence => 0x02,
            Self::ChecksumError => 0x03,
            Self::ResetValue => 0x04,
            Self::Success => 0x05,
        }
    }

    pub const fn from_wire(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Unprobed),
            0x01 => Some(Self::BusError),
            0x02 => Some(Self::Silence),
            0x03 => Some(Self::ChecksumError),
            0x04 => Some(Self::ResetValue),
            0x05 => Some(Self::Success),
            _ => None,
        }
    }
}

impl Ord for StatusKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for StatusKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sample
// ---------------------------------------------------------------------------

/// Fixed-point scale of [`Sample::temperature`]: units of 1/10000 °C.
pub const TEMPERATURE_SCALE: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Degrees Celsius × 10000.
    pub temperature: i32,
    pub status: StatusKind,
}

impl Sample {
    pub const fn new(temperature: i32, status: StatusKind) -> Self {
        Self { temperature, status }
    }

    pub const fn with_status(status: StatusKind) -> Self {
        Self { temperature: 0, status }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.temperature < 0 { "-" } else { "" };
        let abs = self.temperature.unsigned_abs();
        let scale = TEMPERATURE_SCALE as u32;
        write!(
            f,
            "{sign}{}.{:04} °C ({})",
            abs / scale,
            abs % scale,
            self.status
        )
    }
}

/// Fold several samples of one sensor into one.
///
/// Status is the maximum over the inputs; temperature is the truncating
/// integer mean of the `Success` inputs, or 0 when there are none.
pub fn consolidate<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Sample {
    let mut status = StatusKind::Unprobed;
    let mut sum: i64 = 0;
    let mut count: i64 = 0;

    for s in samples {
        status = status.max(s.status);
        if s.status == StatusKind::Success {
            sum += s.temperature as i64;
            count += 1;
        }
    }

    let temperature = if count > 0 { (sum / count) as i32 } else { 0 };
    Sample { temperature, status }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_order_least_to_most_alive() {
        for pair in StatusKind::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
        assert_eq!(StatusKind::Success.max(StatusKind::ResetValue), StatusKind::Success);
    }

    #[test]
    fn status_wire_codes_roundtrip() {
        for s in StatusKind::ALL {
            assert_eq!(StatusKind::from_wire(s.to_wire()), Some(s));
        }
        assert_eq!(StatusKind::from_wire(0x42), None);
    }

    #[test]
    fn consolidate_averages_successes_only() {
        let samples = [
            Sample::new(100_000, StatusKind::Success),
            Sample::new(999_999, StatusKind::BusError),
            Sample::new(120_000, StatusKind::Success),
        ];
        assert_eq!(consolidate(&samples), Sample::new(110_000, StatusKind::Success));
    }

    #[test]
    fn consolidate_without_success_is_zero() {
        let samples = [
            Sample::with_status(StatusKind::BusError),
            Sample::with_status(StatusKind::Silence),
        ];
        assert_eq!(consolidate(&samples), Sample::new(0, StatusKind::Silence));
    }

    #[test]
    fn consolidate_empty_is_unprobed() {
        assert_eq!(consolidate(&[] as &[Sample]), Sample::default());
    }

    #[test]
    fn consolidate_truncates_toward_zero() {
        let samples = [
            Sample::new(-5, StatusKind::Success),
            Sample::new(-6, StatusKind::Success),
        ];
        assert_eq!(consolidate(&samples).temperature, -5);
    }

    #[test]
    fn address_display_is_colon_hex() {
        let a = SensorAddress::new([0x28, 0x1C, 0xF0, 0x1E, 0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(a.to_string(), "28:1c:f0:1e:00:00:80:3f");
    }

    #[test]
    fn address_crc_validation() {
        assert!(SensorAddress::new([0x28, 0x1C, 0xF0, 0x1E, 0x00, 0x00, 0x80, 0x3F]).is_valid());
        assert!(!SensorAddress::new([0x28, 0x1C, 0xF0, 0x1E, 0x00, 0x00, 0x80, 0x40]).is_valid());
    }

    #[test]
    fn sample_display() {
        assert_eq!(Sample::new(215_000, StatusKind::Success).to_string(), "21.5000 °C (success)");
        assert_eq!(Sample::new(-5_000, StatusKind::Success).to_string(), "-0.5000 °C (success)");
    }
}
