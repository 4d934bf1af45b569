//! Unified error types for the ThermoNode firmware.
//!
//! Sensor faults are not errors: they are recorded per sensor as a
//! [`StatusKind`](crate::sensors::StatusKind) and never abort a wake.
//! The types here cover the bus layer, the RTC scratch store and the
//! network collaborators. All variants are `Copy`.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The 1-Wire bus misbehaved.
    Bus(BusFault),
    /// RTC scratch memory could not be read or written.
    Storage(StorageError),
    /// Wifi association failed.
    Wifi(WifiError),
    /// The report transport failed.
    Net(NetError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Wifi(e) => write!(f, "wifi: {e}"),
            Self::Net(e) => write!(f, "net: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus faults
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// No device pulled the line low after the reset pulse.
    NoPresence,
    /// The line stayed low after the presence window.
    LineHeldLow,
    /// The GPIO driver reported an error.
    Pin,
}

impl fmt::Display for BusFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPresence => write!(f, "no presence pulse"),
            Self::LineHeldLow => write!(f, "line held low"),
            Self::Pin => write!(f, "GPIO error"),
        }
    }
}

impl From<BusFault> for Error {
    fn from(e: BusFault) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access would run past the end of the scratch region.
    OutOfBounds,
    /// The underlying read failed.
    ReadFailed,
    /// The underlying write failed.
    WriteFailed,
    /// More records requested than the store holds.
    TooManyRecords,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "access out of bounds"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::TooManyRecords => write!(f, "too many records"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Wifi errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiError {
    InvalidSsid,
    InvalidPassword,
    ConfigureFailed,
    StartFailed,
    StopFailed,
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid"),
            Self::InvalidPassword => write!(f, "password invalid"),
            Self::ConfigureFailed => write!(f, "station configuration failed"),
            Self::StartFailed => write!(f, "association could not be started"),
            Self::StopFailed => write!(f, "disassociation failed"),
        }
    }
}

impl From<WifiError> for Error {
    fn from(e: WifiError) -> Self {
        Self::Wifi(e)
    }
}

// ---------------------------------------------------------------------------
// Network transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    InvalidAddress,
    ConnectFailed,
    NotConnected,
    SendFailed,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress => write!(f, "server address invalid"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::NotConnected => write!(f, "not connected"),
            Self::SendFailed => write!(f, "send failed"),
        }
    }
}

impl From<NetError> for Error {
    fn from(e: NetError) -> Self {
        Self::Net(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
