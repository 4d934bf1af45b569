//! Port traits: the hexagonal boundary between the wake cycle and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WakeCycle (domain)
//! ```
//!
//! Every adapter has an ESP-IDF implementation and a host simulation in
//! [`crate::adapters`]. [`Platform`] names one concrete adapter per port so
//! the state table can be built for either backend without `dyn`.
//!
//! Asynchronous operations (`associate`, `connect`, `send`, ...) return
//! `Err` only when they could not be started. Their completion is reported
//! later by posting an [`Event`](crate::events::Event) on the queue the
//! adapter was built with.

use core::time::Duration;

use crate::error::{NetError, StorageError, WifiError};
use crate::events::Event;

pub use crate::drivers::onewire::OneWire;

// ───────────────────────────────────────────────────────────────
// RTC scratch memory
// ───────────────────────────────────────────────────────────────

/// Byte-addressed memory that survives deep sleep (but not power loss).
pub trait ScratchMemory {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// One-shot timer
// ───────────────────────────────────────────────────────────────

pub trait OneShotTimer {
    /// Post `event` once `after` has elapsed. Re-arming replaces a pending shot.
    fn arm(&mut self, after: Duration, event: Event);
    /// Drop a pending shot, if any.
    fn disarm(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Wifi station
// ───────────────────────────────────────────────────────────────

/// Completion: `WifiAssociated` or `WifiFailed` for `associate`,
/// `WifiDisassociated` for `disassociate`.
pub trait WifiPort {
    fn associate(&mut self) -> Result<(), WifiError>;
    fn disassociate(&mut self) -> Result<(), WifiError>;
    /// Signal strength of the current association.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Report transport
// ───────────────────────────────────────────────────────────────

/// Completion: `NetConnected` / `NetConnectFailed`, `NetDataSent`,
/// `NetDisconnected`. `disconnect` while not connected still completes.
pub trait NetPort {
    fn connect(&mut self) -> Result<(), NetError>;
    fn send(&mut self, data: &[u8]) -> Result<(), NetError>;
    fn disconnect(&mut self) -> Result<(), NetError>;
}

// ───────────────────────────────────────────────────────────────
// Power / sleep controller
// ───────────────────────────────────────────────────────────────

/// Why the chip last came out of reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    PowerOn,
    DeepSleep,
    Watchdog,
    Brownout,
    Software,
    Panic,
    Other,
}

pub trait PowerPort {
    fn supply_millivolts(&self) -> u32;
    fn reset_reason(&self) -> ResetReason;
    /// Power down for `duration`. RAM is lost; the next wake is a reset.
    fn deep_sleep(&mut self, duration: Duration) -> !;
}

// ───────────────────────────────────────────────────────────────
// Status indicator
// ───────────────────────────────────────────────────────────────

pub trait IndicatorPort {
    /// Blink with the given half-period; 0 switches the LED off.
    fn blink(&mut self, period_ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Platform bundle
// ───────────────────────────────────────────────────────────────

/// One concrete adapter per port.
pub trait Platform {
    type Bus: OneWire;
    type Scratch: ScratchMemory;
    type Timer: OneShotTimer;
    type Wifi: WifiPort;
    type Net: NetPort;
    type Power: PowerPort;
    type Indicator: IndicatorPort;
}

/// Adapter instances handed to [`WakeCycle::new`](super::service::WakeCycle::new).
pub struct Hardware<P: Platform> {
    pub bus: P::Bus,
    pub scratch: P::Scratch,
    pub timer: P::Timer,
    pub wifi: P::Wifi,
    pub net: P::Net,
    pub power: P::Power,
    pub indicator: P::Indicator,
}
