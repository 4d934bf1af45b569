//! ThermoNode firmware library.
//!
//! Exposes the wake-cycle logic, the 1-Wire / DS18B20 drivers and the
//! RTC record store for integration testing. All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module; host builds
//! get simulation adapters instead.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod pins;
pub mod record_store;
pub mod sensors;
