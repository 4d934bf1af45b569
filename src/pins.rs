//! GPIO pin assignments for the ThermoNode board.
//!
//! Single source of truth: every adapter references this module rather than
//! hard-coding pin numbers.

/// 1-Wire data line (open drain, external 4.7 kΩ pull-up).
pub const ONEWIRE_DATA_GPIO: i32 = 4;

/// Sensor supply enable: HIGH powers the DS18B20 string.
pub const ONEWIRE_POWER_GPIO: i32 = 5;

/// On-board status LED (active LOW).
pub const LED_GPIO: i32 = 2;

/// Battery sense: ADC1 channel 6 (GPIO34) behind a 1:2 resistor divider.
pub const SUPPLY_ADC1_CHANNEL: u32 = 6;

/// Battery voltage / voltage at the ADC pin.
pub const SUPPLY_DIVIDER: u32 = 2;
