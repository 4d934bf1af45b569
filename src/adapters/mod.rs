//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements     | Connects to                         |
//! |---------------|----------------|-------------------------------------|
//! | `rtc_scratch` | ScratchMemory  | RTC slow memory (`.rtc.data`)       |
//! | `timer`       | OneShotTimer   | esp_timer one-shot                  |
//! | `wifi`        | WifiPort       | ESP-IDF WiFi STA                    |
//! | `net`         | NetPort        | lwIP TCP via `std::net`             |
//! | `power`       | PowerPort      | ADC1 supply sense, reset reason, deep sleep |
//! | `led`         | IndicatorPort  | Status LED GPIO                     |
//! | `sim_bus`     | OneWire        | Simulated DS18B20 string (host)     |
//!
//! The 1-Wire bus on hardware is [`crate::drivers::onewire::OneWireBus`]
//! over `esp-idf-hal` pin drivers.

pub mod led;
pub mod net;
pub mod power;
pub mod rtc_scratch;
#[cfg(not(target_os = "espidf"))]
pub mod sim_bus;
pub mod timer;
pub mod wifi;

use crate::app::ports::Platform;

// ───────────────────────────────────────────────────────────────
// ESP-IDF platform
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type EspBus = crate::drivers::onewire::OneWireBus<
    esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyIOPin, esp_idf_hal::gpio::InputOutput>,
    esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyOutputPin, esp_idf_hal::gpio::Output>,
    esp_idf_hal::delay::Ets,
>;

#[cfg(target_os = "espidf")]
pub struct EspPlatform;

#[cfg(target_os = "espidf")]
impl Platform for EspPlatform {
    type Bus = EspBus;
    type Scratch = rtc_scratch::RtcScratch;
    type Timer = timer::EspOneShotTimer;
    type Wifi = wifi::WifiStation<'static>;
    type Net = net::TcpReporter<'static>;
    type Power = power::EspPower;
    type Indicator = led::StatusLed;
}

// ───────────────────────────────────────────────────────────────
// Host simulation platform
// ───────────────────────────────────────────────────────────────

/// Simulated adapters posting onto a queue that lives for `'q`.
#[cfg(not(target_os = "espidf"))]
pub struct SimPlatform<'q>(core::marker::PhantomData<&'q ()>);

#[cfg(not(target_os = "espidf"))]
impl<'q> Platform for SimPlatform<'q> {
    type Bus = sim_bus::SimBus;
    type Scratch = rtc_scratch::SimScratch;
    type Timer = timer::SimOneShotTimer<'q>;
    type Wifi = wifi::SimWifi<'q>;
    type Net = net::SimNet<'q>;
    type Power = power::SimPower;
    type Indicator = led::SimIndicator;
}
