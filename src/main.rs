//! ThermoNode Firmware: Main Entry Point
//!
//! One wake cycle per boot: sample, store or report, deep sleep.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  OneWireBus      RtcScratch     EspOneShotTimer   StatusLed    │
//! │  (OneWire)       (Scratch)      (OneShotTimer)    (Indicator)  │
//! │  WifiStation     TcpReporter    EspPower                       │
//! │  (WifiPort)      (NetPort)      (PowerPort)                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              WakeCycle (pure logic)                    │    │
//! │  │  FSM · SamplingEngine · RecordStore · payload          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  EVENTS (embassy-sync channel) · esp_timer callbacks           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

mod esp_link_shims;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::info;

use esp_idf_hal::delay::Ets;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use thermonode::adapters::led::StatusLed;
use thermonode::adapters::net::TcpReporter;
use thermonode::adapters::power::EspPower;
use thermonode::adapters::rtc_scratch::RtcScratch;
use thermonode::adapters::timer::EspOneShotTimer;
use thermonode::adapters::wifi::WifiStation;
use thermonode::adapters::EspPlatform;
use thermonode::app::ports::Hardware;
use thermonode::app::service::WakeCycle;
use thermonode::config::{NodeConfig, SENSORS};
use thermonode::diagnostics;
use thermonode::drivers::onewire::OneWireBus;
use thermonode::error::Error;
use thermonode::events::EVENTS;
use thermonode::pins;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    diagnostics::log_banner();
    diagnostics::install_panic_handler();

    let config = NodeConfig::from_env();
    config.validate()?;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // ── 2. 1-Wire bus ─────────────────────────────────────────
    // SAFETY: the pin numbers come from `pins` and are claimed nowhere else.
    let (data_pin, power_pin) = unsafe {
        (
            AnyIOPin::new(pins::ONEWIRE_DATA_GPIO),
            AnyOutputPin::new(pins::ONEWIRE_POWER_GPIO),
        )
    };
    let data = PinDriver::input_output_od(data_pin)?;
    let power = PinDriver::output(power_pin)?;
    let bus = OneWireBus::new(data, power, Ets).map_err(Error::from)?;

    // ── 3. Adapters ───────────────────────────────────────────
    let wifi = WifiStation::new(peripherals.modem, sysloop, nvs, &config, EVENTS.sender())
        .map_err(Error::from)?;
    let net = TcpReporter::new(&config.server_addr, EVENTS.sender()).map_err(Error::from)?;

    let hw = Hardware::<EspPlatform> {
        bus,
        // SAFETY: the only RtcScratch in the program.
        scratch: unsafe { RtcScratch::take() },
        timer: EspOneShotTimer::new()?,
        wifi,
        net,
        power: EspPower::new()?,
        indicator: StatusLed::new()?,
    };

    // ── 4. Wake cycle ─────────────────────────────────────────
    let mut cycle = WakeCycle::new(hw, &SENSORS, config, &EVENTS)?;
    cycle.boot();
    let request = futures_lite::future::block_on(cycle.run());
    info!("Wake cycle complete");
    cycle.sleep(request)
}
