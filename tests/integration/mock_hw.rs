//! Simulated hardware rig for integration tests.
//!
//! Builds a [`Hardware`] bundle of host adapters around one event queue and
//! runs wake cycles to completion. RTC memory is carried from one wake to
//! the next by moving the [`SimScratch`] out of the finished cycle.

use thermonode::adapters::SimPlatform;
use thermonode::adapters::led::SimIndicator;
use thermonode::adapters::net::SimNet;
use thermonode::adapters::power::SimPower;
use thermonode::adapters::rtc_scratch::SimScratch;
use thermonode::adapters::sim_bus::SimBus;
use thermonode::adapters::timer::SimOneShotTimer;
use thermonode::adapters::wifi::SimWifi;
use thermonode::app::ports::Hardware;
use thermonode::app::service::{SleepRequest, WakeCycle};
use thermonode::config::{NodeConfig, SENSORS};
use thermonode::events::EventChannel;
use thermonode::record_store::RecordStore;
use thermonode::sensors::{Record, Sample, StatusKind};

pub type SimHardware<'q> = Hardware<SimPlatform<'q>>;
pub type SimCycle<'q> = WakeCycle<'q, SimPlatform<'q>>;

/// Every configured sensor, all reading `celsius`.
pub fn healthy_bus(celsius: f32) -> SimBus {
    SENSORS
        .iter()
        .fold(SimBus::new(), |bus, address| bus.with_device(*address, celsius))
}

pub fn hardware<'q>(events: &'q EventChannel, bus: SimBus, scratch: SimScratch) -> SimHardware<'q> {
    Hardware {
        bus,
        scratch,
        timer: SimOneShotTimer::new(events.sender()),
        wifi: SimWifi::new(events.sender()),
        net: SimNet::new(events.sender()),
        power: SimPower::default(),
        indicator: SimIndicator::default(),
    }
}

/// Assemble and boot a cycle with the default configuration.
pub fn boot<'q>(events: &'q EventChannel, hw: SimHardware<'q>) -> SimCycle<'q> {
    let mut cycle = WakeCycle::new(hw, &SENSORS, NodeConfig::default(), events).unwrap();
    cycle.boot();
    cycle
}

/// Drain the queue until the cycle asks for deep sleep.
pub fn run_to_sleep(cycle: &mut SimCycle<'_>) -> SleepRequest {
    cycle.run_pending().expect("wake cycle stalled before deep sleep")
}

/// One complete wake on a healthy bus; returns the RTC memory afterwards.
pub fn wake_once(scratch: SimScratch, celsius: f32) -> SimScratch {
    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, healthy_bus(celsius), scratch));
    run_to_sleep(&mut cycle);
    cycle.into_context().store.into_scratch()
}

/// Scratch memory holding `count` records of `temperature` (1/10000 °C).
pub fn scratch_with_records(count: usize, temperature: i32) -> SimScratch {
    let mut store = RecordStore::new(SimScratch::default(), SENSORS.len());
    for index in 0..count {
        let record: Record = SENSORS
            .iter()
            .map(|_| Sample::new(temperature, StatusKind::Success))
            .collect();
        store.set_record(index, record);
    }
    store.save(count).unwrap();
    store.into_scratch()
}

/// Record count announced by the store in `scratch`.
pub fn stored_count(scratch: SimScratch) -> usize {
    RecordStore::new(scratch, SENSORS.len()).load()
}
