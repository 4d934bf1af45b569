//! Sampling phase of the wake cycle: rounds, retries, consolidation and the
//! hand-off to the record store.

use std::time::Duration;

use thermonode::adapters::rtc_scratch::SimScratch;
use thermonode::config::{ROUNDS_MAX, SENSORS};
use thermonode::events::{Event, EventChannel};
use thermonode::fsm::StateId;
use thermonode::fsm::states::BLINK_SENSORS_MS;
use thermonode::sensors::StatusKind;

use crate::mock_hw::{boot, hardware, healthy_bus, run_to_sleep, stored_count};

#[test]
fn first_wake_saves_one_record_and_sleeps() {
    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, healthy_bus(21.5), SimScratch::default()));

    let request = run_to_sleep(&mut cycle);
    assert_eq!(request.duration, Duration::from_secs(900));
    assert_eq!(cycle.current_state(), Some(StateId::SensorsSave));

    let ctx = cycle.into_context();
    assert_eq!(ctx.wake_index, 0);
    assert_eq!(ctx.round, 0);
    assert_eq!(ctx.timer.armed, vec![(Duration::from_millis(800), Event::ReadoutReady)]);
    assert_eq!(ctx.wifi.attempts, 0);
    assert!(ctx.net.sent.is_empty());
    assert_eq!(ctx.indicator.history, vec![BLINK_SENSORS_MS, 0]);

    let record = ctx.store.record(0).unwrap();
    assert_eq!(record.len(), SENSORS.len());
    for sample in record {
        assert_eq!(sample.status, StatusKind::Success);
        assert_eq!(sample.temperature, 215_000);
    }
    assert_eq!(stored_count(ctx.store.into_scratch()), 1);
}

#[test]
fn sensor_string_is_depowered_before_sleep() {
    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, healthy_bus(18.0), SimScratch::default()));
    run_to_sleep(&mut cycle);
    assert!(!cycle.context_mut().engine.bus_mut().is_powered());
    assert_eq!(cycle.context().timer.disarms, 1);
}

#[test]
fn absent_sensor_uses_every_round() {
    let mut bus = healthy_bus(21.5);
    bus.device_mut(&SENSORS[1]).unwrap().silent = true;

    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, bus, SimScratch::default()));
    run_to_sleep(&mut cycle);

    let ctx = cycle.into_context();
    assert_eq!(ctx.timer.armed.len(), ROUNDS_MAX);
    assert_eq!(ctx.round, ROUNDS_MAX - 1);

    let record = ctx.store.record(0).unwrap();
    assert_eq!(record[0].status, StatusKind::Success);
    assert_eq!(record[0].temperature, 215_000);
    assert_eq!(record[1].status, StatusKind::Silence);
    assert_eq!(record[1].temperature, 0);
    assert_eq!(stored_count(ctx.store.into_scratch()), 1);
}

#[test]
fn checksum_error_recovers_on_next_round() {
    let mut bus = healthy_bus(-10.125);
    bus.device_mut(&SENSORS[2]).unwrap().corrupt_reads = 1;

    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, bus, SimScratch::default()));
    run_to_sleep(&mut cycle);

    let ctx = cycle.context();
    assert_eq!(ctx.timer.armed.len(), 2);
    assert_eq!(ctx.engine.samples(0)[2].status, StatusKind::ChecksumError);
    assert_eq!(ctx.engine.samples(1)[2].status, StatusKind::Success);

    // Both successful rounds of the healthy sensors are averaged.
    let record = ctx.store.record(0).unwrap();
    assert_eq!(record[0].temperature, -101_250);
    assert_eq!(record[2].status, StatusKind::Success);
    assert_eq!(record[2].temperature, -101_250);
}

#[test]
fn stuck_bus_records_bus_errors() {
    let mut bus = healthy_bus(21.5);
    bus.line_stuck_low = true;

    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, bus, SimScratch::default()));
    assert_eq!(run_to_sleep(&mut cycle).duration, Duration::from_secs(900));

    let ctx = cycle.into_context();
    assert_eq!(ctx.timer.armed.len(), ROUNDS_MAX);
    for sample in ctx.store.record(0).unwrap() {
        assert_eq!(sample.status, StatusKind::BusError);
    }
    assert_eq!(stored_count(ctx.store.into_scratch()), 1);
}

#[test]
fn async_runner_reaches_sleep() {
    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, healthy_bus(21.5), SimScratch::default()));
    let request = futures_lite::future::block_on(cycle.run());
    assert_eq!(request.duration, Duration::from_secs(900));
    assert_eq!(cycle.current_state(), Some(StateId::SensorsSave));
}
