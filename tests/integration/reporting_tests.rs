//! Reporting phase: the last record slot triggers wifi, transport and
//! report delivery, and every failure path still ends in deep sleep.

use std::time::Duration;

use thermonode::adapters::rtc_scratch::SimScratch;
use thermonode::config::{RECORDS_MAX, SENSORS};
use thermonode::events::EventChannel;
use thermonode::fsm::StateId;
use thermonode::fsm::states::{BLINK_NET_MS, BLINK_WIFI_FAIL_MS, BLINK_WIFI_MS};
use thermonode::sensors::StatusKind;

use crate::mock_hw::{
    SimCycle, boot, hardware, healthy_bus, run_to_sleep, scratch_with_records, stored_count, wake_once,
};

/// Boot with `RECORDS_MAX - 1` records already stored, so this wake reports.
fn reporting_cycle<'q>(events: &'q EventChannel, tweak: impl FnOnce(&mut crate::mock_hw::SimHardware<'q>)) -> SimCycle<'q> {
    let scratch = scratch_with_records(RECORDS_MAX - 1, 215_000);
    let mut hw = hardware(events, healthy_bus(21.5), scratch);
    tweak(&mut hw);
    boot(events, hw)
}

#[test]
fn fourth_wake_reports_average_and_clears_store() {
    // Three sampling-only wakes at 20, 21 and 22 °C.
    let mut scratch = SimScratch::default();
    for (wake, celsius) in [20.0, 21.0, 22.0].into_iter().enumerate() {
        scratch = wake_once(scratch, celsius);
        assert_eq!(stored_count(scratch.clone()), wake + 1);
    }

    // Fourth wake at 23 °C fills the last slot and reports.
    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, healthy_bus(23.0), scratch));
    assert_eq!(cycle.context().wake_index, RECORDS_MAX - 1);
    assert_eq!(run_to_sleep(&mut cycle).duration, Duration::from_secs(900));
    assert_eq!(cycle.current_state(), Some(StateId::WifiShutdownDone));

    let ctx = cycle.into_context();
    let aggregate = ctx.aggregate.as_ref().unwrap();
    for sample in aggregate {
        assert_eq!(sample.status, StatusKind::Success);
        assert_eq!(sample.temperature, 215_000);
    }

    assert_eq!(ctx.net.sent.len(), 1);
    let request = String::from_utf8(ctx.net.sent[0].clone()).unwrap();
    assert!(request.starts_with("POST / HTTP/1.0\r\nHost: esp8266-ds18b20\r\n"));
    assert!(request.contains(r#""28:1c:f0:1e:00:00:80:3f":{"value":"215000","status":"success"}"#));
    assert!(request.ends_with(r#""millivolt":"3012","rssi":"-67"}"#));

    let (head, body) = request.split_once("\r\n\r\n").unwrap();
    assert!(head.contains(&format!("Content-Length: {}", body.len())));
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["sensors"].as_object().unwrap().len(), SENSORS.len());

    assert!(ctx.payload.is_none());
    assert_eq!(ctx.wifi.attempts, 1);
    assert_eq!(ctx.wifi.disassociations, 1);
    assert_eq!(ctx.net.disconnects, 1);
    assert_eq!(ctx.indicator.current(), 0);
    assert!(ctx.indicator.history.contains(&BLINK_WIFI_MS));
    assert!(ctx.indicator.history.contains(&BLINK_NET_MS));
    assert_eq!(stored_count(ctx.store.into_scratch()), 0);
}

#[test]
fn wake_after_report_starts_a_new_batch() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |_| {});
    run_to_sleep(&mut cycle);
    let scratch = cycle.into_context().store.into_scratch();

    let scratch = wake_once(scratch, 19.0);
    assert_eq!(stored_count(scratch), 1);
}

#[test]
fn wifi_recovers_after_failed_attempts() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| hw.wifi.fail_attempts = 2);
    run_to_sleep(&mut cycle);

    let ctx = cycle.into_context();
    assert_eq!(ctx.wifi_retries, 2);
    assert_eq!(ctx.wifi.attempts, 3);
    assert_eq!(ctx.net.sent.len(), 1);
}

#[test]
fn wifi_gives_up_after_retries_and_drops_report() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| hw.wifi.fail_attempts = u32::MAX);
    assert_eq!(run_to_sleep(&mut cycle).duration, Duration::from_secs(900));
    assert_eq!(cycle.current_state(), Some(StateId::WifiShutdownDone));

    let ctx = cycle.into_context();
    assert_eq!(ctx.wifi.attempts, 1 + u32::from(ctx.config.wifi_max_retries));
    assert_eq!(ctx.wifi.disassociations, 1);
    assert!(ctx.net.sent.is_empty());
    assert_eq!(ctx.net.disconnects, 0);
    assert!(ctx.indicator.history.contains(&BLINK_WIFI_FAIL_MS));
    // The store was cleared before the report was attempted.
    assert_eq!(stored_count(ctx.store.into_scratch()), 0);
}

#[test]
fn wifi_that_cannot_start_counts_as_failure() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| hw.wifi.refuse_start = true);
    run_to_sleep(&mut cycle);

    let ctx = cycle.into_context();
    assert_eq!(ctx.wifi_retries, ctx.config.wifi_max_retries);
    assert_eq!(ctx.wifi.attempts, 0);
    assert!(ctx.net.sent.is_empty());
}

#[test]
fn connect_failure_disconnects_and_shuts_wifi_down() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| hw.net.connect_fails = true);
    run_to_sleep(&mut cycle);
    assert_eq!(cycle.current_state(), Some(StateId::WifiShutdownDone));

    let ctx = cycle.into_context();
    assert!(ctx.net.sent.is_empty());
    assert_eq!(ctx.net.disconnects, 1);
    assert_eq!(ctx.wifi.disassociations, 1);
}

#[test]
fn connect_that_cannot_start_takes_the_failure_path() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| hw.net.refuse_connect = true);
    run_to_sleep(&mut cycle);

    let ctx = cycle.into_context();
    assert!(!ctx.net.is_connected());
    assert_eq!(ctx.net.disconnects, 1);
    assert_eq!(ctx.wifi.disassociations, 1);
}

#[test]
fn send_failure_still_closes_connection() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| hw.net.send_fails = true);
    run_to_sleep(&mut cycle);
    assert_eq!(cycle.current_state(), Some(StateId::WifiShutdownDone));

    let ctx = cycle.into_context();
    assert!(ctx.net.sent.is_empty());
    assert!(ctx.payload.is_none());
    assert_eq!(ctx.net.disconnects, 1);
    assert_eq!(ctx.wifi.disassociations, 1);
}

#[test]
fn missing_rssi_is_reported_as_zero() {
    let events = EventChannel::new();
    let mut cycle = reporting_cycle(&events, |hw| {
        hw.wifi.rssi = None;
        hw.power.millivolts = 2750;
    });
    run_to_sleep(&mut cycle);

    let ctx = cycle.into_context();
    let request = String::from_utf8(ctx.net.sent[0].clone()).unwrap();
    assert!(request.ends_with(r#""millivolt":"2750","rssi":"0"}"#));
}
