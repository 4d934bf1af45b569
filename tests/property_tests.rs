//! Property and fuzz-style tests for robustness of core data structures.
//!
//! Runs on host (x86_64) only; proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use thermonode::adapters::rtc_scratch::SimScratch;
use thermonode::app::payload::build_body;
use thermonode::config::{MAX_SENSORS, RECORDS_MAX, SENSORS};
use thermonode::drivers::ds18b20::{SCRATCHPAD_LEN, decode_scratchpad};
use thermonode::drivers::onewire::crc8;
use thermonode::record_store::RecordStore;
use thermonode::sensors::{Record, Sample, StatusKind, consolidate, consolidate_records};

fn any_status() -> impl Strategy<Value = StatusKind> {
    prop::sample::select(StatusKind::ALL.to_vec())
}

fn any_sample() -> impl Strategy<Value = Sample> {
    (-550_000i32..=1_250_000, any_status()).prop_map(|(t, s)| Sample::new(t, s))
}

fn any_record(len: usize) -> impl Strategy<Value = Record> {
    prop::collection::vec(any_sample(), len).prop_map(|v| v.into_iter().collect())
}

// ── Scratchpad decoding ───────────────────────────────────────

proptest! {
    /// Any single flipped bit in a valid scratchpad is caught by the CRC.
    #[test]
    fn scratchpad_single_bit_flip_is_detected(
        raw in any::<i16>(),
        bit in 0usize..(SCRATCHPAD_LEN * 8),
    ) {
        let mut buf = [0u8; SCRATCHPAD_LEN];
        buf[..2].copy_from_slice(&raw.to_le_bytes());
        buf[2..8].copy_from_slice(&[0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10]);
        buf[8] = crc8(&buf[..8]);

        buf[bit / 8] ^= 1 << (bit % 8);
        prop_assert_eq!(decode_scratchpad(&buf).status, StatusKind::ChecksumError);
    }

    /// Decoding arbitrary bytes never panics and a success is always in
    /// the representable DS18B20 range.
    #[test]
    fn scratchpad_decode_is_total(buf in any::<[u8; SCRATCHPAD_LEN]>()) {
        let sample = decode_scratchpad(&buf);
        if sample.status == StatusKind::Success {
            prop_assert!((-2_048 * 10_000..2_048 * 10_000).contains(&sample.temperature));
        } else if sample.status != StatusKind::ResetValue {
            prop_assert_eq!(sample.temperature, 0);
        }
    }
}

// ── Consolidation ─────────────────────────────────────────────

proptest! {
    /// The consolidated status is the best input status and the mean lies
    /// between the smallest and largest successful reading.
    #[test]
    fn consolidate_bounds(samples in prop::collection::vec(any_sample(), 1..8)) {
        let out = consolidate(&samples);
        let best = samples.iter().map(|s| s.status).max().unwrap();
        prop_assert_eq!(out.status, best);

        let ok: Vec<i32> = samples
            .iter()
            .filter(|s| s.status == StatusKind::Success)
            .map(|s| s.temperature)
            .collect();
        if ok.is_empty() {
            prop_assert_eq!(out.temperature, 0);
        } else {
            prop_assert!(out.temperature >= *ok.iter().min().unwrap());
            prop_assert!(out.temperature <= *ok.iter().max().unwrap());
        }
    }

    /// Record consolidation works column by column.
    #[test]
    fn consolidate_records_is_per_sensor(
        records in prop::collection::vec(any_record(SENSORS.len()), 1..=RECORDS_MAX),
    ) {
        let out = consolidate_records(&records, SENSORS.len());
        prop_assert_eq!(out.len(), SENSORS.len());
        for (sensor, sample) in out.iter().enumerate() {
            let column: Vec<Sample> = records.iter().map(|r| r[sensor]).collect();
            prop_assert_eq!(*sample, consolidate(&column));
        }
    }
}

// ── Record store ──────────────────────────────────────────────

proptest! {
    /// Whatever is saved is loaded back unchanged.
    #[test]
    fn record_store_save_then_load(
        records in prop::collection::vec(any_record(SENSORS.len()), 0..=RECORDS_MAX),
    ) {
        let mut store = RecordStore::new(SimScratch::default(), SENSORS.len());
        for (index, record) in records.iter().enumerate() {
            store.set_record(index, record.clone());
        }
        store.save(records.len()).unwrap();

        let mut reloaded = RecordStore::new(store.into_scratch(), SENSORS.len());
        prop_assert_eq!(reloaded.load(), records.len());
        prop_assert_eq!(reloaded.records(records.len()), &records[..]);
    }

    /// Arbitrary scratch contents never panic and never yield more than
    /// RECORDS_MAX records.
    #[test]
    fn record_store_load_garbage(
        nsensors in 0usize..=MAX_SENSORS,
        bytes in prop::collection::vec(any::<u8>(), 1024),
    ) {
        let mut scratch = SimScratch::default();
        scratch.bytes_mut().copy_from_slice(&bytes);
        let mut store = RecordStore::new(scratch, nsensors);
        prop_assert!(store.load() <= RECORDS_MAX);
    }
}

// ── Report body ───────────────────────────────────────────────

proptest! {
    /// The body is always valid JSON with one entry per sensor.
    #[test]
    fn report_body_is_json(
        samples in prop::collection::vec(any_sample(), SENSORS.len()),
        millivolts in 0u32..7_000,
        rssi in prop::option::of(-100i8..0),
    ) {
        let body = build_body(&SENSORS, &samples, millivolts, rssi).unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        prop_assert_eq!(json["sensors"].as_object().unwrap().len(), SENSORS.len());
        let millivolt_text = millivolts.to_string();
        prop_assert_eq!(json["millivolt"].as_str(), Some(millivolt_text.as_str()));
    }
}
