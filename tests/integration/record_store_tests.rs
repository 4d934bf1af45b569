//! RTC record store as seen from the wake cycle: damaged or foreign images
//! are discarded at boot and never reach the report.

use thermonode::adapters::rtc_scratch::SimScratch;
use thermonode::config::{RECORDS_MAX, SENSORS};
use thermonode::events::EventChannel;
use thermonode::fsm::StateId;
use thermonode::record_store::{BASE_OFFSET, HEADER_LEN, RecordStore, SIGNATURE};
use thermonode::sensors::StatusKind;

use crate::mock_hw::{boot, hardware, healthy_bus, run_to_sleep, scratch_with_records, stored_count};

fn wake_index_after_boot(scratch: SimScratch) -> usize {
    let events = EventChannel::new();
    let cycle = boot(&events, hardware(&events, healthy_bus(21.5), scratch));
    cycle.context().wake_index
}

#[test]
fn blank_memory_starts_at_slot_zero() {
    assert_eq!(wake_index_after_boot(SimScratch::default()), 0);
}

#[test]
fn stored_records_set_the_wake_index() {
    for count in 0..RECORDS_MAX {
        assert_eq!(wake_index_after_boot(scratch_with_records(count, 200_000)), count);
    }
}

#[test]
fn full_store_is_clamped_to_last_slot() {
    let scratch = scratch_with_records(RECORDS_MAX, 200_000);
    assert_eq!(wake_index_after_boot(scratch), RECORDS_MAX - 1);
}

#[test]
fn garbage_header_is_discarded() {
    let mut scratch = scratch_with_records(2, 200_000);
    scratch.bytes_mut()[BASE_OFFSET] ^= 0xFF;
    assert_eq!(wake_index_after_boot(scratch), 0);
}

#[test]
fn oversized_count_is_discarded() {
    let mut scratch = scratch_with_records(2, 200_000);
    scratch.bytes_mut()[BASE_OFFSET + 4] = RECORDS_MAX as u8 + 1;
    assert_eq!(wake_index_after_boot(scratch), 0);
}

#[test]
fn image_from_other_sensor_table_is_discarded() {
    let mut store = RecordStore::new(SimScratch::default(), SENSORS.len() - 1);
    store.save(2).unwrap();
    assert_eq!(wake_index_after_boot(store.into_scratch()), 0);
}

#[test]
fn unknown_status_code_rejects_every_record() {
    let mut scratch = scratch_with_records(3, 200_000);
    // Status byte of the second sample in record 1.
    let record_len = SENSORS.len() * 8;
    let offset = BASE_OFFSET + HEADER_LEN + record_len + 8 + 4;
    scratch.bytes_mut()[offset] = 0x7E;

    let mut store = RecordStore::new(scratch, SENSORS.len());
    assert_eq!(store.load(), 0);
    for record in store.records(RECORDS_MAX) {
        assert!(record.iter().all(|s| s.status == StatusKind::Unprobed));
    }
}

#[test]
fn unreadable_memory_counts_as_empty() {
    let mut scratch = scratch_with_records(2, 200_000);
    scratch.fail_reads = true;
    assert_eq!(wake_index_after_boot(scratch), 0);
}

#[test]
fn failed_save_still_sleeps() {
    let mut scratch = SimScratch::default();
    scratch.fail_writes = true;

    let events = EventChannel::new();
    let mut cycle = boot(&events, hardware(&events, healthy_bus(21.5), scratch));
    run_to_sleep(&mut cycle);
    assert_eq!(cycle.current_state(), Some(StateId::SensorsSave));

    let mut scratch = cycle.into_context().store.into_scratch();
    scratch.fail_writes = false;
    assert_eq!(stored_count(scratch), 0);
}

#[test]
fn header_layout_is_stable() {
    let scratch = scratch_with_records(1, 200_000);
    let header = &scratch.bytes()[BASE_OFFSET..BASE_OFFSET + HEADER_LEN];
    assert_eq!(&header[..4], &SIGNATURE.to_le_bytes());
    assert_eq!(header[4], 1);
    assert_eq!(header[5] as usize, SENSORS.len() * 8);
}
