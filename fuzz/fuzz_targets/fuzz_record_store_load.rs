//! Fuzz target: RTC record store
//!
//! Loads arbitrary scratch images and verifies:
//! - No panics, whatever the header claims
//! - At most `RECORDS_MAX` records are accepted
//! - An accepted image survives a save/load cycle unchanged
//!
//! cargo fuzz run fuzz_record_store_load

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermonode::adapters::rtc_scratch::{RTC_SCRATCH_LEN, SimScratch};
use thermonode::config::{MAX_SENSORS, RECORDS_MAX};
use thermonode::record_store::RecordStore;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, image)) = data.split_first() else {
        return;
    };
    let nsensors = selector as usize % (MAX_SENSORS + 1);

    let mut scratch = SimScratch::default();
    let len = image.len().min(RTC_SCRATCH_LEN);
    scratch.bytes_mut()[..len].copy_from_slice(&image[..len]);

    let mut store = RecordStore::new(scratch, nsensors);
    let count = store.load();
    assert!(count <= RECORDS_MAX);

    let records = store.records(count).to_vec();
    if store.save(count).is_ok() {
        let mut reloaded = RecordStore::new(store.into_scratch(), nsensors);
        assert_eq!(reloaded.load(), count);
        assert_eq!(reloaded.records(count), &records[..]);
    }
});
