//! Fuzz target: DS18B20 scratchpad decoding
//!
//! Feeds arbitrary 9-byte scratchpads to `decode_scratchpad` and checks:
//! - No panics
//! - Only `Success` and `ResetValue` carry a temperature
//! - A scratchpad that passes the CRC is never reported as a checksum error
//!
//! cargo fuzz run fuzz_scratchpad_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermonode::drivers::ds18b20::{SCRATCHPAD_LEN, decode_scratchpad};
use thermonode::drivers::onewire::crc8;
use thermonode::sensors::StatusKind;

fuzz_target!(|data: &[u8]| {
    let Ok(buf) = <[u8; SCRATCHPAD_LEN]>::try_from(data) else {
        return;
    };
    let sample = decode_scratchpad(&buf);

    match sample.status {
        StatusKind::Success | StatusKind::ResetValue => {}
        _ => assert_eq!(sample.temperature, 0),
    }
    if crc8(&buf) == 0 && buf.iter().any(|&b| b != 0xFF) {
        assert_ne!(sample.status, StatusKind::ChecksumError);
    }
});
