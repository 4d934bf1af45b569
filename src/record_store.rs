//! Persistent record store in RTC scratch memory.
//!
//! Layout (little endian, offsets in bytes):
//!
//! ```text
//!  BASE+0   u32  signature 0xDEADBEEF
//!  BASE+4   u8   record count
//!  BASE+5   u8   record size
//!  BASE+6   u16  padding
//!  BASE+8   record 0   (record size rounded up to 4 bytes)
//!  ...      record RECORDS_MAX-1
//! ```
//!
//! A record is one 8-byte slot per sensor: `i32` temperature, `u8` status
//! code, 3 bytes of zero padding.
//!
//! The header is the only authority on how much of the store is valid. A
//! load either accepts the header and every record it announces, or rejects
//! the lot and reports zero records.

use core::fmt;

use log::{info, warn};

use crate::app::ports::ScratchMemory;
use crate::config::{MAX_SENSORS, RECORDS_MAX};
use crate::error::StorageError;
use crate::sensors::{Record, Sample, StatusKind};

/// Byte offset of the header inside scratch memory.
pub const BASE_OFFSET: usize = 256;
pub const SIGNATURE: u32 = 0xDEAD_BEEF;
pub const HEADER_LEN: usize = 8;
/// Encoded size of one sample.
pub const SAMPLE_LEN: usize = 8;

/// Scratch bytes needed for a store of `nsensors`.
pub const fn region_len(nsensors: usize) -> usize {
    BASE_OFFSET + HEADER_LEN + RECORDS_MAX * round_up4(nsensors * SAMPLE_LEN)
}

const fn round_up4(n: usize) -> usize {
    (n + 3) & !3
}

/// Why a stored image was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejected {
    Read(StorageError),
    Signature(u32),
    RecordSize(u8),
    Count(u8),
    Status(u8),
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "read failed: {e}"),
            Self::Signature(sig) => write!(f, "bad signature 0x{sig:08X}"),
            Self::RecordSize(size) => write!(f, "record size {size} does not match"),
            Self::Count(n) => write!(f, "record count {n} exceeds {RECORDS_MAX}"),
            Self::Status(code) => write!(f, "unknown status code 0x{code:02X}"),
        }
    }
}

pub struct RecordStore<S> {
    scratch: S,
    nsensors: usize,
    records: [Record; RECORDS_MAX],
}

impl<S: ScratchMemory> RecordStore<S> {
    pub fn new(scratch: S, nsensors: usize) -> Self {
        let nsensors = nsensors.min(MAX_SENSORS);
        Self {
            scratch,
            nsensors,
            records: core::array::from_fn(|_| unprobed(nsensors)),
        }
    }

    /// Encoded size of one record.
    pub fn record_size(&self) -> u8 {
        (self.nsensors * SAMPLE_LEN) as u8
    }

    fn record_offset(&self, index: usize) -> usize {
        BASE_OFFSET + HEADER_LEN + index * round_up4(self.record_size() as usize)
    }

    /// Restore records from scratch memory.
    ///
    /// Returns the number of valid records, or 0 when the store is absent
    /// or damaged (in which case every in-memory record is reset).
    pub fn load(&mut self) -> usize {
        match self.try_load() {
            Ok(count) => {
                info!("RecordStore: loaded {} record(s)", count);
                count
            }
            Err(reason) => {
                warn!("RecordStore: discarding stored records: {}", reason);
                self.records = core::array::from_fn(|_| unprobed(self.nsensors));
                0
            }
        }
    }

    fn try_load(&mut self) -> Result<usize, Rejected> {
        let mut header = [0u8; HEADER_LEN];
        self.scratch
            .read(BASE_OFFSET, &mut header)
            .map_err(Rejected::Read)?;

        let signature = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if signature != SIGNATURE {
            return Err(Rejected::Signature(signature));
        }
        let count = header[4];
        let size = header[5];
        if size != self.record_size() {
            return Err(Rejected::RecordSize(size));
        }
        if count as usize > RECORDS_MAX {
            return Err(Rejected::Count(count));
        }

        let mut loaded: [Record; RECORDS_MAX] = core::array::from_fn(|_| unprobed(self.nsensors));
        let mut block = [0u8; MAX_SENSORS * SAMPLE_LEN];
        let block = &mut block[..size as usize];
        for (index, record) in loaded.iter_mut().enumerate().take(count as usize) {
            self.scratch
                .read(self.record_offset(index), block)
                .map_err(Rejected::Read)?;
            *record = decode_record(block)?;
        }

        self.records = loaded;
        Ok(count as usize)
    }

    /// Persist the header announcing `count` records, then those records.
    ///
    /// `save(0)` empties the store.
    pub fn save(&mut self, count: usize) -> Result<(), StorageError> {
        if count > RECORDS_MAX {
            return Err(StorageError::TooManyRecords);
        }

        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&SIGNATURE.to_le_bytes());
        header[4] = count as u8;
        header[5] = self.record_size();
        self.scratch.write(BASE_OFFSET, &header)?;

        let mut block = [0u8; MAX_SENSORS * SAMPLE_LEN];
        let len = self.record_size() as usize;
        for index in 0..count {
            encode_record(&self.records[index], &mut block[..len]);
            self.scratch.write(self.record_offset(index), &block[..len])?;
        }
        info!("RecordStore: saved {} record(s)", count);
        Ok(())
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Replace record `index`. Out-of-range indices are ignored.
    pub fn set_record(&mut self, index: usize, record: Record) {
        match self.records.get_mut(index) {
            Some(slot) => *slot = record,
            None => warn!("RecordStore: record index {} out of range", index),
        }
    }

    /// The first `count` records.
    pub fn records(&self, count: usize) -> &[Record] {
        &self.records[..count.min(RECORDS_MAX)]
    }

    pub fn scratch(&self) -> &S {
        &self.scratch
    }

    #[cfg(test)]
    fn scratch_mut(&mut self) -> &mut S {
        &mut self.scratch
    }

    pub fn into_scratch(self) -> S {
        self.scratch
    }
}

fn unprobed(nsensors: usize) -> Record {
    (0..nsensors).map(|_| Sample::default()).collect()
}

fn encode_record(record: &Record, out: &mut [u8]) {
    out.fill(0);
    for (slot, sample) in out.chunks_exact_mut(SAMPLE_LEN).zip(record) {
        slot[..4].copy_from_slice(&sample.temperature.to_le_bytes());
        slot[4] = sample.status.to_wire();
    }
}

fn decode_record(block: &[u8]) -> Result<Record, Rejected> {
    let mut record = Record::new();
    for slot in block.chunks_exact(SAMPLE_LEN) {
        let temperature = i32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
        let status = StatusKind::from_wire(slot[4]).ok_or(Rejected::Status(slot[4]))?;
        record
            .push(Sample::new(temperature, status))
            .map_err(|_| Rejected::RecordSize(block.len() as u8))?;
    }
    Ok(record)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn load_never_panics_on_garbage(bytes in proptest::collection::vec(any::<u8>(), 0..600)) {
            struct Buf(Vec<u8>);
            impl ScratchMemory for Buf {
                fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
                    let src = self.0.get(offset..offset + buf.len()).ok_or(StorageError::ReadFailed)?;
                    buf.copy_from_slice(src);
                    Ok(())
                }
                fn write(&mut self, _: usize, _: &[u8]) -> Result<(), StorageError> {
                    Err(StorageError::WriteFailed)
                }
            }
            let mut s = RecordStore::new(Buf(bytes), 7);
            let n = s.load();
            prop_assert!(n <= RECORDS_MAX);
        }
    }
}
