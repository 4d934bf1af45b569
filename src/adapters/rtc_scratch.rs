//! RTC scratch memory adapter.
//!
//! Implements [`ScratchMemory`] over a buffer that survives deep sleep.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: a static placed in `.rtc.data` (RTC slow
//!   memory). Initialised on power-on, retained across deep sleep.
//! - **all other targets**: a heap buffer with fault injection for tests.

use crate::app::ports::ScratchMemory;
use crate::error::StorageError;

/// Size of the scratch region in bytes.
pub const RTC_SCRATCH_LEN: usize = 1024;

fn span(offset: usize, len: usize, capacity: usize) -> Result<core::ops::Range<usize>, StorageError> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(offset..end),
        _ => Err(StorageError::OutOfBounds),
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
#[unsafe(link_section = ".rtc.data")]
static mut RTC_SCRATCH: [u8; RTC_SCRATCH_LEN] = [0; RTC_SCRATCH_LEN];

#[cfg(target_os = "espidf")]
pub struct RtcScratch {
    _owned: (),
}

#[cfg(target_os = "espidf")]
impl RtcScratch {
    /// Claim the RTC scratch region.
    ///
    /// # Safety
    ///
    /// At most one `RtcScratch` may exist; it is the only accessor of the
    /// backing static.
    pub unsafe fn take() -> Self {
        Self { _owned: () }
    }
}

#[cfg(target_os = "espidf")]
impl ScratchMemory for RtcScratch {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = span(offset, buf.len(), RTC_SCRATCH_LEN)?;
        // SAFETY: `range` is in bounds and `RtcScratch` is the sole accessor.
        unsafe {
            let src = (&raw const RTC_SCRATCH).cast::<u8>().add(range.start);
            core::ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let range = span(offset, data.len(), RTC_SCRATCH_LEN)?;
        // SAFETY: as in `read`; `&mut self` serialises writers.
        unsafe {
            let dst = (&raw mut RTC_SCRATCH).cast::<u8>().add(range.start);
            core::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation
// ───────────────────────────────────────────────────────────────

/// In-memory scratch region. Move it from one wake cycle to the next to
/// simulate deep sleep.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone)]
pub struct SimScratch {
    bytes: Vec<u8>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

#[cfg(not(target_os = "espidf"))]
impl SimScratch {
    pub fn new(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for SimScratch {
    fn default() -> Self {
        Self::new(RTC_SCRATCH_LEN)
    }
}

#[cfg(not(target_os = "espidf"))]
impl ScratchMemory for SimScratch {
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        if self.fail_reads {
            return Err(StorageError::ReadFailed);
        }
        let range = span(offset, buf.len(), self.bytes.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::WriteFailed);
        }
        let range = span(offset, data.len(), self.bytes.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}
