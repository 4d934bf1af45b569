//! Bit-banged 1-Wire bus master.
//!
//! The data line is open drain: "release" means driving the output high and
//! letting the external pull-up take the line. A second GPIO switches the
//! sensor supply so the string can be powered down before deep sleep.
//!
//! Slot timings (µs):
//!
//! ```text
//!  reset    low 500 │ release │ +100 sample (must be LOW)  │ +500 sample (must be HIGH)
//!  write 0  low 58  │ release 6
//!  write 1  low 8   │ release 56
//!  read     low 5   │ release │ +10 sample │ +50
//! ```
//!
//! Every bit slot runs with interrupts masked; masking is restored between
//! bits so the scheduler is never blocked for more than one slot.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::BusFault;

/// Byte-level 1-Wire bus access.
///
/// Implemented by [`OneWireBus`] on real pins and by the host bus simulator.
pub trait OneWire {
    /// Issue a reset pulse and check for a presence pulse.
    ///
    /// Byte I/O after a failed reset is meaningless.
    fn reset(&mut self) -> Result<(), BusFault>;

    /// Write one byte, LSB first.
    fn write_byte(&mut self, byte: u8) -> Result<(), BusFault>;

    /// Read one byte, LSB first.
    fn read_byte(&mut self) -> Result<u8, BusFault>;

    /// Cut sensor supply power.
    fn depower(&mut self);
}

/// Dallas/Maxim CRC8 (polynomial x⁸+x⁵+x⁴+1, reflected 0x8C, init 0).
///
/// Running it over a block that ends with its own CRC yields 0.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

// ---------------------------------------------------------------------------
// Interrupt masking
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
fn masked<R>(f: impl FnOnce() -> R) -> R {
    esp_idf_hal::interrupt::free(f)
}

#[cfg(not(target_os = "espidf"))]
fn masked<R>(f: impl FnOnce() -> R) -> R {
    critical_section::with(|_| f())
}

// ---------------------------------------------------------------------------
// Pin-level bus master
// ---------------------------------------------------------------------------

const RESET_LOW_US: u32 = 500;
const PRESENCE_SAMPLE_US: u32 = 100;
const PRESENCE_END_US: u32 = 500;

const WRITE_0_LOW_US: u32 = 58;
const WRITE_0_RELEASE_US: u32 = 6;
const WRITE_1_LOW_US: u32 = 8;
const WRITE_1_RELEASE_US: u32 = 56;

const READ_LOW_US: u32 = 5;
const READ_SAMPLE_US: u32 = 10;
const READ_SLOT_END_US: u32 = 50;

/// 1-Wire master over an open-drain data pin, a power-enable pin and a
/// busy-wait delay.
pub struct OneWireBus<D, P, T> {
    data: D,
    power: P,
    delay: T,
}

impl<D, P, T> OneWireBus<D, P, T>
where
    D: InputPin + OutputPin,
    P: OutputPin,
    T: DelayNs,
{
    /// Take ownership of the pins, power the sensors and release the line.
    pub fn new(mut data: D, mut power: P, delay: T) -> Result<Self, BusFault> {
        power.set_high().map_err(|_| BusFault::Pin)?;
        data.set_high().map_err(|_| BusFault::Pin)?;
        Ok(Self { data, power, delay })
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BusFault> {
        let (low, release) = if bit {
            (WRITE_1_LOW_US, WRITE_1_RELEASE_US)
        } else {
            (WRITE_0_LOW_US, WRITE_0_RELEASE_US)
        };
        let Self { data, delay, .. } = self;

        masked(|| {
            data.set_low().map_err(|_| BusFault::Pin)?;
            delay.delay_us(low);
            data.set_high().map_err(|_| BusFault::Pin)?;
            delay.delay_us(release);
            Ok(())
        })
    }

    fn read_bit(&mut self) -> Result<bool, BusFault> {
        let Self { data, delay, .. } = self;

        masked(|| {
            data.set_low().map_err(|_| BusFault::Pin)?;
            delay.delay_us(READ_LOW_US);
            data.set_high().map_err(|_| BusFault::Pin)?;
            delay.delay_us(READ_SAMPLE_US);
            let bit = data.is_high().map_err(|_| BusFault::Pin)?;
            delay.delay_us(READ_SLOT_END_US);
            Ok(bit)
        })
    }

    /// Give the pins back (used by tests and on teardown).
    pub fn release(self) -> (D, P, T) {
        (self.data, self.power, self.delay)
    }
}

impl<D, P, T> OneWire for OneWireBus<D, P, T>
where
    D: InputPin + OutputPin,
    P: OutputPin,
    T: DelayNs,
{
    fn reset(&mut self) -> Result<(), BusFault> {
        self.data.set_low().map_err(|_| BusFault::Pin)?;
        self.delay.delay_us(RESET_LOW_US);
        self.data.set_high().map_err(|_| BusFault::Pin)?;

        self.delay.delay_us(PRESENCE_SAMPLE_US);
        if self.data.is_high().map_err(|_| BusFault::Pin)? {
            return Err(BusFault::NoPresence);
        }

        self.delay.delay_us(PRESENCE_END_US);
        if self.data.is_low().map_err(|_| BusFault::Pin)? {
            return Err(BusFault::LineHeldLow);
        }
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BusFault> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, BusFault> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    fn depower(&mut self) {
        if self.power.set_low().is_err() {
            log::warn!("1-Wire: could not switch sensor power off");
        }
    }
}
