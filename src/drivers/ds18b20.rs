//! DS18B20 command layer.
//!
//! Every transaction addresses one device with MATCH ROM, so several sensors
//! can share the bus. Conversion is started with [`Ds18b20::request`] and
//! collected with [`Ds18b20::result`] once the conversion delay has passed;
//! waiting is the caller's job.

use log::{debug, warn};

use super::onewire::{OneWire, crc8};
use crate::error::BusFault;
use crate::sensors::{Sample, SensorAddress, StatusKind, TEMPERATURE_SCALE};

pub const CMD_MATCH_ROM: u8 = 0x55;
pub const CMD_CONVERT_T: u8 = 0x44;
pub const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// Scratchpad: temp LSB, temp MSB, TH, TL, config, 3 reserved, CRC.
pub const SCRATCHPAD_LEN: usize = 9;

/// Power-on register value, 85 °C in 1/10000 °C.
pub const RESET_TEMPERATURE: i32 = 850_000;

pub struct Ds18b20<B> {
    bus: B,
}

impl<B: OneWire> Ds18b20<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Start a temperature conversion on one sensor.
    pub fn request(&mut self, address: &SensorAddress) -> StatusKind {
        match self
            .select(address)
            .and_then(|()| self.bus.write_byte(CMD_CONVERT_T))
        {
            Ok(()) => StatusKind::Success,
            Err(e) => {
                warn!("DS18B20 {}: convert request failed: {}", address, e);
                StatusKind::BusError
            }
        }
    }

    /// Read back and validate the last conversion of one sensor.
    pub fn result(&mut self, address: &SensorAddress) -> Sample {
        let scratchpad = match self.read_scratchpad(address) {
            Ok(buf) => buf,
            Err(e) => {
                warn!("DS18B20 {}: scratchpad read failed: {}", address, e);
                return Sample::with_status(StatusKind::BusError);
            }
        };
        let sample = decode_scratchpad(&scratchpad);
        debug!("DS18B20 {}: {}", address, sample);
        sample
    }

    pub fn depower(&mut self) {
        self.bus.depower();
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn select(&mut self, address: &SensorAddress) -> Result<(), BusFault> {
        self.bus.reset()?;
        self.bus.write_byte(CMD_MATCH_ROM)?;
        for &b in address.bytes() {
            self.bus.write_byte(b)?;
        }
        Ok(())
    }

    fn read_scratchpad(&mut self, address: &SensorAddress) -> Result<[u8; SCRATCHPAD_LEN], BusFault> {
        self.select(address)?;
        self.bus.write_byte(CMD_READ_SCRATCHPAD)?;
        let mut buf = [0u8; SCRATCHPAD_LEN];
        for b in &mut buf {
            *b = self.bus.read_byte()?;
        }
        Ok(buf)
    }
}

/// Classify and decode a raw scratchpad.
///
/// Checks run in order: all-0xFF (nobody answered), CRC, then the 85 °C
/// power-on value.
pub fn decode_scratchpad(buf: &[u8; SCRATCHPAD_LEN]) -> Sample {
    if buf.iter().all(|&b| b == 0xFF) {
        return Sample::with_status(StatusKind::Silence);
    }
    if crc8(&buf[..SCRATCHPAD_LEN - 1]) != buf[SCRATCHPAD_LEN - 1] {
        return Sample::with_status(StatusKind::ChecksumError);
    }

    // 12-bit resolution: 1/16 °C per LSB.
    let raw = i16::from_le_bytes([buf[0], buf[1]]) as i32;
    let temperature = raw * TEMPERATURE_SCALE / 16;

    let status = if temperature == RESET_TEMPERATURE {
        StatusKind::ResetValue
    } else {
        StatusKind::Success
    };
    Sample::new(temperature, status)
}
