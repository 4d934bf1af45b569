//! Host-side 1-Wire bus with simulated DS18B20 devices.
//!
//! Works at the byte level: it decodes reset, MATCH ROM, CONVERT T and
//! READ SCRATCHPAD the way the devices do and answers with real
//! scratchpads (valid CRC unless told otherwise). A device that has not
//! converted since power-up answers with the 85 °C power-on value; reads
//! nobody drives return 0xFF.

use std::collections::VecDeque;

use crate::drivers::ds18b20::{CMD_CONVERT_T, CMD_MATCH_ROM, CMD_READ_SCRATCHPAD, SCRATCHPAD_LEN};
use crate::drivers::onewire::{OneWire, crc8};
use crate::error::BusFault;
use crate::sensors::SensorAddress;

/// Power-on register value (85 °C).
const RAW_POWER_ON: i16 = 0x0550;

/// Scratchpad for a raw 1/16 °C register value.
pub fn scratchpad_for(raw: i16) -> [u8; SCRATCHPAD_LEN] {
    let [lsb, msb] = raw.to_le_bytes();
    let mut buf = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0];
    buf[SCRATCHPAD_LEN - 1] = crc8(&buf[..SCRATCHPAD_LEN - 1]);
    buf
}

#[derive(Debug, Clone)]
pub struct SimDevice {
    pub address: SensorAddress,
    /// Temperature register, 1/16 °C.
    pub raw: i16,
    /// The next `corrupt_reads` scratchpad reads carry a bad CRC.
    pub corrupt_reads: u32,
    /// Never answers.
    pub silent: bool,
    converted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Bytes are ignored until the next reset.
    Idle,
    /// Waiting for a ROM command.
    Rom,
    /// Collecting the 8 address bytes of MATCH ROM.
    Match,
    /// Waiting for a function command.
    Function,
}

pub struct SimBus {
    devices: Vec<SimDevice>,
    phase: Phase,
    rom: Vec<u8>,
    selected: Option<usize>,
    out: VecDeque<u8>,
    powered: bool,
    /// Data line shorted to ground.
    pub line_stuck_low: bool,
    pub resets: u32,
    pub conversions: u32,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            phase: Phase::Idle,
            rom: Vec::with_capacity(8),
            selected: None,
            out: VecDeque::new(),
            powered: true,
            line_stuck_low: false,
            resets: 0,
            conversions: 0,
        }
    }

    /// Attach a device reading `celsius` (rounded to 1/16 °C).
    pub fn with_device(mut self, address: SensorAddress, celsius: f32) -> Self {
        self.devices.push(SimDevice {
            address,
            raw: (celsius * 16.0).round() as i16,
            corrupt_reads: 0,
            silent: false,
            converted: false,
        });
        self
    }

    pub fn device_mut(&mut self, address: &SensorAddress) -> Option<&mut SimDevice> {
        self.devices.iter_mut().find(|d| d.address == *address)
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn answering(&self) -> bool {
        self.devices.iter().any(|d| !d.silent)
    }

    fn on_function(&mut self, command: u8) {
        let Some(index) = self.selected else {
            self.phase = Phase::Idle;
            return;
        };
        let device = &mut self.devices[index];
        match command {
            CMD_CONVERT_T => {
                device.converted = true;
                self.conversions += 1;
            }
            CMD_READ_SCRATCHPAD => {
                let raw = if device.converted { device.raw } else { RAW_POWER_ON };
                let mut scratchpad = scratchpad_for(raw);
                if device.corrupt_reads > 0 {
                    device.corrupt_reads -= 1;
                    scratchpad[SCRATCHPAD_LEN - 1] ^= 0x5A;
                }
                self.out.extend(scratchpad);
            }
            _ => {}
        }
        self.phase = Phase::Idle;
    }
}

impl OneWire for SimBus {
    fn reset(&mut self) -> Result<(), BusFault> {
        self.resets += 1;
        self.phase = Phase::Idle;
        self.selected = None;
        self.out.clear();
        if self.line_stuck_low {
            return Err(BusFault::LineHeldLow);
        }
        if !self.powered || !self.answering() {
            return Err(BusFault::NoPresence);
        }
        self.phase = Phase::Rom;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BusFault> {
        match self.phase {
            Phase::Idle => {}
            Phase::Rom => {
                if byte == CMD_MATCH_ROM {
                    self.rom.clear();
                    self.phase = Phase::Match;
                } else {
                    self.phase = Phase::Idle;
                }
            }
            Phase::Match => {
                self.rom.push(byte);
                if self.rom.len() == 8 {
                    self.selected = self
                        .devices
                        .iter()
                        .position(|d| !d.silent && d.address.bytes()[..] == self.rom[..]);
                    self.phase = Phase::Function;
                }
            }
            Phase::Function => self.on_function(byte),
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, BusFault> {
        Ok(self.out.pop_front().unwrap_or(0xFF))
    }

    fn depower(&mut self) {
        self.powered = false;
        for device in &mut self.devices {
            device.converted = false;
        }
    }
}
