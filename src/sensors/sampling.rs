//! Multi-round sampling of the configured sensor table.
//!
//! One wake runs up to [`ROUNDS_MAX`] request/readout rounds. After each
//! readout the orchestrator asks [`SamplingEngine::all_valid`] whether every
//! sensor has produced at least one good reading; if not, another round is
//! started. The rounds are then folded into one [`Record`].

use core::time::Duration;

use log::{info, warn};

use super::{Record, Sample, SensorAddress, StatusKind, consolidate};
use crate::app::ports::OneShotTimer;
use crate::config::{MAX_SENSORS, ROUNDS_MAX};
use crate::drivers::ds18b20::Ds18b20;
use crate::drivers::onewire::OneWire;
use crate::error::{Error, Result};
use crate::events::Event;

pub struct SamplingEngine<B> {
    sensor: Ds18b20<B>,
    addresses: &'static [SensorAddress],
    /// `[round][sensor]`, only the first `addresses.len()` columns are used.
    samples: [[Sample; MAX_SENSORS]; ROUNDS_MAX],
}

impl<B: OneWire> SamplingEngine<B> {
    pub fn new(bus: B, addresses: &'static [SensorAddress]) -> Result<Self> {
        if addresses.len() > MAX_SENSORS {
            return Err(Error::Config("sensor table exceeds MAX_SENSORS"));
        }
        if let Some(bad) = addresses.iter().find(|a| !a.is_valid()) {
            warn!("Sampling: address {} fails its ROM CRC", bad);
        }
        Ok(Self {
            sensor: Ds18b20::new(bus),
            addresses,
            samples: [[Sample::default(); MAX_SENSORS]; ROUNDS_MAX],
        })
    }

    pub fn sensor_count(&self) -> usize {
        self.addresses.len()
    }

    pub fn addresses(&self) -> &'static [SensorAddress] {
        self.addresses
    }

    /// Start conversions on every sensor and arm the conversion timer.
    ///
    /// The timer delivers [`Event::ReadoutReady`] when it fires.
    pub fn request_round(&mut self, round: usize, timer: &mut impl OneShotTimer, delay: Duration) {
        let Some(row) = self.samples.get_mut(round) else {
            warn!("Sampling: round {} out of range", round);
            return;
        };
        for (slot, address) in row.iter_mut().zip(self.addresses) {
            *slot = Sample::with_status(self.sensor.request(address));
        }
        info!("Sampling: round {} requested, readout in {:?}", round, delay);
        timer.arm(delay, Event::ReadoutReady);
    }

    /// Collect the conversion results of `round`.
    pub fn readout_round(&mut self, round: usize) {
        let Some(row) = self.samples.get_mut(round) else {
            warn!("Sampling: round {} out of range", round);
            return;
        };
        for (slot, address) in row.iter_mut().zip(self.addresses) {
            *slot = self.sensor.result(address);
            info!("Sampling: round {} sensor {}: {}", round, address, slot);
        }
    }

    /// True when every sensor has at least one `Success` in any round so far.
    pub fn all_valid(&self) -> bool {
        (0..self.addresses.len()).all(|sensor| {
            self.samples
                .iter()
                .any(|row| row[sensor].status == StatusKind::Success)
        })
    }

    /// Samples of one round, one per configured sensor.
    pub fn samples(&self, round: usize) -> &[Sample] {
        match self.samples.get(round) {
            Some(row) => &row[..self.addresses.len()],
            None => &[],
        }
    }

    /// Fold all rounds of this wake into one record.
    pub fn consolidate_samples(&self) -> Record {
        (0..self.addresses.len())
            .map(|sensor| consolidate(self.samples.iter().map(|row| &row[sensor])))
            .collect()
    }

    /// Fold persisted records into the report aggregate.
    pub fn consolidate_records(&self, records: &[Record]) -> Record {
        consolidate_records(records, self.addresses.len())
    }

    /// Switch the sensor string off.
    pub fn depower(&mut self) {
        self.sensor.depower();
    }

    pub fn bus_mut(&mut self) -> &mut B {
        self.sensor.bus_mut()
    }
}

/// Fold the persisted records into one aggregate record, per sensor.
///
/// Records shorter than `nsensors` contribute nothing for the missing
/// columns.
pub fn consolidate_records(records: &[Record], nsensors: usize) -> Record {
    (0..nsensors.min(MAX_SENSORS))
        .map(|sensor| consolidate(records.iter().filter_map(|r| r.get(sensor))))
        .collect()
}
