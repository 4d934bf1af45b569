//! Shared mutable context threaded through every FSM handler.
//!
//! `WakeContext` owns every adapter plus the per-wake bookkeeping (wake
//! index, sampling round, wifi retries, the report aggregate). Nothing in it
//! survives deep sleep except what [`RecordStore`] writes to RTC memory.

use crate::app::ports::{Hardware, Platform};
use crate::config::NodeConfig;
use crate::record_store::RecordStore;
use crate::sensors::{Record, SamplingEngine, SensorAddress};
use crate::error::Result;

/// The shared context passed to every state handler function.
pub struct WakeContext<P: Platform> {
    // -- Domain --
    pub engine: SamplingEngine<P::Bus>,
    pub store: RecordStore<P::Scratch>,

    // -- Adapters --
    pub timer: P::Timer,
    pub wifi: P::Wifi,
    pub net: P::Net,
    pub power: P::Power,
    pub indicator: P::Indicator,

    // -- Configuration --
    pub config: NodeConfig,

    // -- Per-wake state --
    /// Record slot this wake fills, `0..RECORDS_MAX`.
    pub wake_index: usize,
    /// Current sampling round, `0..ROUNDS_MAX`.
    pub round: usize,
    /// Association attempts made after the first failure.
    pub wifi_retries: u8,
    /// Consolidated report, set when the last record slot has been filled.
    pub aggregate: Option<Record>,
    /// Encoded HTTP request, held until the transport reports it sent.
    pub payload: Option<Vec<u8>>,
}

impl<P: Platform> WakeContext<P> {
    pub fn new(hw: Hardware<P>, sensors: &'static [SensorAddress], config: NodeConfig) -> Result<Self> {
        let engine = SamplingEngine::new(hw.bus, sensors)?;
        let store = RecordStore::new(hw.scratch, sensors.len());
        Ok(Self {
            engine,
            store,
            timer: hw.timer,
            wifi: hw.wifi,
            net: hw.net,
            power: hw.power,
            indicator: hw.indicator,
            config,
            wake_index: 0,
            round: 0,
            wifi_retries: 0,
            aggregate: None,
            payload: None,
        })
    }
}
