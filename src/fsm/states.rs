//! Concrete state handler functions and table builder.
//!
//! Each state is one plain `fn` pointer, generic over the [`Platform`], no
//! closures, no dynamic dispatch.
//!
//! ```text
//!  SENSORS_START ──[timer]──▶ SENSORS_READOUT ──▶ SENSORS_DONE
//!        ▲                                          │   │   │
//!        └──────────[not all valid, rounds left]────┘   │   │
//!                                                       │   │
//!         SENSORS_SAVE ◀──[records not full]────────────┘   │
//!              │                                            │
//!           (sleep)        SENSORS_SEND ◀──[records full]───┘
//!                               │
//!                               ▼
//!  WIFI_SETUP_START ──[fail]──▶ WIFI_SETUP_FAIL ──[retries left]──▶ WIFI_SETUP_START
//!        │                             │
//!     [assoc]                  [retries exhausted]
//!        ▼                             ▼
//!  WIFI_SETUP_DONE             WIFI_SHUTDOWN_START ──▶ WIFI_SHUTDOWN_DONE ──▶ (sleep)
//!        │                             ▲
//!        ▼                             │
//!  NET_CONNECT_START ──[fail]──▶ NET_CONNECT_FAIL ──┐
//!        │                                          │
//!    [connected]                                    ▼
//!        ▼                                  NET_DISCONNECT_DONE
//!  NET_CONNECT_DONE ──[sent]──▶ NET_DATA_SENT ──────┘
//! ```
//!
//! An adapter call that cannot even be started is treated as if it had
//! completed with the state's failure (or terminal) successor, so the cycle
//! always ends in deep sleep.

use log::{info, warn};

use super::context::WakeContext;
use super::{Outcome, StateDescriptor, StateHandlerFn, StateId};
use crate::app::payload;
use crate::app::ports::{IndicatorPort, NetPort, OneShotTimer, Platform, PowerPort, WifiPort};
use crate::config::{RECORDS_MAX, ROUNDS_MAX};

/// LED half-periods per phase (ms).
pub const BLINK_SENSORS_MS: u32 = 50;
pub const BLINK_WIFI_MS: u32 = 100;
pub const BLINK_NET_MS: u32 = 200;
pub const BLINK_WIFI_FAIL_MS: u32 = 500;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the state table for platform `P`. Called once per wake.
pub fn build_state_table<P: Platform>() -> [StateDescriptor<WakeContext<P>>; StateId::COUNT] {
    fn row<C>(id: StateId, on_enter: StateHandlerFn<C>) -> StateDescriptor<C> {
        StateDescriptor {
            id,
            name: id.name(),
            on_enter,
        }
    }

    [
        row(StateId::SensorsStart, sensors_start::<P>),
        row(StateId::SensorsReadout, sensors_readout::<P>),
        row(StateId::SensorsDone, sensors_done::<P>),
        row(StateId::SensorsSave, sensors_save::<P>),
        row(StateId::SensorsSend, sensors_send::<P>),
        row(StateId::WifiSetupStart, wifi_setup_start::<P>),
        row(StateId::WifiSetupFail, wifi_setup_fail::<P>),
        row(StateId::WifiSetupDone, wifi_setup_done::<P>),
        row(StateId::WifiShutdownStart, wifi_shutdown_start::<P>),
        row(StateId::WifiShutdownDone, wifi_shutdown_done::<P>),
        row(StateId::NetConnectStart, net_connect_start::<P>),
        row(StateId::NetConnectFail, net_connect_fail::<P>),
        row(StateId::NetConnectDone, net_connect_done::<P>),
        row(StateId::NetDataSent, net_data_sent::<P>),
        row(StateId::NetDisconnectDone, net_disconnect_done::<P>),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Sampling
// ═══════════════════════════════════════════════════════════════════════════

fn sensors_start<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.indicator.blink(BLINK_SENSORS_MS);
    let delay = ctx.config.conversion_delay();
    ctx.engine.request_round(ctx.round, &mut ctx.timer, delay);
    Outcome::Wait
}

fn sensors_readout<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.engine.readout_round(ctx.round);
    Outcome::Next(StateId::SensorsDone)
}

fn sensors_done<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    if !ctx.engine.all_valid() && ctx.round + 1 < ROUNDS_MAX {
        ctx.round += 1;
        info!("Sensors: not all valid, starting round {}", ctx.round);
        return Outcome::Next(StateId::SensorsStart);
    }

    ctx.timer.disarm();
    ctx.engine.depower();
    let record = ctx.engine.consolidate_samples();
    for (address, sample) in ctx.engine.addresses().iter().zip(&record) {
        info!("Record {}: {} {}", ctx.wake_index, address, sample);
    }
    ctx.store.set_record(ctx.wake_index, record);

    if ctx.wake_index < RECORDS_MAX - 1 {
        Outcome::Next(StateId::SensorsSave)
    } else {
        Outcome::Next(StateId::SensorsSend)
    }
}

fn sensors_save<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    if let Err(e) = ctx.store.save(ctx.wake_index + 1) {
        warn!("Sensors: saving records failed: {}", e);
    }
    ctx.indicator.blink(0);
    Outcome::Sleep
}

fn sensors_send<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    if let Err(e) = ctx.store.save(0) {
        warn!("Sensors: clearing records failed: {}", e);
    }
    let records = ctx.store.records(ctx.wake_index + 1);
    ctx.aggregate = Some(ctx.engine.consolidate_records(records));
    Outcome::Next(StateId::WifiSetupStart)
}

// ═══════════════════════════════════════════════════════════════════════════
//  Wifi
// ═══════════════════════════════════════════════════════════════════════════

fn wifi_setup_start<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.indicator.blink(BLINK_WIFI_MS);
    match ctx.wifi.associate() {
        Ok(()) => Outcome::Wait,
        Err(e) => {
            warn!("Wifi: association could not start: {}", e);
            Outcome::Next(StateId::WifiSetupFail)
        }
    }
}

fn wifi_setup_fail<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.indicator.blink(BLINK_WIFI_FAIL_MS);
    if ctx.wifi_retries < ctx.config.wifi_max_retries {
        ctx.wifi_retries += 1;
        info!("Wifi: retry {}/{}", ctx.wifi_retries, ctx.config.wifi_max_retries);
        Outcome::Next(StateId::WifiSetupStart)
    } else {
        warn!("Wifi: giving up, report skipped");
        Outcome::Next(StateId::WifiShutdownStart)
    }
}

fn wifi_setup_done<P: Platform>(_ctx: &mut WakeContext<P>) -> Outcome {
    Outcome::Next(StateId::NetConnectStart)
}

fn wifi_shutdown_start<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    match ctx.wifi.disassociate() {
        Ok(()) => Outcome::Wait,
        Err(e) => {
            warn!("Wifi: disassociation failed: {}", e);
            Outcome::Next(StateId::WifiShutdownDone)
        }
    }
}

fn wifi_shutdown_done<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.indicator.blink(0);
    Outcome::Sleep
}

// ═══════════════════════════════════════════════════════════════════════════
//  Network
// ═══════════════════════════════════════════════════════════════════════════

fn net_connect_start<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.indicator.blink(BLINK_NET_MS);
    match ctx.net.connect() {
        Ok(()) => Outcome::Wait,
        Err(e) => {
            warn!("Net: connect could not start: {}", e);
            Outcome::Next(StateId::NetConnectFail)
        }
    }
}

fn net_connect_fail<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    disconnect(ctx)
}

fn net_connect_done<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    let Some(aggregate) = ctx.aggregate.as_ref() else {
        warn!("Net: nothing to send");
        return Outcome::Next(StateId::NetDataSent);
    };

    let millivolts = ctx.power.supply_millivolts();
    let rssi = ctx.wifi.rssi();
    let request = match payload::build_request(&ctx.config, ctx.engine.addresses(), aggregate, millivolts, rssi) {
        Ok(request) => request,
        Err(e) => {
            warn!("Net: encoding report failed: {}", e);
            return Outcome::Next(StateId::NetDataSent);
        }
    };

    let sent = ctx.net.send(&request);
    ctx.payload = Some(request);
    match sent {
        Ok(()) => Outcome::Wait,
        Err(e) => {
            warn!("Net: send failed: {}", e);
            Outcome::Next(StateId::NetDataSent)
        }
    }
}

fn net_data_sent<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    ctx.payload = None;
    disconnect(ctx)
}

fn net_disconnect_done<P: Platform>(_ctx: &mut WakeContext<P>) -> Outcome {
    Outcome::Next(StateId::WifiShutdownStart)
}

fn disconnect<P: Platform>(ctx: &mut WakeContext<P>) -> Outcome {
    match ctx.net.disconnect() {
        Ok(()) => Outcome::Wait,
        Err(e) => {
            warn!("Net: disconnect failed: {}", e);
            Outcome::Next(StateId::NetDisconnectDone)
        }
    }
}
