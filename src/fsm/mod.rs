//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern:
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  StateTable                                   │
//! │  ┌───────────────────┬──────────────────────┐ │
//! │  │ StateId           │ on_enter             │ │
//! │  ├───────────────────┼──────────────────────┤ │
//! │  │ SensorsStart      │ fn(ctx) -> Outcome   │ │
//! │  │ SensorsReadout    │ fn(ctx) -> Outcome   │ │
//! │  │ ...               │ ...                  │ │
//! │  │ WifiShutdownDone  │ fn(ctx) -> Outcome   │ │
//! │  └───────────────────┴──────────────────────┘ │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! The machine is event driven rather than ticked: the wake cycle dispatches
//! one event, the engine enters the event's target state and runs its
//! handler. The handler's [`Outcome`] says what happens next: an immediate
//! successor, waiting for an external completion, or deep sleep.

pub mod context;
pub mod states;

use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every wake-cycle state.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    SensorsStart = 0,
    SensorsReadout = 1,
    SensorsDone = 2,
    SensorsSave = 3,
    SensorsSend = 4,
    WifiSetupStart = 5,
    WifiSetupFail = 6,
    WifiSetupDone = 7,
    WifiShutdownStart = 8,
    WifiShutdownDone = 9,
    NetConnectStart = 10,
    NetConnectFail = 11,
    NetConnectDone = 12,
    NetDataSent = 13,
    NetDisconnectDone = 14,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 15;

    /// Convert an index back to `StateId`. Panics on out-of-range in debug
    /// builds; returns `WifiShutdownDone` (which leads to sleep) in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::SensorsStart,
            1 => Self::SensorsReadout,
            2 => Self::SensorsDone,
            3 => Self::SensorsSave,
            4 => Self::SensorsSend,
            5 => Self::WifiSetupStart,
            6 => Self::WifiSetupFail,
            7 => Self::WifiSetupDone,
            8 => Self::WifiShutdownStart,
            9 => Self::WifiShutdownDone,
            10 => Self::NetConnectStart,
            11 => Self::NetConnectFail,
            12 => Self::NetConnectDone,
            13 => Self::NetDataSent,
            14 => Self::NetDisconnectDone,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::WifiShutdownDone
            }
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::SensorsStart => "SENSORS_START",
            Self::SensorsReadout => "SENSORS_READOUT",
            Self::SensorsDone => "SENSORS_DONE",
            Self::SensorsSave => "SENSORS_SAVE",
            Self::SensorsSend => "SENSORS_SEND",
            Self::WifiSetupStart => "WIFI_SETUP_START",
            Self::WifiSetupFail => "WIFI_SETUP_FAIL",
            Self::WifiSetupDone => "WIFI_SETUP_DONE",
            Self::WifiShutdownStart => "WIFI_SHUTDOWN_START",
            Self::WifiShutdownDone => "WIFI_SHUTDOWN_DONE",
            Self::NetConnectStart => "NET_CONNECT_START",
            Self::NetConnectFail => "NET_CONNECT_FAIL",
            Self::NetConnectDone => "NET_CONNECT_DONE",
            Self::NetDataSent => "NET_DATA_SENT",
            Self::NetDisconnectDone => "NET_DISCONNECT_DONE",
        }
    }
}

/// What a state handler asks for after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Enter this state next, in queue order.
    Next(StateId),
    /// Stay until an adapter or timer posts a completion event.
    Wait,
    /// The wake is over; power down.
    Sleep,
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Signature for the entry action, run once per transition into the state.
pub type StateHandlerFn<C> = fn(&mut C) -> Outcome;

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array: no heap, no `dyn`.
pub struct StateDescriptor<C> {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: StateHandlerFn<C>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine, generic over the context its handlers
/// mutate.
pub struct Fsm<C> {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor<C>; StateId::COUNT],
    /// Index of the last entered state, `None` before the first event.
    current: Option<usize>,
}

impl<C> Fsm<C> {
    pub fn new(table: [StateDescriptor<C>; StateId::COUNT]) -> Self {
        debug_assert!(
            table.iter().enumerate().all(|(i, d)| d.id as usize == i),
            "state table out of order"
        );
        Self {
            table,
            current: None,
        }
    }

    /// Enter `next` and run its handler.
    pub fn enter(&mut self, next: StateId, ctx: &mut C) -> Outcome {
        let next_idx = next as usize;
        match self.current {
            Some(cur) => info!(
                "FSM transition: {} -> {}",
                self.table[cur].name, self.table[next_idx].name
            ),
            None => info!("FSM starting in state: {}", self.table[next_idx].name),
        }

        self.current = Some(next_idx);
        (self.table[next_idx].on_enter)(ctx)
    }

    /// The last entered state.
    pub fn current_state(&self) -> Option<StateId> {
        self.current.map(StateId::from_index)
    }
}
