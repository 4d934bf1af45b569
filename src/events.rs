//! Wake-cycle event queue.
//!
//! Events are produced by:
//! - state handlers (synchronous successor, posted as [`Event::Advance`])
//! - the conversion timer callback
//! - wifi / transport completion callbacks
//!
//! and consumed one at a time by the wake cycle, which runs each handler to
//! completion before taking the next event.
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────┐
//! │ Timer cb     │────▶│               │     │              │
//! │ Wifi cb      │────▶│ EventChannel  │────▶│  WakeCycle   │
//! │ Net cb       │────▶│ (embassy-sync)│     │  (consumer)  │
//! │ Handlers     │────▶│               │     │              │
//! └──────────────┘     └───────────────┘     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use log::error;

use crate::fsm::StateId;

/// Pending-event capacity. A handler posts at most one successor plus one
/// adapter completion, so overflow means a lost transition.
pub const EVENT_QUEUE_DEPTH: usize = 8;

pub type EventChannel = Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>;
pub type EventSender<'a> = Sender<'a, CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>;

/// Queue used by ESP-IDF callbacks, which cannot carry a borrowed sender.
pub static EVENTS: EventChannel = Channel::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Wake-up; starts sampling.
    Boot,
    /// Synchronous transition requested by a handler.
    Advance(StateId),
    /// Conversion delay elapsed.
    ReadoutReady,
    WifiAssociated,
    WifiFailed,
    WifiDisassociated,
    NetConnected,
    NetConnectFailed,
    NetDataSent,
    NetDisconnected,
}

impl Event {
    /// State entered when this event is dispatched.
    pub const fn target(self) -> StateId {
        match self {
            Self::Boot => StateId::SensorsStart,
            Self::Advance(state) => state,
            Self::ReadoutReady => StateId::SensorsReadout,
            Self::WifiAssociated => StateId::WifiSetupDone,
            Self::WifiFailed => StateId::WifiSetupFail,
            Self::WifiDisassociated => StateId::WifiShutdownDone,
            Self::NetConnected => StateId::NetConnectDone,
            Self::NetConnectFailed => StateId::NetConnectFail,
            Self::NetDataSent => StateId::NetDataSent,
            Self::NetDisconnected => StateId::NetDisconnectDone,
        }
    }
}

/// Enqueue without blocking. A full queue is logged; the event is lost.
pub fn post(sender: &EventSender<'_>, event: Event) {
    if sender.try_send(event).is_err() {
        error!("Event queue full, dropped {:?}", event);
    }
}

/// Enqueue on the global [`EVENTS`] queue.
pub fn post_global(event: Event) {
    post(&EVENTS.sender(), event);
}
