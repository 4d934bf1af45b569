//! Application service, the hexagonal core.
//!
//! [`WakeCycle`] owns the FSM and its [`WakeContext`]. It pulls one event at
//! a time from the queue, enters the event's target state and runs the
//! handler to completion. Handlers never call each other: a synchronous
//! successor is posted back onto the queue as [`Event::Advance`], so every
//! transition happens in post order.
//!
//! ```text
//!  adapters ──post──▶ EventChannel ──▶ WakeCycle::dispatch ──▶ Fsm::enter
//!                          ▲                                      │
//!                          └──────────── Event::Advance ──────────┘
//! ```

use core::time::Duration;

use log::{info, warn};

use crate::config::{NodeConfig, RECORDS_MAX};
use crate::diagnostics::WakeDiagnostics;
use crate::error::Result;
use crate::events::{Event, EventChannel, post};
use crate::fsm::context::WakeContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, Outcome, StateId};
use crate::sensors::SensorAddress;

use super::ports::{Hardware, Platform, PowerPort};

/// The wake is finished; the caller should power down for `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRequest {
    pub duration: Duration,
}

// ───────────────────────────────────────────────────────────────
// WakeCycle
// ───────────────────────────────────────────────────────────────

pub struct WakeCycle<'q, P: Platform> {
    fsm: Fsm<WakeContext<P>>,
    ctx: WakeContext<P>,
    events: &'q EventChannel,
}

impl<'q, P: Platform> WakeCycle<'q, P> {
    /// Assemble the cycle. Does **not** touch RTC memory; call [`boot`] next.
    ///
    /// [`boot`]: Self::boot
    pub fn new(
        hw: Hardware<P>,
        sensors: &'static [SensorAddress],
        config: NodeConfig,
        events: &'q EventChannel,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            fsm: Fsm::new(build_state_table::<P>()),
            ctx: WakeContext::new(hw, sensors, config)?,
            events,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Log wake diagnostics, restore the wake index from RTC memory and
    /// queue the start of sampling.
    pub fn boot(&mut self) {
        let diag = WakeDiagnostics::collect(
            self.ctx.power.reset_reason(),
            self.ctx.power.supply_millivolts(),
        );
        if diag.is_abnormal() {
            warn!("Wake: {}", diag);
        } else {
            info!("Wake: {}", diag);
        }

        let stored = self.ctx.store.load();
        // A full store is sent and cleared in the same wake, so a valid
        // header never announces RECORDS_MAX records; treat it as the last slot.
        self.ctx.wake_index = stored.min(RECORDS_MAX - 1);
        info!("Wake: index {}/{}", self.ctx.wake_index, RECORDS_MAX);

        post(&self.events.sender(), Event::Boot);
    }

    /// Handle one event. Returns a sleep request once the cycle is over.
    pub fn dispatch(&mut self, event: Event) -> Option<SleepRequest> {
        match self.fsm.enter(event.target(), &mut self.ctx) {
            Outcome::Next(state) => {
                post(&self.events.sender(), Event::Advance(state));
                None
            }
            Outcome::Wait => None,
            Outcome::Sleep => Some(SleepRequest {
                duration: self.ctx.config.sleep_duration(),
            }),
        }
    }

    /// Drain the events already queued, without waiting.
    ///
    /// Returns `Some` when the cycle reaches deep sleep. Host adapters post
    /// completions synchronously, so on the host one call usually runs a
    /// whole wake.
    pub fn run_pending(&mut self) -> Option<SleepRequest> {
        while let Ok(event) = self.events.try_receive() {
            if let Some(request) = self.dispatch(event) {
                return Some(request);
            }
        }
        None
    }

    /// Wait for events until the cycle asks for deep sleep.
    pub async fn run(&mut self) -> SleepRequest {
        loop {
            let event = self.events.receive().await;
            if let Some(request) = self.dispatch(event) {
                return request;
            }
        }
    }

    /// Enter deep sleep. Never returns.
    pub fn sleep(mut self, request: SleepRequest) -> ! {
        info!("Wake: sleeping for {:?}", request.duration);
        self.ctx.power.deep_sleep(request.duration)
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn current_state(&self) -> Option<StateId> {
        self.fsm.current_state()
    }

    pub fn context(&self) -> &WakeContext<P> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut WakeContext<P> {
        &mut self.ctx
    }

    pub fn into_context(self) -> WakeContext<P> {
        self.ctx
    }
}
