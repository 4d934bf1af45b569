//! Application core: the wake cycle, zero direct I/O.
//!
//! All interaction with hardware happens through **port traits** defined in
//! [`ports`]; [`service::WakeCycle`] drives the state machine from the event
//! queue and [`payload`] encodes the report.

pub mod payload;
pub mod ports;
pub mod service;
