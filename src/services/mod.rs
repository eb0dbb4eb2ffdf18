//! Services module
//!
//! The scheduling and dismissal core, plus the services that keep
//! persisted alarms and platform timers consistent.

pub mod alarms;
pub mod gatekeeper;
pub mod ringing;
pub mod scheduler;
pub mod trigger;

pub use alarms::AlarmsService;
pub use gatekeeper::{can_dismiss, DismissalGate, GateState, PinOutcome};
pub use ringing::{RingingService, RingingSession};
pub use scheduler::{AlarmScheduler, SkipOutcome};
pub use trigger::next_trigger;
