//! Platform collaborator seams
//!
//! The core computes *when* an alarm fires and *whether* it may be
//! dismissed; the platform owns wake-up delivery, the light sensor and
//! audible playback. Each of those is a trait here so the embedding
//! app can plug in the real OS facility while tests substitute mocks.

pub mod timer;

pub use timer::TokioWakeTimer;

use crate::database::Alarm;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// One-shot wake-up timer facility, keyed by alarm id.
///
/// The platform guarantees at-least-effort delivery at the armed
/// instant even during low-power states, though the OS may defer it.
/// There is exactly one timer slot per key: arming replaces any
/// previous arming for the same key, and cancelling a key with
/// nothing armed is a no-op.
pub trait WakeTimer: Send + Sync {
    fn arm(&self, key: i64, at: DateTime<Utc>);
    fn cancel(&self, key: i64);
}

/// Ambient light sensor subscription.
///
/// Delivery is push-based and only lasts while the returned receiver
/// is held; dropping it unsubscribes. Each ringing session subscribes
/// afresh. `None` means the device has no light sensor at all — the
/// gatekeeper then treats the light condition as satisfied rather
/// than blocking dismissal forever.
pub trait LightSensor: Send + Sync {
    fn subscribe(&self) -> Option<watch::Receiver<f32>>;
}

/// Sound/vibration/notification playback during a ringing session.
///
/// Stateless from the core's perspective: `start` is invoked once when
/// ringing begins, `stop` once when the session ends for any reason.
pub trait RingerOutput: Send + Sync {
    fn start(&self, alarm: &Alarm);
    fn stop(&self);
}
