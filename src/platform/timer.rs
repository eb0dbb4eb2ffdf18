//! In-process wake timer
//!
//! Reference [`WakeTimer`] implementation backed by tokio sleep tasks.
//! Desktop hosts and the test suite use it directly; mobile hosts
//! replace it with the OS alarm facility behind the same trait.
//!
//! One task per armed key; re-arming a key aborts the previous task,
//! which is what gives the replace-on-arm contract. Fired keys are
//! delivered on an unbounded channel that the host drains into
//! [`AlarmScheduler::handle_fire`](crate::services::AlarmScheduler).

use super::WakeTimer;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Tokio-backed one-shot wake timer keyed by alarm id.
pub struct TokioWakeTimer {
    fired_tx: mpsc::UnboundedSender<i64>,
    tasks: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl TokioWakeTimer {
    /// Create the timer and the stream of fired alarm ids.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<i64>) {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        let timer = Arc::new(Self {
            fired_tx,
            tasks: Mutex::new(HashMap::new()),
        });
        (timer, fired_rx)
    }
}

impl WakeTimer for TokioWakeTimer {
    fn arm(&self, key: i64, at: DateTime<Utc>) {
        // An instant already in the past fires immediately.
        let delay = (at - Utc::now()).to_std().unwrap_or_default();
        let fired_tx = self.fired_tx.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the host is shutting down.
            let _ = fired_tx.send(key);
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = tasks.insert(key, handle) {
            previous.abort();
            tracing::debug!("Re-armed wake timer for alarm {} at {}", key, at);
        } else {
            tracing::debug!("Armed wake timer for alarm {} at {}", key, at);
        }
    }

    fn cancel(&self, key: i64) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = tasks.remove(&key) {
            handle.abort();
            tracing::debug!("Cancelled wake timer for alarm {}", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tokio::time::{timeout, Duration as TokioDuration};

    #[tokio::test]
    async fn test_past_instant_fires_immediately() {
        let (timer, mut fired) = TokioWakeTimer::new();

        timer.arm(1, Utc::now() - Duration::minutes(5));

        let key = timeout(TokioDuration::from_secs(1), fired.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key, 1);
    }

    #[tokio::test]
    async fn test_cancel_prevents_fire() {
        let (timer, mut fired) = TokioWakeTimer::new();

        timer.arm(7, Utc::now() + Duration::milliseconds(50));
        timer.cancel(7);

        let result = timeout(TokioDuration::from_millis(300), fired.recv()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_cancel_unarmed_key_is_noop() {
        let (timer, _fired) = TokioWakeTimer::new();
        timer.cancel(99);
    }

    #[tokio::test]
    async fn test_rearm_replaces_previous_arming() {
        let (timer, mut fired) = TokioWakeTimer::new();

        // First arming would fire quickly; the replacement pushes it out.
        timer.arm(3, Utc::now() + Duration::milliseconds(50));
        timer.arm(3, Utc::now() + Duration::milliseconds(200));

        let key = timeout(TokioDuration::from_secs(1), fired.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(key, 3);

        // Exactly one delivery for the one remaining slot.
        let extra = timeout(TokioDuration::from_millis(300), fired.recv()).await;
        assert!(extra.is_err());
    }
}
