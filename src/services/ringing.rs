//! Ringing session orchestration
//!
//! Glue between a wake-timer fire and the user-facing ringing screen:
//! starts and stops the platform ringer, holds the light-sensor
//! subscription for the session's lifetime, and routes dismiss/snooze
//! actions through the gatekeeper and scheduler.
//!
//! A session exists only while an alarm is actually sounding; nothing
//! here is persisted.

use crate::database::{Alarm, Repository};
use crate::error::{AppError, Result};
use crate::services::gatekeeper::{DismissalGate, PinOutcome};
use crate::services::scheduler::AlarmScheduler;
use crate::platform::{LightSensor, RingerOutput};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Transient state of one actively sounding alarm.
pub struct RingingSession {
    alarm: Alarm,
    snoozed: bool,
    gate: DismissalGate,
    /// Held for the session's lifetime; dropping it unsubscribes from
    /// the light sensor.
    lux_feed: Option<watch::Receiver<f32>>,
}

impl RingingSession {
    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    /// Whether this session was entered via snooze.
    pub fn was_snoozed(&self) -> bool {
        self.snoozed
    }

    pub fn gate(&self) -> &DismissalGate {
        &self.gate
    }

    pub fn can_dismiss(&self) -> bool {
        self.gate.can_dismiss()
    }

    pub fn submit_pin(&mut self, attempt: &str) -> PinOutcome {
        self.gate.submit_pin(attempt)
    }

    /// Wait for the next sensor reading and fold it into the gate.
    ///
    /// Returns the new value, or `None` when no further readings will
    /// arrive (no sensor on this device, or the feed closed). The
    /// ringing screen loops on this to keep its dismiss control and
    /// lux display current.
    pub async fn await_lux_change(&mut self) -> Option<f32> {
        let feed = self.lux_feed.as_mut()?;

        if feed.changed().await.is_err() {
            self.lux_feed = None;
            return None;
        }

        let lux = *feed.borrow();
        self.gate.on_lux_reading(lux);
        Some(lux)
    }

    fn release(&mut self) {
        self.lux_feed = None;
    }
}

/// Service driving ringing sessions
#[derive(Clone)]
pub struct RingingService {
    repo: Repository,
    scheduler: AlarmScheduler,
    ringer: Arc<dyn RingerOutput>,
    sensor: Arc<dyn LightSensor>,
}

impl RingingService {
    pub fn new(
        repo: Repository,
        scheduler: AlarmScheduler,
        ringer: Arc<dyn RingerOutput>,
        sensor: Arc<dyn LightSensor>,
    ) -> Self {
        Self {
            repo,
            scheduler,
            ringer,
            sensor,
        }
    }

    /// Handle a wake-timer fire: re-arm repeating alarms, start the
    /// ringer and open a fresh `Locked` session.
    ///
    /// A fire for a record deleted after arming returns `Ok(None)`
    /// with all side effects stopped — never an error, never a crash.
    /// Sessions entered via snooze start `Locked` again like any
    /// other; the gatekeeper carries nothing over.
    pub async fn on_fire(&self, alarm_id: i64, snoozed: bool) -> Result<Option<RingingSession>> {
        let Some(alarm) = self.scheduler.handle_fire(alarm_id).await? else {
            // Release whatever the platform may have started for this fire.
            self.ringer.stop();
            return Ok(None);
        };

        self.ringer.start(&alarm);

        let lux_feed = self.sensor.subscribe();
        let gate = DismissalGate::new(&alarm, lux_feed.is_some());

        tracing::info!(
            "Ringing session started for alarm {} (snoozed: {})",
            alarm.id,
            snoozed
        );

        Ok(Some(RingingSession {
            alarm,
            snoozed,
            gate,
            lux_feed,
        }))
    }

    /// Explicit user dismiss action.
    ///
    /// Returns false (and changes nothing) while the gate conditions
    /// are not met. On success the ringer stops and a one-time alarm
    /// is persisted disabled — fired and dismissed means spent.
    /// Repeating alarms stay enabled; their next occurrence was armed
    /// when the session started. Dismissing an already-dismissed
    /// session reports success without further side effects.
    pub async fn dismiss(&self, session: &mut RingingSession) -> Result<bool> {
        // Repeated taps on the dismiss control are harmless.
        if session.gate.is_dismissed() {
            return Ok(true);
        }

        if !session.gate.try_dismiss() {
            tracing::debug!(
                "Dismiss refused for alarm {} (light_ok: {}, pin_ok: {})",
                session.alarm.id,
                session.gate.light_ok(),
                session.gate.pin_ok()
            );
            return Ok(false);
        }

        self.ringer.stop();
        session.release();

        if !session.alarm.is_repeating() {
            let mut alarm = session.alarm.clone();
            alarm.is_enabled = false;
            alarm.skipped_until = None;
            self.repo.update(&alarm).await?;
            tracing::info!("One-time alarm {} dismissed and disabled", alarm.id);
        } else {
            tracing::info!("Alarm {} dismissed", session.alarm.id);
        }

        Ok(true)
    }

    /// Snooze side-channel, bypassing the gatekeeper entirely: stop
    /// the ringer and arm a fresh one-shot timer at now + `minutes`
    /// under the same alarm id. `is_enabled` and `skipped_until` are
    /// untouched.
    pub fn snooze(&self, session: &mut RingingSession, minutes: u32) -> Result<DateTime<Utc>> {
        if session.snoozed {
            return Err(AppError::Generic(
                "session already entered via snooze; dismiss instead".to_string(),
            ));
        }

        let at = self.scheduler.snooze(session.alarm.id, minutes)?;
        self.ringer.stop();
        session.release();

        Ok(at)
    }
}
