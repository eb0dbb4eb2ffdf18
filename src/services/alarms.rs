//! Alarms service
//!
//! Editor-facing CRUD that keeps the persisted records and the armed
//! platform timers in lock-step: the two are copies of the same fact
//! and must never diverge, so every write here re-runs the scheduler
//! before returning.

use crate::database::{Alarm, Repository};
use crate::error::{AppError, Result};
use crate::platform::LightSensor;
use crate::services::scheduler::{AlarmScheduler, SkipOutcome};
use crate::services::trigger;
use chrono::{Local, NaiveDateTime};
use std::sync::Arc;
use tokio::sync::watch;

/// Service for managing alarms
#[derive(Clone)]
pub struct AlarmsService {
    repo: Repository,
    scheduler: AlarmScheduler,
    sensor: Arc<dyn LightSensor>,
}

impl AlarmsService {
    pub fn new(repo: Repository, scheduler: AlarmScheduler, sensor: Arc<dyn LightSensor>) -> Self {
        Self {
            repo,
            scheduler,
            sensor,
        }
    }

    /// Edit-time configuration checks, before anything reaches the
    /// scheduler: field ranges and PIN invariants via
    /// [`Alarm::validate`], plus rejecting lux-gated dismissal on a
    /// device with no light sensor.
    fn check_config(&self, alarm: &Alarm) -> Result<()> {
        alarm.validate()?;

        if alarm.is_lux_dismissal_enabled && self.sensor.subscribe().is_none() {
            return Err(AppError::InvalidAlarm(
                "lux dismissal requires a light sensor, which this device lacks".to_string(),
            ));
        }

        Ok(())
    }

    /// Save a new alarm and arm its first trigger.
    pub async fn create_alarm(&self, draft: Alarm) -> Result<Alarm> {
        self.check_config(&draft)?;

        let alarm = self.repo.insert(&draft).await?;
        self.scheduler.schedule(&alarm);

        tracing::info!("Alarm created: {}", alarm.id);
        Ok(alarm)
    }

    /// Persist field edits and bring the armed timer up to date.
    pub async fn update_alarm(&self, alarm: Alarm) -> Result<Alarm> {
        self.check_config(&alarm)?;

        let updated = self.repo.update(&alarm).await?;
        self.scheduler.schedule(&updated);

        Ok(updated)
    }

    /// Delete an alarm and its armed timer.
    pub async fn delete_alarm(&self, id: i64) -> Result<()> {
        self.scheduler.cancel(id);
        self.repo.delete(id).await?;

        tracing::info!("Alarm deleted: {}", id);
        Ok(())
    }

    /// Toggle an alarm on or off. Disabling also clears any pending
    /// skip, so a later re-enable starts from a clean slate.
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<Alarm> {
        let mut alarm = self.get_alarm(id).await?;

        alarm.is_enabled = enabled;
        if !enabled {
            alarm.skipped_until = None;
        }

        let updated = self.repo.update(&alarm).await?;
        self.scheduler.schedule(&updated);

        Ok(updated)
    }

    /// Skip the alarm's next occurrence and persist the skip marker so
    /// it survives restarts. Returns what was skipped for display, or
    /// `None` when there is no upcoming occurrence.
    pub async fn skip_next(&self, id: i64) -> Result<Option<SkipOutcome>> {
        let alarm = self.get_alarm(id).await?;

        let Some(outcome) = self.scheduler.skip_next(&alarm) else {
            return Ok(None);
        };

        self.repo
            .set_skipped_until(id, Some(outcome.skipped))
            .await?;

        Ok(Some(outcome))
    }

    /// Undo a pending skip and re-arm the natural next occurrence.
    pub async fn clear_skip(&self, id: i64) -> Result<Alarm> {
        self.repo.set_skipped_until(id, None).await?;

        let alarm = self.get_alarm(id).await?;
        self.scheduler.schedule(&alarm);

        Ok(alarm)
    }

    /// Persist a drag-reorder position. Purely cosmetic; timers are
    /// untouched.
    pub async fn set_display_order(&self, id: i64, display_order: i64) -> Result<()> {
        self.repo.set_display_order(id, display_order).await
    }

    pub async fn get_alarm(&self, id: i64) -> Result<Alarm> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(AppError::AlarmNotFound(id))
    }

    /// All alarms in manual display order.
    pub async fn list_alarms(&self) -> Result<Vec<Alarm>> {
        self.repo.get_all().await
    }

    /// Change-notification stream for the alarm list (re-query on
    /// every observed revision).
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.repo.subscribe()
    }

    /// Next trigger time of an alarm as of now, for list display
    /// ("rings in 7h 32m").
    pub fn next_trigger(&self, alarm: &Alarm) -> Option<NaiveDateTime> {
        trigger::next_trigger(alarm, Local::now().naive_local())
    }
}
