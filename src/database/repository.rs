//! Repository layer for database operations
//!
//! CRUD for alarm records plus a change-notification stream. The
//! armed platform timers mirror what is persisted here, so every
//! caller that writes through this repository must re-run the
//! scheduler afterwards (the services layer enforces this).

use super::models::Alarm;
use crate::error::{AppError, Result};
use chrono::{NaiveDateTime, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::watch;

/// Repository for alarm records
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            pool,
            changes: Arc::new(changes),
        }
    }

    /// Subscribe to write notifications.
    ///
    /// The receiver observes a revision counter that is bumped after
    /// every insert/update/delete, letting the alarm list re-query
    /// without polling.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|rev| *rev += 1);
    }

    /// Insert a new alarm and return it with its assigned id.
    pub async fn insert(&self, alarm: &Alarm) -> Result<Alarm> {
        let now = Utc::now();

        let inserted = sqlx::query_as::<_, Alarm>(
            r#"
            INSERT INTO alarms (
                hour, minute, is_enabled, selected_days, skipped_until,
                label, is_lux_dismissal_enabled, dismiss_lux, volume,
                ringtone_uri, is_pin_enabled, pin, display_order,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(alarm.hour)
        .bind(alarm.minute)
        .bind(alarm.is_enabled)
        .bind(Json(&alarm.selected_days))
        .bind(alarm.skipped_until)
        .bind(&alarm.label)
        .bind(alarm.is_lux_dismissal_enabled)
        .bind(alarm.dismiss_lux)
        .bind(alarm.volume)
        .bind(&alarm.ringtone_uri)
        .bind(alarm.is_pin_enabled)
        .bind(&alarm.pin)
        .bind(alarm.display_order)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created alarm: {}", inserted.id);
        self.notify();
        Ok(inserted)
    }

    /// Get an alarm by id; `None` when no such record exists.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Alarm>> {
        let alarm = sqlx::query_as::<_, Alarm>("SELECT * FROM alarms WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(alarm)
    }

    /// List all alarms in manual display order.
    pub async fn get_all(&self) -> Result<Vec<Alarm>> {
        let alarms = sqlx::query_as::<_, Alarm>(
            r#"
            SELECT * FROM alarms ORDER BY display_order ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(alarms)
    }

    /// Replace every editable field of an existing alarm.
    pub async fn update(&self, alarm: &Alarm) -> Result<Alarm> {
        let now = Utc::now();

        let updated = sqlx::query_as::<_, Alarm>(
            r#"
            UPDATE alarms SET
                hour = ?, minute = ?, is_enabled = ?, selected_days = ?,
                skipped_until = ?, label = ?, is_lux_dismissal_enabled = ?,
                dismiss_lux = ?, volume = ?, ringtone_uri = ?,
                is_pin_enabled = ?, pin = ?, display_order = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(alarm.hour)
        .bind(alarm.minute)
        .bind(alarm.is_enabled)
        .bind(Json(&alarm.selected_days))
        .bind(alarm.skipped_until)
        .bind(&alarm.label)
        .bind(alarm.is_lux_dismissal_enabled)
        .bind(alarm.dismiss_lux)
        .bind(alarm.volume)
        .bind(&alarm.ringtone_uri)
        .bind(alarm.is_pin_enabled)
        .bind(&alarm.pin)
        .bind(alarm.display_order)
        .bind(now)
        .bind(alarm.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::AlarmNotFound(alarm.id))?;

        tracing::debug!("Updated alarm: {}", updated.id);
        self.notify();
        Ok(updated)
    }

    /// Delete an alarm record.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let rows = sqlx::query("DELETE FROM alarms WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::AlarmNotFound(id));
        }

        tracing::debug!("Deleted alarm: {}", id);
        self.notify();
        Ok(())
    }

    /// Persist the skip marker (or clear it with `None`).
    pub async fn set_skipped_until(
        &self,
        id: i64,
        skipped_until: Option<NaiveDateTime>,
    ) -> Result<()> {
        let rows = sqlx::query("UPDATE alarms SET skipped_until = ?, updated_at = ? WHERE id = ?")
            .bind(skipped_until)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::AlarmNotFound(id));
        }

        tracing::debug!("Set skipped_until for alarm {}: {:?}", id, skipped_until);
        self.notify();
        Ok(())
    }

    /// Persist a new manual list position for drag-reorder.
    pub async fn set_display_order(&self, id: i64, display_order: i64) -> Result<()> {
        let rows = sqlx::query("UPDATE alarms SET display_order = ?, updated_at = ? WHERE id = ?")
            .bind(display_order)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::AlarmNotFound(id));
        }

        self.notify();
        Ok(())
    }
}
