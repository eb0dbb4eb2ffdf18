//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde for serialization to the embedding UI.

use crate::config;
use crate::error::{AppError, Result};
use chrono::{DateTime, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeSet;

/// A weekday an alarm repeats on.
///
/// Serialized with the short codes the editor uses on its day-picker
/// chips ("Su" through "Sa"). Ordering is Sunday-first to match the
/// picker layout; scheduling never depends on the order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RepeatDay {
    #[serde(rename = "Su")]
    Sunday,
    #[serde(rename = "M")]
    Monday,
    #[serde(rename = "Tu")]
    Tuesday,
    #[serde(rename = "W")]
    Wednesday,
    #[serde(rename = "Th")]
    Thursday,
    #[serde(rename = "F")]
    Friday,
    #[serde(rename = "Sa")]
    Saturday,
}

impl RepeatDay {
    /// Map to the chrono weekday enumeration used for calendar math.
    pub fn to_weekday(self) -> Weekday {
        match self {
            RepeatDay::Sunday => Weekday::Sun,
            RepeatDay::Monday => Weekday::Mon,
            RepeatDay::Tuesday => Weekday::Tue,
            RepeatDay::Wednesday => Weekday::Wed,
            RepeatDay::Thursday => Weekday::Thu,
            RepeatDay::Friday => Weekday::Fri,
            RepeatDay::Saturday => Weekday::Sat,
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sun => RepeatDay::Sunday,
            Weekday::Mon => RepeatDay::Monday,
            Weekday::Tue => RepeatDay::Tuesday,
            Weekday::Wed => RepeatDay::Wednesday,
            Weekday::Thu => RepeatDay::Thursday,
            Weekday::Fri => RepeatDay::Friday,
            Weekday::Sat => RepeatDay::Saturday,
        }
    }
}

/// An alarm, the sole persistent entity.
///
/// `id == 0` means the record has not been persisted yet; the editor
/// works on an unsaved alarm until the user explicitly saves it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alarm {
    pub id: i64,
    pub hour: u32,
    pub minute: u32,
    pub is_enabled: bool,
    /// Empty set means a one-time alarm; non-empty means repeat weekly
    /// on these weekdays.
    #[sqlx(json)]
    pub selected_days: BTreeSet<RepeatDay>,
    /// When set and in the future, the next computed occurrence at or
    /// before this wall-clock time is suppressed. `None` means no
    /// active skip.
    pub skipped_until: Option<NaiveDateTime>,
    pub label: Option<String>,
    pub is_lux_dismissal_enabled: bool,
    /// Illuminance that must be exceeded (strict `>`) to permit
    /// dismissal, in lux.
    pub dismiss_lux: u32,
    /// Percentage of the platform's maximum alarm stream volume
    pub volume: u32,
    /// `None` falls back to the platform default alarm sound
    pub ringtone_uri: Option<String>,
    pub is_pin_enabled: bool,
    pub pin: Option<String>,
    /// Manual list position maintained by drag-reorder; irrelevant to
    /// scheduling.
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alarm {
    /// A blank alarm the editor starts from.
    pub fn draft(hour: u32, minute: u32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            hour,
            minute,
            is_enabled: true,
            selected_days: BTreeSet::new(),
            skipped_until: None,
            label: None,
            is_lux_dismissal_enabled: true,
            dismiss_lux: config::DEFAULT_DISMISS_LUX,
            volume: config::DEFAULT_VOLUME,
            ringtone_uri: None,
            is_pin_enabled: false,
            pin: None,
            display_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the alarm repeats weekly; false for a one-time alarm.
    pub fn is_repeating(&self) -> bool {
        !self.selected_days.is_empty()
    }

    /// True when a skip is set and still ahead of `now`.
    pub fn has_active_skip(&self, now: NaiveDateTime) -> bool {
        self.skipped_until.is_some_and(|until| until > now)
    }

    /// Edit-time invariant checks.
    ///
    /// The trigger calculator assumes validated input and does not
    /// re-validate; every record must pass through here before it
    /// reaches the scheduler.
    pub fn validate(&self) -> Result<()> {
        if self.hour > config::MAX_HOUR {
            return Err(AppError::InvalidAlarm(format!(
                "hour {} out of range 0..={}",
                self.hour,
                config::MAX_HOUR
            )));
        }
        if self.minute > config::MAX_MINUTE {
            return Err(AppError::InvalidAlarm(format!(
                "minute {} out of range 0..={}",
                self.minute,
                config::MAX_MINUTE
            )));
        }
        if self.dismiss_lux > config::MAX_DISMISS_LUX {
            return Err(AppError::InvalidAlarm(format!(
                "dismiss lux {} out of range 0..={}",
                self.dismiss_lux,
                config::MAX_DISMISS_LUX
            )));
        }
        if self.volume > config::MAX_VOLUME {
            return Err(AppError::InvalidAlarm(format!(
                "volume {} out of range 0..={}",
                self.volume,
                config::MAX_VOLUME
            )));
        }
        if self.is_pin_enabled
            && self.pin.as_deref().map_or(true, |p| p.trim().is_empty())
        {
            return Err(AppError::InvalidAlarm(
                "PIN dismissal enabled with a blank PIN".to_string(),
            ));
        }
        Ok(())
    }
}
