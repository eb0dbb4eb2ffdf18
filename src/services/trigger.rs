//! Next-trigger calculator
//!
//! Pure wall-clock arithmetic mapping an alarm's configuration and a
//! reference time to the next instant it should fire. No side effects,
//! no I/O, no clock reads — callers supply `from`.
//!
//! All values are naive local wall-clock times. A timezone or DST
//! change between computation and firing shifts the apparent local
//! fire time; that is an accepted limitation of the whole app, not of
//! this module.

use crate::database::Alarm;
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

/// Compute the next trigger time for `alarm` after `from`.
///
/// Returns `None` when the alarm produces no future trigger: it is
/// fully disabled (disabled with no pending skip), or — which cannot
/// happen for validated input — no qualifying day exists.
///
/// The skip marker moves the search origin: a `skipped_until` still in
/// the future makes the search start there, suppressing every
/// occurrence at or before it.
///
/// Comparison policy: repeating alarms accept candidates strictly
/// after the origin, so an occurrence exactly equal to the origin is
/// never re-armed. One-time alarms roll a candidate at-or-before the
/// origin forward one day, deliberately looser so the armed instant is
/// never in the past.
pub fn next_trigger(alarm: &Alarm, from: NaiveDateTime) -> Option<NaiveDateTime> {
    if !alarm.is_enabled && alarm.skipped_until.is_none() {
        return None;
    }

    let origin = match alarm.skipped_until {
        Some(until) if until > from => until,
        _ => from,
    };

    // Seconds are always normalized to zero.
    let time_of_day = NaiveTime::from_hms_opt(alarm.hour, alarm.minute, 0)?;

    // One-time alarm: today at hh:mm, or tomorrow if that has passed.
    if alarm.selected_days.is_empty() {
        let mut candidate = origin.date().and_time(time_of_day);
        if candidate <= origin {
            candidate = candidate + Duration::days(1);
        }
        return Some(candidate);
    }

    // Repeating alarm: scan forward from the origin's own day through a
    // full week, so every selected weekday is tried exactly once.
    let selected: Vec<Weekday> = alarm
        .selected_days
        .iter()
        .map(|day| day.to_weekday())
        .collect();

    for day_offset in 0..=7 {
        let date = origin.date() + Duration::days(day_offset);
        if selected.contains(&date.weekday()) {
            let candidate = date.and_time(time_of_day);
            if candidate > origin {
                return Some(candidate);
            }
        }
    }

    // Unreachable for a validated non-empty day set; surfaced as "no
    // trigger computed" rather than a panic.
    None
}
