//! Alarm scheduler
//!
//! Orchestrates the trigger calculator against the platform wake
//! timer: arms, cancels and re-arms one-shot timers so that the armed
//! timer namespace always mirrors the persisted alarm records. Timers
//! are keyed by alarm id — arming a key replaces any previous arming
//! for that key, which makes every operation here idempotent per
//! alarm.
//!
//! The platform timer is strictly one-shot, so "repeating" alarms are
//! re-armed by [`AlarmScheduler::handle_fire`] every time they fire.

use crate::config;
use crate::database::{Alarm, Repository};
use crate::error::Result;
use crate::platform::WakeTimer;
use crate::services::trigger::next_trigger;
use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;

/// Result of skipping an alarm's next occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOutcome {
    /// The occurrence that was skipped (for display, and the value the
    /// caller persists as `skipped_until`).
    pub skipped: NaiveDateTime,
    /// The occurrence actually armed in its place, if any.
    pub next: Option<NaiveDateTime>,
}

/// Scheduler keeping platform wake timers consistent with alarm records
#[derive(Clone)]
pub struct AlarmScheduler {
    repo: Repository,
    timer: Arc<dyn WakeTimer>,
}

impl AlarmScheduler {
    pub fn new(repo: Repository, timer: Arc<dyn WakeTimer>) -> Self {
        Self { repo, timer }
    }

    /// Arm the wake timer for the alarm's next trigger, or cancel any
    /// existing arming when no future trigger exists. Returns the
    /// armed wall-clock time for display.
    pub fn schedule(&self, alarm: &Alarm) -> Option<NaiveDateTime> {
        self.schedule_from(alarm, Local::now().naive_local())
    }

    /// [`schedule`](Self::schedule) with an explicit reference time.
    pub fn schedule_from(&self, alarm: &Alarm, from: NaiveDateTime) -> Option<NaiveDateTime> {
        match next_trigger(alarm, from) {
            Some(at) => {
                self.timer.arm(alarm.id, wall_clock_to_instant(at));
                tracing::info!("Scheduled alarm {} for {}", alarm.id, at);
                Some(at)
            }
            None => {
                self.timer.cancel(alarm.id);
                tracing::info!("Alarm {} has no future trigger; timer cleared", alarm.id);
                None
            }
        }
    }

    /// Cancel any armed timer for the alarm id. Cancelling an id with
    /// nothing armed is a no-op.
    pub fn cancel(&self, alarm_id: i64) {
        self.timer.cancel(alarm_id);
        tracing::info!("Cancelled alarm {}", alarm_id);
    }

    /// Skip the alarm's next occurrence: arm the occurrence after it
    /// and report the skipped one. The caller persists
    /// `skipped_until = skipped` so the skip survives restarts.
    ///
    /// Returns `None` when the alarm has no upcoming occurrence to
    /// skip in the first place.
    pub fn skip_next(&self, alarm: &Alarm) -> Option<SkipOutcome> {
        self.skip_next_from(alarm, Local::now().naive_local())
    }

    /// [`skip_next`](Self::skip_next) with an explicit reference time.
    pub fn skip_next_from(&self, alarm: &Alarm, from: NaiveDateTime) -> Option<SkipOutcome> {
        let skipped = next_trigger(alarm, from)?;

        // One minute past the skipped occurrence guarantees progress
        // without ever selecting it again.
        let next = next_trigger(
            alarm,
            skipped + Duration::minutes(config::SKIP_SEARCH_OFFSET_MINUTES),
        );

        match next {
            Some(at) => self.timer.arm(alarm.id, wall_clock_to_instant(at)),
            None => self.timer.cancel(alarm.id),
        }

        tracing::info!(
            "Skipped alarm {} occurrence at {}; next armed: {:?}",
            alarm.id,
            skipped,
            next
        );

        Some(SkipOutcome { skipped, next })
    }

    /// Handle a wake-timer fire for `alarm_id`.
    ///
    /// Runs with only the persisted id as input — the timer may fire
    /// long after the process that armed it is gone. A record deleted
    /// between arming and firing is a clean no-op (`None`); the caller
    /// must then end any started ringing session instead of crashing.
    ///
    /// Repeating alarms are re-armed for their following occurrence
    /// before the ringing session starts, since the platform timer
    /// will not repeat on its own.
    pub async fn handle_fire(&self, alarm_id: i64) -> Result<Option<Alarm>> {
        let Some(alarm) = self.repo.get_by_id(alarm_id).await? else {
            tracing::warn!("Wake timer fired for missing alarm {}; ignoring", alarm_id);
            return Ok(None);
        };

        if alarm.is_repeating() {
            self.schedule(&alarm);
        }

        Ok(Some(alarm))
    }

    /// Arm a snooze timer at now + `minutes` under the same alarm id.
    ///
    /// Bypasses trigger computation entirely; `is_enabled`,
    /// `skipped_until` and the stored schedule are untouched.
    pub fn snooze(&self, alarm_id: i64, minutes: u32) -> Result<DateTime<Utc>> {
        if minutes == 0 || minutes > config::MAX_SNOOZE_MINUTES {
            return Err(crate::error::AppError::Generic(format!(
                "snooze duration {} minutes out of range 1..={}",
                minutes,
                config::MAX_SNOOZE_MINUTES
            )));
        }

        let at = Utc::now() + Duration::minutes(i64::from(minutes));
        self.timer.arm(alarm_id, at);
        tracing::info!("Snoozed alarm {} for {} minutes", alarm_id, minutes);
        Ok(at)
    }

    /// Re-arm every persisted alarm that can still produce a trigger.
    ///
    /// The armed-timer namespace does not survive a device restart;
    /// the records do. Called once on boot to bring the two back into
    /// agreement. Returns the number of alarms armed.
    pub async fn reschedule_all(&self) -> Result<usize> {
        let alarms = self.repo.get_all().await?;
        let mut armed = 0;

        for alarm in &alarms {
            if self.schedule(alarm).is_some() {
                armed += 1;
            }
        }

        tracing::info!("Rescheduled {} of {} alarms after restart", armed, alarms.len());
        Ok(armed)
    }
}

/// Resolve a naive local wall-clock time to the absolute instant the
/// platform timer needs.
///
/// A time made ambiguous by a DST fold resolves to its earlier
/// occurrence; a time inside a spring-forward gap slides one hour
/// later. Shifted apparent fire times around DST transitions are an
/// accepted limitation.
pub(crate) fn wall_clock_to_instant(wall: NaiveDateTime) -> DateTime<Utc> {
    match Local.from_local_datetime(&wall) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            let nudged = wall + Duration::hours(1);
            match Local.from_local_datetime(&nudged) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                    tracing::warn!(
                        "Wall-clock time {} falls in a DST gap; armed for {} instead",
                        wall,
                        nudged
                    );
                    dt.with_timezone(&Utc)
                }
                LocalResult::None => Utc::now(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{initialize_database, RepeatDay};
    use crate::error::AppError;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records arm/cancel calls in place of the platform facility.
    #[derive(Default)]
    struct MockTimer {
        armed: Mutex<HashMap<i64, DateTime<Utc>>>,
    }

    impl MockTimer {
        fn armed_at(&self, key: i64) -> Option<DateTime<Utc>> {
            self.armed.lock().unwrap().get(&key).copied()
        }

        fn armed_count(&self) -> usize {
            self.armed.lock().unwrap().len()
        }
    }

    impl WakeTimer for MockTimer {
        fn arm(&self, key: i64, at: DateTime<Utc>) {
            self.armed.lock().unwrap().insert(key, at);
        }

        fn cancel(&self, key: i64) {
            self.armed.lock().unwrap().remove(&key);
        }
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    async fn create_test_scheduler() -> (AlarmScheduler, Repository, Arc<MockTimer>) {
        crate::init_test_logging();
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let repo = Repository::new(pool);
        let timer = Arc::new(MockTimer::default());
        let scheduler = AlarmScheduler::new(repo.clone(), timer.clone());

        (scheduler, repo, timer)
    }

    fn repeating(hour: u32, minute: u32, days: &[RepeatDay]) -> Alarm {
        let mut alarm = Alarm::draft(hour, minute);
        alarm.selected_days = days.iter().copied().collect();
        alarm
    }

    #[tokio::test]
    async fn test_schedule_is_idempotent() {
        let (scheduler, repo, timer) = create_test_scheduler().await;
        let alarm = repo.insert(&Alarm::draft(7, 0)).await.unwrap();

        let from = dt("2025-06-10 06:00");
        let first = scheduler.schedule_from(&alarm, from).unwrap();
        let second = scheduler.schedule_from(&alarm, from).unwrap();

        assert_eq!(first, second);
        assert_eq!(timer.armed_count(), 1);
        assert_eq!(
            timer.armed_at(alarm.id),
            Some(wall_clock_to_instant(first))
        );
    }

    #[tokio::test]
    async fn test_schedule_disabled_alarm_clears_timer() {
        let (scheduler, repo, timer) = create_test_scheduler().await;

        let mut alarm = repo.insert(&Alarm::draft(7, 0)).await.unwrap();
        scheduler.schedule_from(&alarm, dt("2025-06-10 06:00"));
        assert_eq!(timer.armed_count(), 1);

        alarm.is_enabled = false;
        let result = scheduler.schedule_from(&alarm, dt("2025-06-10 06:00"));

        assert_eq!(result, None);
        assert_eq!(timer.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_each_alarm_owns_its_timer_slot() {
        let (scheduler, repo, timer) = create_test_scheduler().await;

        let first = repo.insert(&Alarm::draft(7, 0)).await.unwrap();
        let second = repo.insert(&Alarm::draft(8, 0)).await.unwrap();

        scheduler.schedule_from(&first, dt("2025-06-10 06:00"));
        scheduler.schedule_from(&second, dt("2025-06-10 06:00"));
        assert_eq!(timer.armed_count(), 2);

        scheduler.cancel(first.id);
        assert_eq!(timer.armed_count(), 1);
        assert!(timer.armed_at(second.id).is_some());
    }

    #[tokio::test]
    async fn test_skip_next_arms_following_occurrence() {
        // Monday alarm skipped on a Monday before 07:00: the skipped
        // occurrence is today's, the armed one is next week's.
        let (scheduler, repo, timer) = create_test_scheduler().await;

        let mut alarm = repeating(7, 0, &[RepeatDay::Monday]);
        alarm = repo.insert(&alarm).await.unwrap();

        let outcome = scheduler
            .skip_next_from(&alarm, dt("2025-06-09 06:00"))
            .unwrap();

        assert_eq!(outcome.skipped, dt("2025-06-09 07:00"));
        assert_eq!(outcome.next, Some(dt("2025-06-16 07:00")));
        assert_eq!(
            timer.armed_at(alarm.id),
            Some(wall_clock_to_instant(dt("2025-06-16 07:00")))
        );
    }

    #[tokio::test]
    async fn test_skip_next_matches_calculator_from_offset() {
        let (scheduler, repo, _timer) = create_test_scheduler().await;

        let mut alarm = repeating(6, 30, &[RepeatDay::Tuesday, RepeatDay::Thursday]);
        alarm = repo.insert(&alarm).await.unwrap();

        let from = dt("2025-06-09 12:00");
        let outcome = scheduler.skip_next_from(&alarm, from).unwrap();

        assert!(outcome.next.unwrap() > outcome.skipped);
        assert_eq!(
            outcome.next,
            next_trigger(&alarm, outcome.skipped + Duration::minutes(1))
        );
    }

    #[tokio::test]
    async fn test_skip_next_one_time_cancels_after_skip() {
        // A skipped one-time alarm still yields tomorrow's roll-forward
        // occurrence, so the timer stays armed one day later.
        let (scheduler, repo, timer) = create_test_scheduler().await;
        let alarm = repo.insert(&Alarm::draft(7, 0)).await.unwrap();

        let outcome = scheduler
            .skip_next_from(&alarm, dt("2025-06-10 06:00"))
            .unwrap();

        assert_eq!(outcome.skipped, dt("2025-06-10 07:00"));
        assert_eq!(outcome.next, Some(dt("2025-06-11 07:00")));
        assert!(timer.armed_at(alarm.id).is_some());
    }

    #[tokio::test]
    async fn test_handle_fire_missing_record_is_noop() {
        let (scheduler, _repo, timer) = create_test_scheduler().await;

        let result = scheduler.handle_fire(4242).await.unwrap();

        assert!(result.is_none());
        assert_eq!(timer.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_fire_rearms_repeating_alarm() {
        let (scheduler, repo, timer) = create_test_scheduler().await;

        let mut alarm = repeating(7, 0, &[RepeatDay::Monday, RepeatDay::Friday]);
        alarm = repo.insert(&alarm).await.unwrap();

        let fired = scheduler.handle_fire(alarm.id).await.unwrap().unwrap();

        assert_eq!(fired.id, alarm.id);
        // One-shot platform timer: the next occurrence must already be armed.
        assert!(timer.armed_at(alarm.id).is_some());
    }

    #[tokio::test]
    async fn test_handle_fire_one_time_does_not_rearm() {
        let (scheduler, repo, timer) = create_test_scheduler().await;
        let alarm = repo.insert(&Alarm::draft(7, 0)).await.unwrap();

        let fired = scheduler.handle_fire(alarm.id).await.unwrap().unwrap();

        assert!(!fired.is_repeating());
        assert_eq!(timer.armed_count(), 0);
    }

    #[tokio::test]
    async fn test_snooze_arms_relative_timer() {
        let (scheduler, repo, timer) = create_test_scheduler().await;
        let alarm = repo.insert(&Alarm::draft(7, 0)).await.unwrap();

        let before = Utc::now();
        let at = scheduler.snooze(alarm.id, 10).unwrap();
        let after = Utc::now();

        assert!(at >= before + Duration::minutes(10));
        assert!(at <= after + Duration::minutes(10));
        assert_eq!(timer.armed_at(alarm.id), Some(at));
    }

    #[tokio::test]
    async fn test_snooze_rejects_out_of_range_duration() {
        let (scheduler, _repo, _timer) = create_test_scheduler().await;

        assert!(matches!(
            scheduler.snooze(1, 0),
            Err(AppError::Generic(_))
        ));
        assert!(matches!(
            scheduler.snooze(1, config::MAX_SNOOZE_MINUTES + 1),
            Err(AppError::Generic(_))
        ));
    }

    #[tokio::test]
    async fn test_snooze_accepts_every_ui_preset() {
        // The picker only offers these durations; each of them must
        // land inside the scheduler's accepted range.
        let (scheduler, repo, timer) = create_test_scheduler().await;
        let alarm = repo.insert(&Alarm::draft(7, 0)).await.unwrap();

        for &minutes in config::SNOOZE_PRESETS_MINUTES {
            assert!(minutes <= config::MAX_SNOOZE_MINUTES);
            let at = scheduler.snooze(alarm.id, minutes).unwrap();
            assert_eq!(timer.armed_at(alarm.id), Some(at));
        }
    }

    #[tokio::test]
    async fn test_reschedule_all_skips_disabled_alarms() {
        let (scheduler, repo, timer) = create_test_scheduler().await;

        repo.insert(&Alarm::draft(7, 0)).await.unwrap();
        repo.insert(&repeating(8, 0, &[RepeatDay::Sunday])).await.unwrap();

        let mut disabled = Alarm::draft(9, 0);
        disabled.is_enabled = false;
        repo.insert(&disabled).await.unwrap();

        let armed = scheduler.reschedule_all().await.unwrap();

        assert_eq!(armed, 2);
        assert_eq!(timer.armed_count(), 2);
    }
}
