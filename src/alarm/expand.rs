//! Recurring-schedule expansion.
//!
//! Pure wall-clock math: given an [`AlarmSpec`] and `now`, compute the
//! next firing instant. Time-of-day is always read from `origin`, never
//! from the record's current run time, so recurrences cannot drift. No
//! DST adjustment is applied beyond what the calendar types provide;
//! wall-clock time is taken as the user's stated intent.

use crate::alarm::spec::{AlarmSpec, ScheduleKind};
use chrono::{Datelike, Days, NaiveDateTime};

/// Compute the next firing of `spec` strictly after `now`.
///
/// Returns `None` when the alarm is exhausted: a `Once` alarm whose
/// origin has passed, or a `CustomDays` alarm with no allowed days.
#[must_use]
pub fn next_occurrence(spec: &AlarmSpec, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let origin = spec.origin.to_naive()?;
    let time_of_day = origin.time();

    match spec.schedule.kind {
        ScheduleKind::Once => (origin > now).then_some(origin),
        ScheduleKind::Daily => {
            if origin > now {
                return Some(origin);
            }
            first_future_instant(now, time_of_day, |_| true)
        }
        ScheduleKind::Weekly => {
            if origin > now {
                return Some(origin);
            }
            let anchor = origin.weekday();
            first_future_instant(now, time_of_day, |d| d.weekday() == anchor)
        }
        ScheduleKind::CustomDays => {
            if spec.schedule.days.is_empty() {
                return None;
            }
            first_future_instant(now, time_of_day, |d| spec.schedule.allows(d.weekday()))
        }
    }
}

/// Earliest instant strictly after `now` carrying `time_of_day`, on the
/// smallest calendar date (scanning forward from `now`'s date) whose
/// weekday passes `allowed`. Eight days cover one full weekday cycle
/// plus the same-day-but-earlier case.
fn first_future_instant(
    now: NaiveDateTime,
    time_of_day: chrono::NaiveTime,
    allowed: impl Fn(chrono::NaiveDate) -> bool,
) -> Option<NaiveDateTime> {
    (0..=7u64)
        .filter_map(|offset| now.date().checked_add_days(Days::new(offset)))
        .filter(|d| allowed(*d))
        .map(|d| d.and_time(time_of_day))
        .find(|t| *t > now)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::alarm::spec::{
        AlarmSpec, ScheduleSpec, SnoozePolicy, SoundRef, WallTime, Weekday,
    };
    use chrono::{NaiveDate, Weekday as ChronoWeekday};

    /// 2025-01-06 is a Monday.
    fn monday(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn spec_with(kind: ScheduleKind, days: Vec<Weekday>, origin: NaiveDateTime) -> AlarmSpec {
        AlarmSpec {
            alarm_name: "Test".to_owned(),
            origin: WallTime::from_naive(origin),
            schedule: ScheduleSpec { kind, days },
            sound: SoundRef {
                path: "/tmp/beep.wav".to_owned(),
                is_custom: false,
                display_name: "Beep".to_owned(),
            },
            snooze: SnoozePolicy {
                total_times: 2,
                total_remaining: 2,
                interval_minutes: 5,
            },
            current_run: WallTime::from_naive(origin),
        }
    }

    #[test]
    fn once_in_future_fires_at_origin() {
        let spec = spec_with(ScheduleKind::Once, vec![], monday(9, 0, 5));
        assert_eq!(next_occurrence(&spec, monday(9, 0, 0)), Some(monday(9, 0, 5)));
    }

    #[test]
    fn once_in_past_is_exhausted() {
        let spec = spec_with(ScheduleKind::Once, vec![], monday(9, 0, 5));
        assert_eq!(next_occurrence(&spec, monday(9, 0, 5)), None);
        assert_eq!(next_occurrence(&spec, monday(10, 0, 0)), None);
    }

    #[test]
    fn daily_future_origin_wins() {
        let spec = spec_with(ScheduleKind::Daily, vec![], monday(9, 0, 5));
        assert_eq!(next_occurrence(&spec, monday(8, 0, 0)), Some(monday(9, 0, 5)));
    }

    #[test]
    fn daily_advances_exactly_one_day_after_firing() {
        let spec = spec_with(ScheduleKind::Daily, vec![], monday(9, 0, 5));
        let next = next_occurrence(&spec, monday(9, 0, 6)).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(9, 0, 5)
            .unwrap();
        assert_eq!(next, tuesday);
    }

    #[test]
    fn daily_same_instant_rolls_to_next_day() {
        // run_time strictly in the future: firing at exactly origin
        // must schedule tomorrow, not today again.
        let spec = spec_with(ScheduleKind::Daily, vec![], monday(9, 0, 5));
        let next = next_occurrence(&spec, monday(9, 0, 5)).unwrap();
        assert_eq!(next.date(), NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
    }

    #[test]
    fn daily_seconds_are_preserved() {
        let spec = spec_with(ScheduleKind::Daily, vec![], monday(22, 15, 42));
        let next = next_occurrence(&spec, monday(23, 0, 0)).unwrap();
        assert_eq!(next.time(), monday(22, 15, 42).time());
    }

    #[test]
    fn weekly_sticks_to_origin_weekday() {
        let spec = spec_with(ScheduleKind::Weekly, vec![], monday(9, 0, 5));
        let next = next_occurrence(&spec, monday(9, 0, 6)).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        assert_eq!(next.date(), next_monday);
        assert_eq!(next.date().weekday(), ChronoWeekday::Mon);
        assert_eq!(next.time(), monday(9, 0, 5).time());
    }

    #[test]
    fn weekly_future_origin_wins() {
        let spec = spec_with(ScheduleKind::Weekly, vec![], monday(9, 0, 5));
        assert_eq!(next_occurrence(&spec, monday(7, 0, 0)), Some(monday(9, 0, 5)));
    }

    #[test]
    fn custom_days_walks_wed_fri_wed() {
        // Days {Wed, Fri}, origin Mon 09:00:00.
        let spec = spec_with(
            ScheduleKind::CustomDays,
            vec![Weekday::Wed, Weekday::Fri],
            monday(9, 0, 0),
        );

        let wed = NaiveDate::from_ymd_opt(2025, 1, 8)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let fri = NaiveDate::from_ymd_opt(2025, 1, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let next_wed = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        let first = next_occurrence(&spec, monday(9, 0, 1)).unwrap();
        assert_eq!(first, wed);
        let second = next_occurrence(&spec, first + chrono::Duration::seconds(1)).unwrap();
        assert_eq!(second, fri);
        let third = next_occurrence(&spec, second + chrono::Duration::seconds(1)).unwrap();
        assert_eq!(third, next_wed);
    }

    #[test]
    fn custom_days_same_day_later_time_fires_today() {
        let spec = spec_with(ScheduleKind::CustomDays, vec![Weekday::Mon], monday(21, 0, 0));
        let next = next_occurrence(&spec, monday(9, 0, 0)).unwrap();
        assert_eq!(next, monday(21, 0, 0));
    }

    #[test]
    fn custom_days_without_days_is_exhausted() {
        let spec = spec_with(ScheduleKind::CustomDays, vec![], monday(9, 0, 0));
        assert_eq!(next_occurrence(&spec, monday(8, 0, 0)), None);
    }

    #[test]
    fn expansion_is_idempotent_at_fixed_now() {
        let spec = spec_with(ScheduleKind::Daily, vec![], monday(9, 0, 5));
        let now = monday(11, 30, 0);
        assert_eq!(next_occurrence(&spec, now), next_occurrence(&spec, now));
    }

    #[test]
    fn time_of_day_anchors_to_origin_not_current_run() {
        // A drifted current_run must not influence the next firing.
        let mut spec = spec_with(ScheduleKind::Daily, vec![], monday(9, 0, 5));
        spec.current_run = WallTime::from_naive(monday(9, 17, 31));
        let next = next_occurrence(&spec, monday(10, 0, 0)).unwrap();
        assert_eq!(next.time(), monday(9, 0, 5).time());
    }
}
