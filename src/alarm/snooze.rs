//! Snooze-chain construction.
//!
//! A snooze never mutates the firing record: it derives a brand-new
//! `Once` alarm from the current spec and submits it through the same
//! entry point as user-created tasks. The chain is visible in the task
//! list as `"<name> (Snooze 1)"`, `"<name> (Snooze 2)"`, ...

use crate::alarm::spec::{AlarmSpec, ScheduleSpec, WallTime};
use chrono::{Duration, NaiveDateTime};

/// Build the follow-up alarm for a snoozed firing of `spec`.
///
/// Returns the derived `Once` spec and its firing instant
/// (`now + interval`), or `None` when the snooze budget is exhausted.
/// `origin` is carried over unchanged so later math stays anchored to
/// the user's configured time-of-day.
#[must_use]
pub fn snooze_followup(spec: &AlarmSpec, now: NaiveDateTime) -> Option<(AlarmSpec, NaiveDateTime)> {
    let remaining = spec.snooze.total_remaining;
    if remaining == 0 {
        return None;
    }

    let ordinal = spec.snooze.effective_total() - remaining + 1;
    let run_time = now + Duration::minutes(i64::from(spec.snooze.interval_minutes));

    let mut child = spec.clone();
    child.alarm_name = format!("{} (Snooze {ordinal})", base_name(&spec.alarm_name));
    child.schedule = ScheduleSpec::once();
    child.snooze.total_times = spec.snooze.effective_total();
    child.snooze.total_remaining = remaining - 1;
    child.origin = spec.origin;
    child.current_run = WallTime::from_naive(run_time);

    Some((child, run_time))
}

/// The alarm name with any prior `" (Snooze N)"` suffix stripped, so
/// chained snoozes never stack suffixes.
#[must_use]
pub fn base_name(name: &str) -> &str {
    if let Some(idx) = name.rfind(" (Snooze ") {
        if name.ends_with(')') {
            return &name[..idx];
        }
    }
    name
}
