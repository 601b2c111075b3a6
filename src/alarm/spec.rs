//! Alarm data model.
//!
//! [`AlarmSpec`] is the `action_payload` of an alarm task. Its `origin`
//! is the originally configured wall-clock instant and anchors all
//! recurrence math; `current_run` is the denormalized next firing kept
//! for diagnostic readability of the store file.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A local wall-clock instant broken into calendar fields, exactly as
/// the user configured it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallTime {
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
    /// Hour, 0-23.
    pub hour: u32,
    /// Minute, 0-59.
    pub minute: u32,
    /// Second, 0-59.
    pub second: u32,
}

impl WallTime {
    /// Convert to a [`NaiveDateTime`]. `None` when the fields do not
    /// name a real calendar instant.
    #[must_use]
    pub fn to_naive(self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, self.second))
    }

    /// Break a [`NaiveDateTime`] into wall-clock fields.
    #[must_use]
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            minute: dt.minute(),
            second: dt.second(),
        }
    }
}

/// Day of week for custom-day alarm schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    /// Monday.
    Mon,
    /// Tuesday.
    Tue,
    /// Wednesday.
    Wed,
    /// Thursday.
    Thu,
    /// Friday.
    Fri,
    /// Saturday.
    Sat,
    /// Sunday.
    Sun,
}

impl Weekday {
    /// Corresponding [`chrono::Weekday`].
    #[must_use]
    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Mon => chrono::Weekday::Mon,
            Self::Tue => chrono::Weekday::Tue,
            Self::Wed => chrono::Weekday::Wed,
            Self::Thu => chrono::Weekday::Thu,
            Self::Fri => chrono::Weekday::Fri,
            Self::Sat => chrono::Weekday::Sat,
            Self::Sun => chrono::Weekday::Sun,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Self::Mon,
            chrono::Weekday::Tue => Self::Tue,
            chrono::Weekday::Wed => Self::Wed,
            chrono::Weekday::Thu => Self::Thu,
            chrono::Weekday::Fri => Self::Fri,
            chrono::Weekday::Sat => Self::Sat,
            chrono::Weekday::Sun => Self::Sun,
        }
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
            Self::Sat => "Sat",
            Self::Sun => "Sun",
        };
        write!(f, "{name}")
    }
}

/// How often an alarm recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    /// Fire once at `origin`.
    Once,
    /// Fire every day at origin's time-of-day.
    Daily,
    /// Fire every week on origin's weekday.
    Weekly,
    /// Fire on a chosen subset of weekdays.
    CustomDays,
}

/// An alarm's recurrence schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// Recurrence class.
    pub kind: ScheduleKind,
    /// Allowed weekdays; meaningful (and required non-empty) only for
    /// [`ScheduleKind::CustomDays`].
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl ScheduleSpec {
    /// Schedule that fires exactly once.
    #[must_use]
    pub fn once() -> Self {
        Self {
            kind: ScheduleKind::Once,
            days: Vec::new(),
        }
    }

    /// Whether this schedule re-arms after a firing.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.kind != ScheduleKind::Once
    }

    /// Whether `day` is an allowed firing day.
    #[must_use]
    pub fn allows(&self, day: chrono::Weekday) -> bool {
        self.days.iter().any(|d| d.to_chrono() == day)
    }
}

impl std::fmt::Display for ScheduleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            ScheduleKind::Once => write!(f, "once"),
            ScheduleKind::Daily => write!(f, "daily"),
            ScheduleKind::Weekly => write!(f, "weekly"),
            ScheduleKind::CustomDays => {
                let days: Vec<String> = self.days.iter().map(ToString::to_string).collect();
                write!(f, "{}", days.join(", "))
            }
        }
    }
}

/// The alarm sound, chosen from the bundled set or a user file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundRef {
    /// Filesystem path of the sound file. Must exist at scheduling time.
    pub path: String,
    /// Whether the user picked their own file rather than a bundled one.
    #[serde(default)]
    pub is_custom: bool,
    /// Label shown in the alarm form.
    #[serde(default)]
    pub display_name: String,
}

/// Snooze budget and spacing for one alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozePolicy {
    /// Original snooze budget at the head of the chain. Defaults to
    /// `total_remaining` in files written before this field existed.
    #[serde(default)]
    pub total_times: u32,
    /// Snoozes left; each follow-up carries one fewer.
    pub total_remaining: u32,
    /// Minutes between a snooze and its follow-up firing.
    pub interval_minutes: u32,
}

impl SnoozePolicy {
    /// The chain's original budget, tolerating older files that lack
    /// `total_times`.
    #[must_use]
    pub fn effective_total(&self) -> u32 {
        self.total_times.max(self.total_remaining)
    }
}

/// Everything the alarm engine needs to fire, re-arm, and snooze one
/// alarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSpec {
    /// Label shown in the notifier window.
    pub alarm_name: String,
    /// Originally configured instant; the anchor for all recurrence
    /// math. Preserved across snoozes and recurrences.
    pub origin: WallTime,
    /// Recurrence schedule.
    pub schedule: ScheduleSpec,
    /// Sound to loop while ringing.
    pub sound: SoundRef,
    /// Snooze budget.
    pub snooze: SnoozePolicy,
    /// Next concrete firing; equal to the record's `run_time`.
    pub current_run: WallTime,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn wall_time_round_trip() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(9, 0, 5)
            .unwrap();
        let wall = WallTime::from_naive(dt);
        assert_eq!(wall.to_naive(), Some(dt));
    }

    #[test]
    fn invalid_wall_time_is_none() {
        let wall = WallTime {
            year: 2025,
            month: 2,
            day: 30,
            hour: 9,
            minute: 0,
            second: 0,
        };
        assert!(wall.to_naive().is_none());
    }

    #[test]
    fn schedule_allows_listed_days_only() {
        let schedule = ScheduleSpec {
            kind: ScheduleKind::CustomDays,
            days: vec![Weekday::Wed, Weekday::Fri],
        };
        assert!(schedule.allows(chrono::Weekday::Wed));
        assert!(!schedule.allows(chrono::Weekday::Mon));
    }

    #[test]
    fn once_is_not_recurring() {
        assert!(!ScheduleSpec::once().is_recurring());
        let daily = ScheduleSpec {
            kind: ScheduleKind::Daily,
            days: Vec::new(),
        };
        assert!(daily.is_recurring());
    }

    #[test]
    fn snooze_policy_tolerates_missing_total_times() {
        let json = r#"{"total_remaining": 3, "interval_minutes": 5}"#;
        let policy: SnoozePolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.effective_total(), 3);
    }

    #[test]
    fn weekday_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&vec![Weekday::Mon, Weekday::Sun]).unwrap();
        assert_eq!(json, r#"["mon","sun"]"#);
    }

    #[test]
    fn schedule_display() {
        let schedule = ScheduleSpec {
            kind: ScheduleKind::CustomDays,
            days: vec![Weekday::Wed, Weekday::Fri],
        };
        assert_eq!(schedule.to_string(), "Wed, Fri");
        assert_eq!(ScheduleSpec::once().to_string(), "once");
    }
}
