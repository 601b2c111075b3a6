//! Persisted task records and submission validation.
//!
//! Defines the [`TaskRecord`] type stored in `scheduled_tasks.json`, the
//! per-type [`ActionPayload`], and the validation applied to every task
//! submitted through the scheduler.

use crate::alarm::{AlarmSpec, ScheduleKind};
use crate::error::{Result, SchedulerError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identifier, stable across restarts.
pub type TaskId = Uuid;

/// The action category of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Spawn an executable at its stored path.
    Executable,
    /// Open a URL in the default browser.
    Website,
    /// Open a media file with the default application.
    OpenMedia,
    /// Raise a system notification.
    Notification,
    /// Ring an alarm through the alarm engine.
    Alarm,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Executable => write!(f, "Executable"),
            Self::Website => write!(f, "Website"),
            Self::OpenMedia => write!(f, "Open media"),
            Self::Notification => write!(f, "Notification"),
            Self::Alarm => write!(f, "Alarm"),
        }
    }
}

/// Type-discriminated action data carried by a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// Spawn the process at `path` with no arguments.
    Executable {
        /// Filesystem path of the executable.
        path: String,
    },
    /// Open `url` in the platform default browser.
    Website {
        /// Absolute URL.
        url: String,
    },
    /// Open `path` with the platform default application.
    OpenMedia {
        /// Filesystem path of the media file.
        path: String,
    },
    /// Raise a system notification.
    Notification {
        /// Notification title.
        title: String,
        /// Notification body.
        message: String,
    },
    /// Ring an alarm.
    Alarm(AlarmSpec),
}

impl ActionPayload {
    /// The [`TaskKind`] this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> TaskKind {
        match self {
            Self::Executable { .. } => TaskKind::Executable,
            Self::Website { .. } => TaskKind::Website,
            Self::OpenMedia { .. } => TaskKind::OpenMedia,
            Self::Notification { .. } => TaskKind::Notification,
            Self::Alarm(_) => TaskKind::Alarm,
        }
    }
}

/// A scheduled task as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique task id, assigned at submission.
    pub id: TaskId,
    /// Human label, non-empty.
    pub name: String,
    /// Action category. Always matches `action_payload`.
    #[serde(rename = "type")]
    pub kind: TaskKind,
    /// Next firing instant, local wall-clock. Strictly in the future at
    /// write time.
    pub run_time: NaiveDateTime,
    /// Per-type action data.
    pub action_payload: ActionPayload,
    /// Pre-rendered short string for the task list UI. Not authoritative.
    #[serde(default)]
    pub display_details: String,
}

impl TaskRecord {
    /// Build a record with a fresh id. The kind is derived from the
    /// payload, so the two can never disagree at construction.
    #[must_use]
    pub fn new(
        name: String,
        run_time: NaiveDateTime,
        payload: ActionPayload,
        display_details: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind: payload.kind(),
            run_time,
            action_payload: payload,
            display_details,
        }
    }

    /// A loaded record is consistent when its stored `type` matches the
    /// payload discriminant. Records failing this are treated as
    /// malformed and skipped by the store.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.kind == self.action_payload.kind()
    }
}

/// A task submission, before validation and id assignment.
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Human label.
    pub name: String,
    /// Absolute local wall-clock firing instant.
    pub run_time: NaiveDateTime,
    /// Per-type action data.
    pub payload: ActionPayload,
    /// Optional pre-rendered UI string; rendered from the payload when
    /// absent.
    pub display_details: Option<String>,
}

impl NewTask {
    /// Create a submission with default display details.
    #[must_use]
    pub fn new(name: impl Into<String>, run_time: NaiveDateTime, payload: ActionPayload) -> Self {
        Self {
            name: name.into(),
            run_time,
            payload,
            display_details: None,
        }
    }

    /// Validate the submission against `now` and produce a persistable
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidInput`] for an empty name, empty
    /// required payload fields, an alarm with no custom days or a missing
    /// sound file, or a run time not strictly in the future.
    pub fn into_record(self, now: NaiveDateTime) -> Result<TaskRecord> {
        validate_name(&self.name)?;
        validate_payload(&self.payload)?;
        if self.run_time <= now {
            return Err(SchedulerError::InvalidInput(format!(
                "run time {} is not in the future",
                self.run_time
            )));
        }
        let details = self
            .display_details
            .unwrap_or_else(|| render_display_details(&self.payload, self.run_time));
        Ok(TaskRecord::new(self.name, self.run_time, self.payload, details))
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SchedulerError::InvalidInput(
            "task name must not be empty".to_owned(),
        ));
    }
    Ok(())
}

fn validate_payload(payload: &ActionPayload) -> Result<()> {
    match payload {
        ActionPayload::Executable { path } => require_field(path, "executable path"),
        ActionPayload::Website { url } => require_field(url, "website URL"),
        ActionPayload::OpenMedia { path } => require_field(path, "media path"),
        ActionPayload::Notification { title, message } => {
            require_field(title, "notification title")?;
            require_field(message, "notification message")
        }
        ActionPayload::Alarm(spec) => validate_alarm(spec),
    }
}

fn require_field(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SchedulerError::InvalidInput(format!(
            "{what} must not be empty"
        )));
    }
    Ok(())
}

fn validate_alarm(spec: &AlarmSpec) -> Result<()> {
    require_field(&spec.alarm_name, "alarm name")?;
    if spec.schedule.kind == ScheduleKind::CustomDays && spec.schedule.days.is_empty() {
        return Err(SchedulerError::InvalidInput(
            "custom-days alarm needs at least one day".to_owned(),
        ));
    }
    if spec.origin.to_naive().is_none() {
        return Err(SchedulerError::InvalidInput(format!(
            "alarm origin {:?} is not a valid date",
            spec.origin
        )));
    }
    if !std::path::Path::new(&spec.sound.path).exists() {
        return Err(SchedulerError::InvalidInput(format!(
            "alarm sound file not found: {}",
            spec.sound.path
        )));
    }
    if spec.snooze.total_remaining > 0 && spec.snooze.interval_minutes == 0 {
        return Err(SchedulerError::InvalidInput(
            "snooze interval must be at least one minute".to_owned(),
        ));
    }
    Ok(())
}

/// Default task-list string when the submitter does not supply one.
#[must_use]
pub fn render_display_details(payload: &ActionPayload, run_time: NaiveDateTime) -> String {
    let when = run_time.format("%Y-%m-%d %H:%M:%S");
    match payload {
        ActionPayload::Executable { path } => format!("Run {path} at {when}"),
        ActionPayload::Website { url } => format!("Open {url} at {when}"),
        ActionPayload::OpenMedia { path } => format!("Play {path} at {when}"),
        ActionPayload::Notification { title, .. } => format!("Notify \"{title}\" at {when}"),
        ActionPayload::Alarm(spec) => {
            format!("Alarm \"{}\" ({}) at {when}", spec.alarm_name, spec.schedule)
        }
    }
}
