//! Alarm engine.
//!
//! Recurring schedule expansion, the per-firing notifier lifecycle,
//! snooze-chain construction, and bounded looping sound playback.

pub mod expand;
pub mod notifier;
pub mod snooze;
pub mod sound;
pub mod spec;

pub use expand::next_occurrence;
pub use notifier::{Notifier, NotifierAction, NotifierOutcome};
pub use snooze::snooze_followup;
pub use sound::{ActiveSound, CpalSoundPlayer, SoundPlayer};
pub use spec::{AlarmSpec, ScheduleKind, ScheduleSpec, SnoozePolicy, SoundRef, WallTime, Weekday};
