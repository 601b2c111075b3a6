//! Notifier lifecycle for one alarm firing.
//!
//! A [`Notifier`] is the transient UI-plus-audio session opened when an
//! alarm fires. It starts looping playback on a worker thread, reports
//! itself visible once playback is ready (or confirmed unavailable),
//! arms a single auto-stop timer, and then waits for exactly one
//! terminal event: user Stop, user Snooze, window close, or timeout.
//! Playback is always released on close.

use crate::alarm::sound::{ActiveSound, SoundPlayer};
use crate::scheduler::SchedulerEvent;
use crate::task::TaskId;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Ringing is bounded: with no user action the notifier closes itself
/// this long after becoming visible.
pub const AUTO_STOP: Duration = Duration::from_secs(120);

/// User-visible notifier actions, forwarded from the GUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierAction {
    /// Stop ringing; dispose per schedule kind.
    Stop,
    /// Request a snooze follow-up.
    Snooze,
    /// The notifier window was closed; interpreted as Stop.
    WindowClosed,
}

/// How a notifier session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierOutcome {
    /// Stop-like close: no follow-up task.
    Stopped,
    /// Snooze-like close: the engine owes a follow-up task.
    Snoozed,
}

/// One alarm-firing session.
pub struct Notifier {
    task_id: TaskId,
    alarm_name: String,
    sound_path: PathBuf,
    snooze_remaining: u32,
    player: Arc<dyn SoundPlayer>,
    action_rx: mpsc::UnboundedReceiver<NotifierAction>,
    event_tx: mpsc::UnboundedSender<SchedulerEvent>,
}

impl Notifier {
    /// Build a session for one firing. Returns the notifier and the
    /// sender the scheduler uses to route user actions into it.
    #[must_use]
    pub fn new(
        task_id: TaskId,
        alarm_name: String,
        sound_path: PathBuf,
        snooze_remaining: u32,
        player: Arc<dyn SoundPlayer>,
        event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> (Self, mpsc::UnboundedSender<NotifierAction>) {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let notifier = Self {
            task_id,
            alarm_name,
            sound_path,
            snooze_remaining,
            player,
            action_rx,
            event_tx,
        };
        (notifier, action_tx)
    }

    /// Run the session to completion and return its outcome.
    ///
    /// Sound problems never abort the session: the notifier still rings
    /// (silently) so the user can dismiss it, with the failure carried
    /// in the `AlarmRinging` event.
    pub async fn run(mut self) -> NotifierOutcome {
        let mut sound: Option<ActiveSound> = None;
        let mut sound_error: Option<String> = None;

        match self.player.start(&self.sound_path) {
            Ok(active) => sound = Some(active),
            Err(e) => {
                warn!("alarm '{}': {e}", self.alarm_name);
                sound_error = Some(e.to_string());
            }
        }
        if let Some(active) = sound.as_mut() {
            if let Err(e) = active.ready().await {
                warn!("alarm '{}': {e}", self.alarm_name);
                sound_error = Some(e.to_string());
                sound = None;
            }
        }

        // Visible from here; the auto-stop bound is measured from show
        // time, not from sound start.
        let snooze_available = self.snooze_remaining > 0;
        let _ = self.event_tx.send(SchedulerEvent::AlarmRinging {
            id: self.task_id,
            alarm_name: self.alarm_name.clone(),
            snooze_available,
            sound_error,
        });

        let outcome = tokio::select! {
            action = self.action_rx.recv() => match action {
                Some(NotifierAction::Snooze) if snooze_available => NotifierOutcome::Snoozed,
                Some(NotifierAction::Snooze) => NotifierOutcome::Stopped,
                Some(NotifierAction::Stop | NotifierAction::WindowClosed) | None => {
                    NotifierOutcome::Stopped
                }
            },
            () = tokio::time::sleep(AUTO_STOP) => {
                debug!("alarm '{}' timed out after {}s", self.alarm_name, AUTO_STOP.as_secs());
                if snooze_available {
                    NotifierOutcome::Snoozed
                } else {
                    NotifierOutcome::Stopped
                }
            }
        };

        if let Some(active) = sound.take() {
            active.stop();
        }
        let _ = self.event_tx.send(SchedulerEvent::AlarmClosed {
            id: self.task_id,
            outcome,
        });
        outcome
    }
}
