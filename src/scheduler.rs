//! In-process task scheduler.
//!
//! One event-loop task owns all scheduler state: the durable store, the
//! armed-wakeup map, and the set of ringing notifiers. Every mutation —
//! submissions, removals, firings, notifier closes — arrives as a
//! command on a single channel, so handler invocations never interleave.
//! Long-running side effects (process exit waits, default-app opens,
//! sound playback) run off the loop and post back through the same
//! channel or the outbound event channel.

use crate::actions::{ActionRunner, SystemActions};
use crate::alarm::notifier::{Notifier, NotifierAction, NotifierOutcome};
use crate::alarm::sound::{CpalSoundPlayer, SoundPlayer};
use crate::alarm::{next_occurrence, snooze_followup};
use crate::alarm::spec::WallTime;
use crate::error::{Result, SchedulerError};
use crate::store::{LoadOutcome, TaskStore};
use crate::task::{ActionPayload, NewTask, TaskId, TaskRecord};
use chrono::{Local, NaiveDateTime, Timelike};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Outbound events for the embedding GUI. Best-effort: a disconnected
/// receiver never stalls the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// Raise a system notification.
    Notification {
        /// Notification title.
        title: String,
        /// Notification body.
        message: String,
    },
    /// A firing-time side effect failed. The task was disposed anyway.
    ActionFailed {
        /// Task that fired.
        id: TaskId,
        /// Human-readable failure.
        message: String,
    },
    /// An alarm notifier became visible (and audible, unless
    /// `sound_error` is set).
    AlarmRinging {
        /// Firing task.
        id: TaskId,
        /// Label for the notifier window.
        alarm_name: String,
        /// Whether the Snooze button does anything.
        snooze_available: bool,
        /// Why there is no sound, when there is none.
        sound_error: Option<String>,
    },
    /// An alarm notifier closed.
    AlarmClosed {
        /// Task that was ringing.
        id: TaskId,
        /// How the session ended.
        outcome: NotifierOutcome,
    },
    /// The store dropped or failed to persist something; shown to the
    /// user as a warning.
    StoreWarning {
        /// Human-readable description.
        message: String,
    },
}

enum Command {
    Add {
        task: NewTask,
        reply: oneshot::Sender<Result<TaskRecord>>,
    },
    Remove {
        id: TaskId,
        reply: oneshot::Sender<Result<bool>>,
    },
    List {
        reply: oneshot::Sender<Vec<TaskRecord>>,
    },
    NotifierAction {
        id: TaskId,
        action: NotifierAction,
    },
    Fire {
        id: TaskId,
    },
    NotifierClosed {
        id: TaskId,
        outcome: NotifierOutcome,
    },
    Shutdown,
}

/// Cloneable front door to a running [`Scheduler`].
#[derive(Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Validate, persist, and arm a new task.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidInput`] per the validation
    /// contract, or [`SchedulerError::Channel`] when the scheduler has
    /// shut down.
    pub async fn add_task(&self, task: NewTask) -> Result<TaskRecord> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Add { task, reply })?;
        rx.await.map_err(|_| closed())?
    }

    /// Cancel and remove a task. Returns `false` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] when the store rewrite
    /// fails, or [`SchedulerError::Channel`] after shutdown.
    pub async fn remove_task(&self, id: TaskId) -> Result<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Remove { id, reply })?;
        rx.await.map_err(|_| closed())?
    }

    /// Snapshot of the active tasks, sorted by run time.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Channel`] after shutdown.
    pub async fn list_tasks(&self) -> Result<Vec<TaskRecord>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::List { reply })?;
        rx.await.map_err(|_| closed())
    }

    /// Route a user action into the ringing notifier for `id`. Ignored
    /// when nothing is ringing under that id.
    pub fn notifier_action(&self, id: TaskId, action: NotifierAction) {
        let _ = self.cmd_tx.send(Command::NotifierAction { id, action });
    }

    /// Stop the scheduler: cancel all pending wakeups and release any
    /// ringing notifiers. Persisted state is not modified.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx.send(cmd).map_err(|_| closed())
    }
}

fn closed() -> SchedulerError {
    SchedulerError::Channel("scheduler is not running".to_owned())
}

/// Source of the current wall-clock time. Defaults to the local system
/// clock; replaceable for tests.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The scheduler event loop and its state.
pub struct Scheduler {
    store: TaskStore,
    wakeups: HashMap<TaskId, tokio::task::AbortHandle>,
    ringing: HashMap<TaskId, mpsc::UnboundedSender<NotifierAction>>,
    player: Arc<dyn SoundPlayer>,
    runner: Arc<dyn ActionRunner>,
    clock: Clock,
    event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl Scheduler {
    /// Open the store at `path` and build a scheduler over it.
    ///
    /// Records that expired while the process was down are discarded
    /// here (never fired late); anything dropped is reported through a
    /// [`SchedulerEvent::StoreWarning`].
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] when the store cannot be
    /// read or rewritten.
    pub fn open(
        path: PathBuf,
        event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Result<(Self, SchedulerHandle)> {
        let (store, outcome) = TaskStore::open(path, now_local())?;
        Ok(Self::with_store(store, outcome, event_tx))
    }

    /// [`Scheduler::open`] at the default per-user store path.
    ///
    /// # Errors
    ///
    /// Same failure model as [`Scheduler::open`].
    pub fn open_default(
        event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> Result<(Self, SchedulerHandle)> {
        Self::open(crate::hub_dirs::tasks_file(), event_tx)
    }

    fn with_store(
        store: TaskStore,
        outcome: LoadOutcome,
        event_tx: mpsc::UnboundedSender<SchedulerEvent>,
    ) -> (Self, SchedulerHandle) {
        if !outcome.clean() {
            let message = if outcome.corrupt {
                "task list was unreadable and has been reset".to_owned()
            } else {
                format!(
                    "dropped {} expired and {} unreadable task(s) from the task list",
                    outcome.discarded_past, outcome.skipped_malformed
                )
            };
            warn!("{message}");
            let _ = event_tx.send(SchedulerEvent::StoreWarning { message });
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let handle = SchedulerHandle {
            cmd_tx: cmd_tx.clone(),
        };
        let scheduler = Self {
            store,
            wakeups: HashMap::new(),
            ringing: HashMap::new(),
            player: Arc::new(CpalSoundPlayer),
            runner: Arc::new(SystemActions),
            clock: Arc::new(now_local),
            event_tx,
            cmd_tx,
            cmd_rx,
        };
        (scheduler, handle)
    }

    /// Replace the sound backend. For tests and embedders with their own
    /// audio path.
    #[must_use]
    pub fn with_sound_player(mut self, player: Arc<dyn SoundPlayer>) -> Self {
        self.player = player;
        self
    }

    /// Replace the OS side-effect backend.
    #[must_use]
    pub fn with_action_runner(mut self, runner: Arc<dyn ActionRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the wall-clock source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    /// Arm every loaded task and start the event loop.
    pub fn run(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let loaded: Vec<(TaskId, NaiveDateTime)> = self
                .store
                .records()
                .iter()
                .map(|r| (r.id, r.run_time))
                .collect();
            info!("scheduler started with {} task(s)", loaded.len());
            for (id, run_time) in loaded {
                self.arm(id, run_time);
            }

            while let Some(cmd) = self.cmd_rx.recv().await {
                if !self.handle_command(cmd) {
                    break;
                }
            }
            info!("scheduler stopped");
        })
    }

    /// Process one command. Returns `false` on shutdown.
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Add { task, reply } => {
                let _ = reply.send(self.submit(task));
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(id));
            }
            Command::List { reply } => {
                let mut tasks: Vec<TaskRecord> = self.store.records().to_vec();
                tasks.sort_by_key(|r| r.run_time);
                let _ = reply.send(tasks);
            }
            Command::NotifierAction { id, action } => {
                if let Some(tx) = self.ringing.get(&id) {
                    let _ = tx.send(action);
                } else {
                    debug!("notifier action {action:?} for {id} with nothing ringing");
                }
            }
            Command::Fire { id } => self.fire(id),
            Command::NotifierClosed { id, outcome } => self.notifier_closed(id, outcome),
            Command::Shutdown => {
                for (_, wakeup) in self.wakeups.drain() {
                    wakeup.abort();
                }
                // Dropping the action senders closes any ringing
                // notifiers as Stop, which releases their playback.
                self.ringing.clear();
                return false;
            }
        }
        true
    }

    /// Validate, persist, and arm one submission. Shared by the public
    /// entry point and the snooze-chain path.
    fn submit(&mut self, task: NewTask) -> Result<TaskRecord> {
        let mut record = task.into_record(self.now())?;
        if let ActionPayload::Alarm(spec) = &mut record.action_payload {
            // current_run is denormalized; keep it in lockstep.
            spec.current_run = WallTime::from_naive(record.run_time);
        }

        if let Err(e) = self.store.add(record.clone()) {
            // In-memory state stays authoritative; the next successful
            // save persists it.
            error!("cannot persist new task {}: {e}", record.id);
            self.store_warning(format!("task \"{}\" could not be saved: {e}", record.name));
        }
        self.arm(record.id, record.run_time);
        debug!("task {} armed for {}", record.id, record.run_time);
        Ok(record)
    }

    fn remove(&mut self, id: TaskId) -> Result<bool> {
        if let Some(wakeup) = self.wakeups.remove(&id) {
            wakeup.abort();
        }
        // An in-flight notifier is not aborted; its outcome is discarded
        // when it closes and finds the record gone.
        self.store.remove(&id)
    }

    /// Arm a single one-shot wakeup for `id`.
    fn arm(&mut self, id: TaskId, run_time: NaiveDateTime) {
        let delay = (run_time - self.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let cmd_tx = self.cmd_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = cmd_tx.send(Command::Fire { id });
        });
        if let Some(stale) = self.wakeups.insert(id, handle.abort_handle()) {
            // At most one armed wakeup per record.
            stale.abort();
        }
    }

    /// One firing: route to the matching handler, then dispose or hand
    /// off to the alarm engine.
    fn fire(&mut self, id: TaskId) {
        self.wakeups.remove(&id);
        let Some(record) = self.store.get(&id).cloned() else {
            debug!("wakeup for {id} after removal, ignoring");
            return;
        };
        info!("firing task {} \"{}\" ({})", record.id, record.name, record.kind);

        match record.action_payload {
            ActionPayload::Executable { path } => {
                self.run_simple(id, move |runner| runner.run_executable(&path));
                self.dispose(id);
            }
            ActionPayload::Website { url } => {
                self.run_simple(id, move |runner| runner.open_target(&url));
                self.dispose(id);
            }
            ActionPayload::OpenMedia { path } => {
                self.run_simple(id, move |runner| runner.open_target(&path));
                self.dispose(id);
            }
            ActionPayload::Notification { title, message } => {
                let _ = self
                    .event_tx
                    .send(SchedulerEvent::Notification { title, message });
                self.dispose(id);
            }
            ActionPayload::Alarm(spec) => {
                let (notifier, action_tx) = Notifier::new(
                    id,
                    spec.alarm_name.clone(),
                    PathBuf::from(&spec.sound.path),
                    spec.snooze.total_remaining,
                    Arc::clone(&self.player),
                    self.event_tx.clone(),
                );
                self.ringing.insert(id, action_tx);
                let cmd_tx = self.cmd_tx.clone();
                tokio::spawn(async move {
                    let outcome = notifier.run().await;
                    let _ = cmd_tx.send(Command::NotifierClosed { id, outcome });
                });
            }
        }
    }

    /// Launch a blocking side effect off the loop; report failure as a
    /// user message. A failed firing is still a completed firing.
    fn run_simple(
        &self,
        id: TaskId,
        effect: impl FnOnce(&dyn ActionRunner) -> Result<()> + Send + 'static,
    ) {
        let runner = Arc::clone(&self.runner);
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || effect(runner.as_ref())).await;
            let failure = match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(format!("side effect panicked: {e}")),
            };
            if let Some(message) = failure {
                warn!("task {id} side effect failed: {message}");
                let _ = event_tx.send(SchedulerEvent::ActionFailed { id, message });
            }
        });
    }

    /// Remove a fired task from the store.
    fn dispose(&mut self, id: TaskId) {
        if let Err(e) = self.store.remove(&id) {
            error!("cannot remove fired task {id}: {e}");
            self.store_warning(format!("fired task could not be removed from disk: {e}"));
        }
    }

    /// Alarm engine continuation: snooze follow-up, recurrence re-arm,
    /// or disposal, after the notifier for `id` closed.
    fn notifier_closed(&mut self, id: TaskId, outcome: NotifierOutcome) {
        self.ringing.remove(&id);
        let Some(record) = self.store.get(&id).cloned() else {
            // Removed while ringing; explicit user removal wins.
            debug!("notifier for {id} closed after removal, outcome discarded");
            return;
        };
        let ActionPayload::Alarm(spec) = &record.action_payload else {
            error!("notifier closed for non-alarm task {id}");
            return;
        };
        let now = self.now();

        if outcome == NotifierOutcome::Snoozed {
            if let Some((child, run_time)) = snooze_followup(spec, now) {
                let name = child.alarm_name.clone();
                let task = NewTask::new(name.clone(), run_time, ActionPayload::Alarm(child));
                match self.submit(task) {
                    Ok(child_record) => {
                        info!(
                            "snooze follow-up \"{name}\" armed for {}",
                            child_record.run_time
                        );
                    }
                    Err(e) => {
                        warn!("cannot schedule snooze follow-up \"{name}\": {e}");
                        let _ = self.event_tx.send(SchedulerEvent::ActionFailed {
                            id,
                            message: format!("snooze could not be scheduled: {e}"),
                        });
                    }
                }
            }
        }

        // The recurring parent re-arms regardless of any snooze child.
        if spec.schedule.is_recurring() {
            match next_occurrence(spec, now) {
                Some(next) => self.rearm_recurring(record, next),
                None => self.dispose(id),
            }
        } else {
            self.dispose(id);
        }
    }

    fn rearm_recurring(&mut self, mut record: TaskRecord, next: NaiveDateTime) {
        record.run_time = next;
        if let ActionPayload::Alarm(spec) = &mut record.action_payload {
            spec.current_run = WallTime::from_naive(next);
        }
        let id = record.id;
        if let Err(e) = self.store.update(record) {
            error!("cannot re-arm recurring task {id}: {e}");
            self.store_warning(format!("recurring alarm could not be saved: {e}"));
        }
        self.arm(id, next);
        debug!("recurring task {id} re-armed for {next}");
    }

    fn store_warning(&self, message: String) {
        let _ = self
            .event_tx
            .send(SchedulerEvent::StoreWarning { message });
    }
}

/// Local wall-clock now, truncated to whole seconds so persisted
/// run times and snooze arithmetic stay on second boundaries.
fn now_local() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::alarm::spec::{AlarmSpec, ScheduleKind, ScheduleSpec, SnoozePolicy, SoundRef};
    use crate::test_utils::{RecordedAction, StubActionRunner, StubSoundPlayer};
    use chrono::Duration;

    struct Harness {
        handle: SchedulerHandle,
        event_rx: mpsc::UnboundedReceiver<SchedulerEvent>,
        runner: StubActionRunner,
        player: StubSoundPlayer,
        base: NaiveDateTime,
        _dir: tempfile::TempDir,
    }

    fn start() -> Harness {
        start_with(StubSoundPlayer::ready(), StubActionRunner::ok())
    }

    fn start_with(player: StubSoundPlayer, runner: StubActionRunner) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (scheduler, handle) =
            Scheduler::open(dir.path().join("scheduled_tasks.json"), event_tx).unwrap();
        // Under a paused runtime chrono stands still while tokio timers
        // jump ahead, so the scheduler reads its clock off the virtual
        // instant instead.
        let base = now_local();
        let started = tokio::time::Instant::now();
        let clock: Clock = Arc::new(move || {
            base + Duration::from_std(started.elapsed()).unwrap_or_else(|_| Duration::zero())
        });
        let scheduler = scheduler
            .with_sound_player(Arc::new(player.clone()))
            .with_action_runner(Arc::new(runner.clone()))
            .with_clock(clock);
        scheduler.run();
        Harness {
            handle,
            event_rx,
            runner,
            player,
            base,
            _dir: dir,
        }
    }

    impl Harness {
        fn website_in(&self, secs: i64) -> NewTask {
            NewTask::new(
                "N",
                self.base + Duration::seconds(secs),
                ActionPayload::Website {
                    url: "https://example.org".to_owned(),
                },
            )
        }

        fn alarm_in(&self, secs: i64, kind: ScheduleKind, snooze: u32, sound_path: &str) -> NewTask {
            let run_time = self.base + Duration::seconds(secs);
            let spec = AlarmSpec {
                alarm_name: "Wake up".to_owned(),
                origin: WallTime::from_naive(run_time),
                schedule: ScheduleSpec {
                    kind,
                    days: Vec::new(),
                },
                sound: SoundRef {
                    path: sound_path.to_owned(),
                    is_custom: false,
                    display_name: "Beep".to_owned(),
                },
                snooze: SnoozePolicy {
                    total_times: snooze,
                    total_remaining: snooze,
                    interval_minutes: 5,
                },
                current_run: WallTime::from_naive(run_time),
            };
            NewTask::new("Wake up", run_time, ActionPayload::Alarm(spec))
        }
    }

    fn touch_sound(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("beep.wav");
        std::fs::write(&path, b"riff").unwrap();
        path.to_string_lossy().into_owned()
    }

    // Polling with short sleeps (rather than awaiting with a deadline)
    // keeps paused-clock auto-advance and spawn_blocking work from
    // racing each other.
    async fn wait_for_empty_list(handle: &SchedulerHandle) {
        for _ in 0..600 {
            if handle.list_tasks().await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        panic!("task list never drained");
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SchedulerEvent>) -> SchedulerEvent {
        for _ in 0..600 {
            if let Ok(event) = rx.try_recv() {
                return event;
            }
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        panic!("no scheduler event arrived");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_name_is_rejected() {
        let h = start();
        let mut task = h.website_in(10);
        task.name = String::new();
        let err = h.handle.add_task(task).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn past_run_time_is_rejected() {
        let h = start();
        let err = h.handle.add_task(h.website_in(-1)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_days_without_days_is_rejected() {
        let h = start();
        let dir = tempfile::tempdir().unwrap();
        let task = h.alarm_in(60, ScheduleKind::CustomDays, 0, &touch_sound(&dir));
        let err = h.handle.add_task(task).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_sound_file_is_rejected() {
        let h = start();
        let task = h.alarm_in(60, ScheduleKind::Once, 0, "/nonexistent/beep.wav");
        let err = h.handle.add_task(task).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn website_task_fires_once_and_is_disposed() {
        let mut h = start();
        h.handle.add_task(h.website_in(10)).await.unwrap();
        assert_eq!(h.handle.list_tasks().await.unwrap().len(), 1);

        wait_for_empty_list(&h.handle).await;
        // Give the side-effect worker a chance to run.
        for _ in 0..50 {
            if !h.runner.calls().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(
            h.runner.calls(),
            vec![RecordedAction::Open("https://example.org".to_owned())]
        );
        assert!(h.handle.list_tasks().await.unwrap().is_empty());
        assert!(h.event_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_side_effect_still_disposes_and_reports() {
        let mut h = start_with(StubSoundPlayer::ready(), StubActionRunner::failing());
        let record = h.handle.add_task(h.website_in(5)).await.unwrap();

        wait_for_empty_list(&h.handle).await;
        match next_event(&mut h.event_rx).await {
            SchedulerEvent::ActionFailed { id, .. } => assert_eq!(id, record.id),
            other => panic!("expected ActionFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn notification_task_emits_event() {
        let mut h = start();
        let task = NewTask::new(
            "N",
            now_local() + Duration::seconds(5),
            ActionPayload::Notification {
                title: "Reminder".to_owned(),
                message: "Stand up".to_owned(),
            },
        );
        h.handle.add_task(task).await.unwrap();

        match next_event(&mut h.event_rx).await {
            SchedulerEvent::Notification { title, message } => {
                assert_eq!(title, "Reminder");
                assert_eq!(message, "Stand up");
            }
            other => panic!("expected Notification, got {other:?}"),
        }
        wait_for_empty_list(&h.handle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn remove_task_cancels_before_firing() {
        let h = start();
        let record = h.handle.add_task(h.website_in(3600)).await.unwrap();
        assert!(h.handle.remove_task(record.id).await.unwrap());
        assert!(h.handle.list_tasks().await.unwrap().is_empty());
        assert!(!h.handle.remove_task(record.id).await.unwrap());

        // Long after the original run time, nothing fired.
        tokio::time::sleep(std::time::Duration::from_secs(7200)).await;
        assert!(h.runner.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn once_alarm_stop_disposes_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = start();
        let record = h
            .handle
            .add_task(h.alarm_in(5, ScheduleKind::Once, 2, &touch_sound(&dir)))
            .await
            .unwrap();

        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmRinging {
                id,
                snooze_available,
                sound_error,
                ..
            } => {
                assert_eq!(id, record.id);
                assert!(snooze_available);
                assert!(sound_error.is_none());
            }
            other => panic!("expected AlarmRinging, got {other:?}"),
        }

        h.handle.notifier_action(record.id, NotifierAction::Stop);
        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmClosed { outcome, .. } => {
                assert_eq!(outcome, NotifierOutcome::Stopped);
            }
            other => panic!("expected AlarmClosed, got {other:?}"),
        }

        wait_for_empty_list(&h.handle).await;
        assert_eq!(h.player.starts(), 1);
        assert_eq!(h.player.stopped(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn snoozed_alarm_spawns_once_child_and_rearms_daily_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = start();
        let record = h
            .handle
            .add_task(h.alarm_in(5, ScheduleKind::Daily, 2, &touch_sound(&dir)))
            .await
            .unwrap();

        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmRinging { .. } => {}
            other => panic!("expected AlarmRinging, got {other:?}"),
        }
        h.handle.notifier_action(record.id, NotifierAction::Snooze);
        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmClosed { outcome, .. } => {
                assert_eq!(outcome, NotifierOutcome::Snoozed);
            }
            other => panic!("expected AlarmClosed, got {other:?}"),
        }

        // Wait until both the child and the re-armed parent are listed.
        let mut tasks = Vec::new();
        for _ in 0..200 {
            tasks = h.handle.list_tasks().await.unwrap();
            if tasks.len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(tasks.len(), 2, "snooze child plus re-armed parent");

        let child = tasks
            .iter()
            .find(|t| t.name.contains("(Snooze 1)"))
            .expect("snooze child");
        let ActionPayload::Alarm(child_spec) = &child.action_payload else {
            panic!("child is an alarm");
        };
        assert_eq!(child_spec.schedule.kind, ScheduleKind::Once);
        assert_eq!(child_spec.snooze.total_remaining, 1);

        let parent = tasks.iter().find(|t| t.id == record.id).expect("parent");
        assert_eq!(parent.run_time, record.run_time + Duration::days(1));
        let ActionPayload::Alarm(parent_spec) = &parent.action_payload else {
            panic!("parent is an alarm");
        };
        assert_eq!(parent_spec.current_run.to_naive(), Some(parent.run_time));
    }

    #[tokio::test(start_paused = true)]
    async fn alarm_timeout_without_budget_just_disposes() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = start();
        h.handle
            .add_task(h.alarm_in(5, ScheduleKind::Once, 0, &touch_sound(&dir)))
            .await
            .unwrap();

        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmRinging { snooze_available, .. } => assert!(!snooze_available),
            other => panic!("expected AlarmRinging, got {other:?}"),
        }
        // No user action: the 120 s auto-stop closes it.
        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmClosed { outcome, .. } => {
                assert_eq!(outcome, NotifierOutcome::Stopped);
            }
            other => panic!("expected AlarmClosed, got {other:?}"),
        }
        wait_for_empty_list(&h.handle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn sound_deleted_before_firing_still_rings() {
        let dir = tempfile::tempdir().unwrap();
        let sound = touch_sound(&dir);
        let mut h = start_with(StubSoundPlayer::failing_at_start(), StubActionRunner::ok());
        let record = h
            .handle
            .add_task(h.alarm_in(5, ScheduleKind::Once, 0, &sound))
            .await
            .unwrap();

        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmRinging { sound_error, .. } => {
                assert!(sound_error.is_some());
            }
            other => panic!("expected AlarmRinging, got {other:?}"),
        }
        h.handle.notifier_action(record.id, NotifierAction::Stop);
        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmClosed { .. } => {}
            other => panic!("expected AlarmClosed, got {other:?}"),
        }
        wait_for_empty_list(&h.handle).await;
    }

    #[tokio::test(start_paused = true)]
    async fn removal_during_ring_discards_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = start();
        let record = h
            .handle
            .add_task(h.alarm_in(5, ScheduleKind::Daily, 2, &touch_sound(&dir)))
            .await
            .unwrap();

        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmRinging { .. } => {}
            other => panic!("expected AlarmRinging, got {other:?}"),
        }
        assert!(h.handle.remove_task(record.id).await.unwrap());
        h.handle.notifier_action(record.id, NotifierAction::Snooze);
        match next_event(&mut h.event_rx).await {
            SchedulerEvent::AlarmClosed { .. } => {}
            other => panic!("expected AlarmClosed, got {other:?}"),
        }

        // Neither a snooze child nor a re-armed parent appears.
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(h.handle.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_wakeups_and_keeps_store() {
        let h = start();
        h.handle.add_task(h.website_in(3600)).await.unwrap();
        let listed = h.handle.list_tasks().await.unwrap();
        assert_eq!(listed.len(), 1);

        h.handle.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let err = h.handle.list_tasks().await.unwrap_err();
        assert!(matches!(err, SchedulerError::Channel(_)));
        assert!(h.runner.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn corrupt_store_warns_and_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduled_tasks.json");
        std::fs::write(&path, b"{broken").unwrap();

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (scheduler, handle) = Scheduler::open(path, event_tx).unwrap();
        scheduler.run();

        match event_rx.try_recv() {
            Ok(SchedulerEvent::StoreWarning { message }) => {
                assert!(message.contains("unreadable"));
            }
            other => panic!("expected StoreWarning, got {other:?}"),
        }
        assert!(handle.list_tasks().await.unwrap().is_empty());
    }
}
