//! Shared test utilities used by unit and integration tests.
//!
//! Provides stub [`SoundPlayer`] and [`ActionRunner`] implementations so
//! scheduler tests never touch a real audio device, browser, or process.

#![allow(clippy::expect_used)]

use crate::actions::ActionRunner;
use crate::alarm::sound::{ActiveSound, SoundPlayer};
use crate::error::{Result, SchedulerError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// How the stub behaves when the notifier starts playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StubMode {
    /// Playback starts and reports ready.
    Ready,
    /// `start` itself fails, as for a deleted sound file.
    FailAtStart,
    /// `start` succeeds but the worker reports a playback failure.
    FailAtReady,
}

#[derive(Debug, Default)]
struct StubState {
    starts: Vec<PathBuf>,
    stop_probes: Vec<crossbeam_channel::Receiver<()>>,
}

/// Recording stub for [`SoundPlayer`].
#[derive(Clone)]
pub struct StubSoundPlayer {
    mode: StubMode,
    state: Arc<Mutex<StubState>>,
}

impl StubSoundPlayer {
    /// Stub whose playback always starts and becomes ready.
    #[must_use]
    pub fn ready() -> Self {
        Self::with_mode(StubMode::Ready)
    }

    /// Stub that fails synchronously, like a missing sound file.
    #[must_use]
    pub fn failing_at_start() -> Self {
        Self::with_mode(StubMode::FailAtStart)
    }

    /// Stub that fails asynchronously, like a dead output device.
    #[must_use]
    pub fn failing_at_ready() -> Self {
        Self::with_mode(StubMode::FailAtReady)
    }

    fn with_mode(mode: StubMode) -> Self {
        Self {
            mode,
            state: Arc::new(Mutex::new(StubState::default())),
        }
    }

    /// Number of playback sessions started.
    #[must_use]
    pub fn starts(&self) -> usize {
        self.state.lock().expect("stub state lock").starts.len()
    }

    /// Number of sessions whose stop signal was delivered (i.e. the
    /// handle was stopped or dropped).
    #[must_use]
    pub fn stopped(&self) -> usize {
        self.state
            .lock()
            .expect("stub state lock")
            .stop_probes
            .iter()
            .filter(|probe| probe.is_full())
            .count()
    }
}

/// One recorded side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedAction {
    /// `run_executable` was invoked with this path.
    Executable(String),
    /// `open_target` was invoked with this URL or path.
    Open(String),
}

/// Recording stub for [`ActionRunner`].
#[derive(Clone, Default)]
pub struct StubActionRunner {
    fail: bool,
    calls: Arc<Mutex<Vec<RecordedAction>>>,
}

impl StubActionRunner {
    /// Stub whose side effects always succeed.
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// Stub whose side effects always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: Arc::default(),
        }
    }

    /// Everything invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedAction> {
        self.calls.lock().expect("stub calls lock").clone()
    }

    fn record(&self, action: RecordedAction) -> Result<()> {
        self.calls.lock().expect("stub calls lock").push(action);
        if self.fail {
            return Err(SchedulerError::Action("stub action failed".to_owned()));
        }
        Ok(())
    }
}

impl ActionRunner for StubActionRunner {
    fn run_executable(&self, path: &str) -> Result<()> {
        self.record(RecordedAction::Executable(path.to_owned()))
    }

    fn open_target(&self, target: &str) -> Result<()> {
        self.record(RecordedAction::Open(target.to_owned()))
    }
}

impl SoundPlayer for StubSoundPlayer {
    fn start(&self, path: &Path) -> Result<ActiveSound> {
        if self.mode == StubMode::FailAtStart {
            return Err(SchedulerError::SoundUnavailable(format!(
                "stub: no sound at {}",
                path.display()
            )));
        }

        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let _ = ready_tx.send(match self.mode {
            StubMode::Ready => Ok(()),
            _ => Err("stub: playback failed".to_owned()),
        });

        let mut state = self.state.lock().expect("stub state lock");
        state.starts.push(path.to_path_buf());
        state.stop_probes.push(stop_rx);

        Ok(ActiveSound::new(ready_rx, stop_tx))
    }
}
