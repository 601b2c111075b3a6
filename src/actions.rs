//! Simple action handlers: process spawn and default-application open.
//!
//! These are the terminal, non-alarm side effects. Each is invoked
//! exactly once per firing; failures surface as
//! [`SchedulerError::Action`] and never keep the fired task alive.

use crate::error::{Result, SchedulerError};
use std::process::{Child, Command, Stdio};

/// Seam between the scheduler and OS side effects. The production
/// implementation is [`SystemActions`]; tests substitute a recorder.
///
/// Methods may block (waiting on an exit status); the scheduler invokes
/// them off the event loop.
pub trait ActionRunner: Send + Sync + 'static {
    /// Run the executable at `path` with no arguments and report its
    /// exit.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Action`] when the process cannot start
    /// or exits non-zero.
    fn run_executable(&self, path: &str) -> Result<()>;

    /// Open a URL or file path with the platform default application.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Action`] when the opener cannot be
    /// spawned or reports failure.
    fn open_target(&self, target: &str) -> Result<()>;
}

/// [`ActionRunner`] backed by real OS processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemActions;

impl ActionRunner for SystemActions {
    fn run_executable(&self, path: &str) -> Result<()> {
        let mut child = spawn_executable(path)?;
        let status = child
            .wait()
            .map_err(|e| SchedulerError::Action(format!("cannot wait on {path}: {e}")))?;
        if !status.success() {
            return Err(SchedulerError::Action(format!(
                "{path} exited with {status}"
            )));
        }
        Ok(())
    }

    fn open_target(&self, target: &str) -> Result<()> {
        open_with_default_app(target)
    }
}

/// Spawn the executable at `path` with no arguments.
///
/// Returns the child so the caller can await its exit status off the
/// event loop and report a non-zero exit.
///
/// # Errors
///
/// Returns [`SchedulerError::Action`] when the process cannot be
/// started (missing file, not executable).
pub fn spawn_executable(path: &str) -> Result<Child> {
    Command::new(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| SchedulerError::Action(format!("cannot start {path}: {e}")))
}

/// Open `target` (a URL or file path) with the platform default
/// application.
///
/// # Errors
///
/// Returns [`SchedulerError::Action`] when the opener cannot be spawned
/// or reports failure.
pub fn open_with_default_app(target: &str) -> Result<()> {
    let status = opener_command(target)
        .status()
        .map_err(|e| SchedulerError::Action(format!("cannot open {target}: {e}")))?;
    if !status.success() {
        return Err(SchedulerError::Action(format!(
            "opening {target} exited with {status}"
        )));
    }
    Ok(())
}

#[cfg(target_os = "windows")]
fn opener_command(target: &str) -> Command {
    let mut cmd = Command::new("cmd");
    // An empty title argument keeps `start` from eating a quoted target.
    cmd.args(["/C", "start", "", target]);
    cmd
}

#[cfg(target_os = "macos")]
fn opener_command(target: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.arg(target);
    cmd
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener_command(target: &str) -> Command {
    let mut cmd = Command::new("xdg-open");
    cmd.arg(target);
    cmd
}
