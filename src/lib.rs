//! Access Hub task scheduling.
//!
//! A library for the timed-task subsystem of a desktop accessibility
//! toolbox: users schedule one-shot and recurring actions (launch a
//! program, open a website or media file, raise a notification, ring an
//! alarm) and the scheduler fires them at local wall-clock times,
//! persisting the pending set across restarts.
//!
//! The embedding GUI talks to a running [`Scheduler`] through a
//! [`SchedulerHandle`] and receives [`SchedulerEvent`]s on a channel:
//!
//! ```no_run
//! use access_hub::Scheduler;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> access_hub::Result<()> {
//! let (event_tx, _event_rx) = mpsc::unbounded_channel();
//! let (scheduler, _handle) = Scheduler::open_default(event_tx)?;
//! scheduler.run();
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod actions;
pub mod alarm;
pub mod error;
pub mod hub_dirs;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod task;

pub mod test_utils;

pub use error::{Result, SchedulerError};
pub use scheduler::{Scheduler, SchedulerEvent, SchedulerHandle};
pub use task::{ActionPayload, NewTask, TaskId, TaskKind, TaskRecord};
