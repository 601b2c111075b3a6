//! Durable task store.
//!
//! Persists the task list as a single JSON document (a top-level array
//! of records) at the per-user config path. Writes are atomic: the
//! document is written to a sibling temp file, flushed, then renamed
//! over the destination, so a partial write is never observable.
//!
//! Loading is conservative: malformed records are logged and skipped,
//! past-dated records are discarded without catch-up, and a file that
//! cannot be parsed at all yields an empty list rather than an error.

use crate::error::{Result, SchedulerError};
use crate::task::{TaskId, TaskRecord};
use chrono::NaiveDateTime;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What happened while loading the store file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Records loaded and kept.
    pub loaded: usize,
    /// Future filter: records whose `run_time` had already passed.
    pub discarded_past: usize,
    /// Records that failed to parse or were internally inconsistent.
    pub skipped_malformed: usize,
    /// The whole file was unreadable as a JSON array.
    pub corrupt: bool,
}

impl LoadOutcome {
    /// `true` when nothing was dropped.
    #[must_use]
    pub fn clean(&self) -> bool {
        self.discarded_past == 0 && self.skipped_malformed == 0 && !self.corrupt
    }
}

/// On-disk task list. In-memory state is authoritative for the running
/// process; every mutation is followed by a save.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    records: Vec<TaskRecord>,
}

impl TaskStore {
    /// Open the store at `path`, filtering out records that expired
    /// before `now`. The file is rewritten when anything was dropped, so
    /// expired records are never revisited on the next launch.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] only for I/O failures;
    /// parse failures degrade to an empty list reported via
    /// [`LoadOutcome`].
    pub fn open(path: PathBuf, now: NaiveDateTime) -> Result<(Self, LoadOutcome)> {
        let (records, mut outcome) = load_records(&path, now)?;
        let store = Self { path, records };
        outcome.loaded = store.records.len();

        if !outcome.clean() {
            store.save()?;
        }
        Ok((store, outcome))
    }

    /// Open the store at the default per-user path
    /// (`hub_dirs::tasks_file()`).
    ///
    /// # Errors
    ///
    /// Same failure model as [`TaskStore::open`].
    pub fn open_default(now: NaiveDateTime) -> Result<(Self, LoadOutcome)> {
        Self::open(crate::hub_dirs::tasks_file(), now)
    }

    /// Current records, unordered.
    #[must_use]
    pub fn records(&self) -> &[TaskRecord] {
        &self.records
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&TaskRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    /// Append a record and persist.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] when the save fails; the
    /// in-memory list keeps the record regardless.
    pub fn add(&mut self, record: TaskRecord) -> Result<()> {
        self.records.push(record);
        self.save()
    }

    /// Remove a record by id and persist. Returns `false` when the id
    /// was not present (nothing is written in that case).
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] when the save fails.
    pub fn remove(&mut self, id: &TaskId) -> Result<bool> {
        let before = self.records.len();
        self.records.retain(|r| r.id != *id);
        if self.records.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Replace the record with the same id and persist. Used by the
    /// recurrence re-arm path.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] when the id is unknown or
    /// the save fails.
    pub fn update(&mut self, record: TaskRecord) -> Result<()> {
        let Some(existing) = self.records.iter_mut().find(|r| r.id == record.id) else {
            return Err(SchedulerError::Persistence(format!(
                "cannot update unknown task {}",
                record.id
            )));
        };
        *existing = record;
        self.save()
    }

    /// Atomically write the current list to disk.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Persistence`] for any I/O or
    /// serialization failure. In-memory state is not rolled back; the
    /// next successful save persists it.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                SchedulerError::Persistence(format!("cannot create store directory: {e}"))
            })?;
        }

        let json = serde_json::to_vec_pretty(&self.records)
            .map_err(|e| SchedulerError::Persistence(format!("cannot serialize tasks: {e}")))?;

        let tmp_path = self.path.with_extension("tmp");
        let mut tmp = std::fs::File::create(&tmp_path)
            .map_err(|e| SchedulerError::Persistence(format!("cannot write store temp file: {e}")))?;
        tmp.write_all(&json)
            .and_then(|()| tmp.sync_all())
            .map_err(|e| SchedulerError::Persistence(format!("cannot write store temp file: {e}")))?;
        drop(tmp);

        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| SchedulerError::Persistence(format!("cannot finalize store file: {e}")))?;

        debug!("saved {} tasks to {}", self.records.len(), self.path.display());
        Ok(())
    }
}

fn load_records(path: &PathBuf, now: NaiveDateTime) -> Result<(Vec<TaskRecord>, LoadOutcome)> {
    let mut outcome = LoadOutcome::default();

    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok((Vec::new(), outcome));
        }
        Err(e) => {
            return Err(SchedulerError::Persistence(format!(
                "cannot read task store: {e}"
            )));
        }
    };

    let values: Vec<serde_json::Value> = match serde_json::from_slice(&bytes) {
        Ok(values) => values,
        Err(e) => {
            warn!("task store at {} is corrupt, starting empty: {e}", path.display());
            outcome.corrupt = true;
            return Ok((Vec::new(), outcome));
        }
    };

    let mut records = Vec::with_capacity(values.len());
    for value in values {
        let record: TaskRecord = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping malformed task record: {e}");
                outcome.skipped_malformed += 1;
                continue;
            }
        };
        if !record.is_consistent() {
            warn!(
                "skipping task {} with mismatched type/payload",
                record.id
            );
            outcome.skipped_malformed += 1;
            continue;
        }
        if record.run_time <= now {
            debug!(
                "discarding expired task {} ({} <= {now})",
                record.id, record.run_time
            );
            outcome.discarded_past += 1;
            continue;
        }
        records.push(record);
    }

    Ok((records, outcome))
}
