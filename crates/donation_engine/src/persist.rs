use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use donation_core::{Amount, Decision, DonationRecord, TrackedSet};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use serde::Deserialize;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("state directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("state path {0:?} has no file name")]
    InvalidPath(PathBuf),
    #[error("failed to serialize tracked donations: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file in
/// the same directory, syncing it, then renaming it over the target. Readers
/// see either the old content or the new, never a truncated file.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Durable home of the tracked set.
pub trait StateStore {
    /// Prior state, or an empty set on a cold start. Never fails.
    fn load(&self) -> TrackedSet;
    /// Replaces the stored state with `tracked`.
    fn save(&self, tracked: &TrackedSet) -> Result<(), PersistError>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn load(&self) -> TrackedSet {
        (**self).load()
    }

    fn save(&self, tracked: &TrackedSet) -> Result<(), PersistError> {
        (**self).save(tracked)
    }
}

/// Accepts both the current object layout and the `[name, location, amount,
/// message]` arrays written by earlier deployments.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(DonationRecord),
    Legacy(String, String, f64, String),
}

impl StoredRecord {
    fn into_record(self) -> Option<DonationRecord> {
        match self {
            StoredRecord::Current(record) => Some(record),
            StoredRecord::Legacy(name, location, amount, message) => {
                Amount::from_dollars_f64(amount)
                    .map(|amount| DonationRecord::new(name, location, amount, message))
            }
        }
    }
}

/// Tracked set stored as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(content: &str) -> Result<TrackedSet, String> {
        let stored: Vec<StoredRecord> =
            serde_json::from_str(content).map_err(|err| err.to_string())?;
        let mut records = Vec::with_capacity(stored.len());
        for (idx, entry) in stored.into_iter().enumerate() {
            let record = entry
                .into_record()
                .ok_or_else(|| format!("entry {idx} has an invalid amount"))?;
            records.push(record);
        }
        Ok(TrackedSet::from_records(records))
    }

    /// Keeps an unreadable state file for inspection before the next save
    /// replaces it.
    fn quarantine(&self) {
        let mut aside = self.path.clone().into_os_string();
        aside.push(".corrupt");
        let aside = PathBuf::from(aside);
        match fs::copy(&self.path, &aside) {
            Ok(_) => engine_warn!("Copied unreadable state file to {:?}", aside),
            Err(err) => {
                engine_warn!("Could not copy unreadable state file to {:?}: {}", aside, err)
            }
        }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> TrackedSet {
        let content = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                engine_debug!("No tracked donations at {:?}, starting fresh", self.path);
                return TrackedSet::new();
            }
            Err(err) => {
                engine_warn!("Failed to read tracked donations from {:?}: {}", self.path, err);
                self.quarantine();
                return TrackedSet::new();
            }
        };

        match Self::parse(&content) {
            Ok(tracked) => {
                engine_info!(
                    "Loaded {} tracked donations from {:?}",
                    tracked.len(),
                    self.path
                );
                tracked
            }
            Err(err) => {
                engine_warn!("Failed to parse tracked donations from {:?}: {}", self.path, err);
                self.quarantine();
                TrackedSet::new()
            }
        }
    }

    fn save(&self, tracked: &TrackedSet) -> Result<(), PersistError> {
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::InvalidPath(self.path.clone()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let content = serde_json::to_string_pretty(tracked.records())?;
        AtomicFileWriter::new(dir).write(filename, &content)?;
        engine_debug!("Saved {} tracked donations", tracked.len());
        Ok(())
    }
}

/// How hard to try before a failed save becomes fatal.
#[derive(Debug, Clone, Copy)]
pub struct PersistPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for PersistPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// The tracked set together with its store.
///
/// Owned by the polling loop. Every mutation marks the state unsaved until
/// the next successful [`persist`](Self::persist); dropping it with unsaved
/// changes makes one last synchronous save attempt, so an early return or an
/// unwinding panic does not lose claimed records.
pub struct TrackedState<S: StateStore> {
    store: S,
    tracked: TrackedSet,
    policy: PersistPolicy,
    unsaved: bool,
}

impl<S: StateStore> TrackedState<S> {
    pub fn open(store: S, policy: PersistPolicy) -> Self {
        let tracked = store.load();
        Self {
            store,
            tracked,
            policy,
            unsaved: false,
        }
    }

    pub fn tracked(&self) -> &TrackedSet {
        &self.tracked
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Applies a planned decision in memory. Returns whether the set changed.
    pub fn apply(&mut self, decision: &Decision) -> bool {
        let changed = self.tracked.apply(decision);
        self.unsaved |= changed;
        changed
    }

    /// Saves the full set, retrying per the policy. The mutation stays in
    /// memory when every attempt fails.
    pub async fn persist(&mut self) -> Result<(), PersistError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.store.save(&self.tracked) {
                Ok(()) => {
                    self.unsaved = false;
                    return Ok(());
                }
                Err(err) if attempt < attempts => {
                    engine_warn!(
                        "Saving tracked donations failed (attempt {}/{}): {}",
                        attempt,
                        attempts,
                        err
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(err) => {
                    engine_error!(
                        "Saving tracked donations failed after {} attempts: {}",
                        attempts,
                        err
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Hands back the set without the drop-time save.
    pub fn into_tracked(mut self) -> TrackedSet {
        self.unsaved = false;
        std::mem::take(&mut self.tracked)
    }
}

impl<S: StateStore> Drop for TrackedState<S> {
    fn drop(&mut self) {
        if !self.unsaved {
            return;
        }
        match self.store.save(&self.tracked) {
            Ok(()) => engine_info!("Saved tracked donations on exit"),
            Err(err) => engine_error!("Failed to save tracked donations on exit: {}", err),
        }
    }
}
