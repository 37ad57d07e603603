//! Harvest checkpoint (`metadata.json`)
//!
//! Records the latest identifier seen, the running record count and the time
//! the next incremental run becomes due. Written with atomic replace so a crash
//! mid-write leaves the previous checkpoint intact.

use super::CheckpointError;
use crate::identifier::{CnnvdIdentifier, IdentifierError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Checkpoint file name at the root of the target directory
pub const CHECKPOINT_FILE: &str = "metadata.json";

/// Current checkpoint schema version
const SCHEMA_VERSION: &str = "1.0.0";

/// Maximum accepted checkpoint size (1 MB); anything larger is not ours
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 1024 * 1024;

/// Default delay before the next incremental run becomes due
pub const DEFAULT_RERUN_DELAY_HOURS: i64 = 24;

/// Durable harvest progress of one target directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    schema_version: String,
    latest_identifier: String,
    total_record_count: u64,
    next_scheduled_run: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Fresh checkpoint: sentinel identifier, zero count, due immediately
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            latest_identifier: CnnvdIdentifier::oldest().to_string(),
            total_record_count: 0,
            next_scheduled_run: now,
            updated_at: now,
        }
    }

    /// Raw latest identifier as stored
    pub fn latest_identifier(&self) -> &str {
        &self.latest_identifier
    }

    /// Parsed latest identifier (empty resolves to the oldest sentinel)
    pub fn latest(&self) -> Result<CnnvdIdentifier, IdentifierError> {
        CnnvdIdentifier::parse_or_oldest(&self.latest_identifier)
    }

    /// Records counted so far
    pub fn total_record_count(&self) -> u64 {
        self.total_record_count
    }

    /// When the next incremental run becomes due
    pub fn next_scheduled_run(&self) -> DateTime<Utc> {
        self.next_scheduled_run
    }

    /// Last time the checkpoint was written
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether `now` has passed the scheduled run time
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now > self.next_scheduled_run
    }
}

/// Reads and writes the checkpoint file of a target directory
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    rerun_delay: Duration,
}

impl CheckpointStore {
    /// Store for `<target_dir>/metadata.json`
    pub fn new(target_dir: impl AsRef<Path>) -> Self {
        Self {
            path: target_dir.as_ref().join(CHECKPOINT_FILE),
            rerun_delay: Duration::hours(DEFAULT_RERUN_DELAY_HOURS),
        }
    }

    /// Override the delay applied to `next_scheduled_run` on write
    pub fn with_rerun_delay(mut self, delay: Duration) -> Self {
        self.rerun_delay = delay;
        self
    }

    /// Checkpoint file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a checkpoint file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write a fresh checkpoint, discarding any prior state
    pub fn init(&self, now: DateTime<Utc>) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = Checkpoint::fresh(now);
        self.persist(&checkpoint)?;
        info!(path = %self.path.display(), "Initialized checkpoint");
        Ok(checkpoint)
    }

    /// Load the checkpoint
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::Unreadable`] if the file is missing, too large,
    /// not valid JSON, written by another schema version, or holds a malformed
    /// latest identifier.
    pub fn read(&self) -> Result<Checkpoint, CheckpointError> {
        debug!(path = %self.path.display(), "Loading checkpoint");

        let metadata = std::fs::metadata(&self.path).map_err(|e| self.unreadable(e))?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(self.unreadable(format!(
                "file is {} bytes (max: {MAX_CHECKPOINT_FILE_SIZE} bytes)",
                metadata.len()
            )));
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| self.unreadable(e))?;
        let checkpoint: Checkpoint = serde_json::from_str(&contents).map_err(|e| {
            warn!(error = %e, "Failed to deserialize checkpoint");
            self.unreadable(e)
        })?;

        if checkpoint.schema_version != SCHEMA_VERSION {
            return Err(self.unreadable(format!(
                "schema version mismatch: expected {SCHEMA_VERSION}, found {}",
                checkpoint.schema_version
            )));
        }

        checkpoint.latest().map_err(|e| self.unreadable(e))?;

        info!(
            latest = %checkpoint.latest_identifier,
            total = checkpoint.total_record_count,
            next_run = %checkpoint.next_scheduled_run,
            "Checkpoint loaded"
        );
        Ok(checkpoint)
    }

    /// Record the outcome of a run and schedule the next incremental run
    pub fn write(
        &self,
        total_record_count: u64,
        latest: &CnnvdIdentifier,
        now: DateTime<Utc>,
    ) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = Checkpoint {
            schema_version: SCHEMA_VERSION.to_string(),
            latest_identifier: latest.to_string(),
            total_record_count,
            next_scheduled_run: now + self.rerun_delay,
            updated_at: now,
        };
        self.persist(&checkpoint)?;

        info!(
            path = %self.path.display(),
            latest = %checkpoint.latest_identifier,
            total = checkpoint.total_record_count,
            next_run = %checkpoint.next_scheduled_run,
            "Checkpoint saved"
        );
        Ok(checkpoint)
    }

    /// Atomically replace the checkpoint file (temp file, fsync, rename)
    fn persist(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let parent_dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent_dir).map_err(|e| CheckpointError::IoError(e.to_string()))?;

        let json = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| CheckpointError::SerializationError(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&parent_dir)
            .map_err(|e| CheckpointError::IoError(format!("Failed to create temp file: {e}")))?;
        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| CheckpointError::IoError(format!("Failed to write temp file: {e}")))?;
        temp_file
            .flush()
            .map_err(|e| CheckpointError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CheckpointError::IoError(format!("Failed to sync temp file: {e}")))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| CheckpointError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Make the rename itself durable
        if let Ok(dir) = std::fs::File::open(&parent_dir) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn unreadable(&self, reason: impl ToString) -> CheckpointError {
        CheckpointError::Unreadable {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
