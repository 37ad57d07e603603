//! Run lock for a target directory
//!
//! Implements advisory file locking using fd-lock so that two harvests never
//! write into the same directory at once.

use super::CheckpointError;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Lock file name at the root of the target directory
pub const LOCK_FILE: &str = "metadata.lock";

/// Advisory lock on `<target>/metadata.lock`
pub struct HarvestLock {
    path: PathBuf,
    lock: RwLock<File>,
}

impl HarvestLock {
    /// Open (creating if needed) the lock file of a target directory
    pub fn open(target_dir: &Path) -> Result<Self, CheckpointError> {
        std::fs::create_dir_all(target_dir).map_err(|e| CheckpointError::IoError(e.to_string()))?;

        let path = target_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| CheckpointError::LockError(format!("Failed to open lock file: {e}")))?;

        Ok(Self {
            path,
            lock: RwLock::new(file),
        })
    }

    /// Try to take the exclusive lock without blocking
    ///
    /// The lock is held until the returned guard is dropped.
    pub fn try_exclusive(&mut self) -> Result<RwLockWriteGuard<'_, File>, CheckpointError> {
        let path = self.path.display().to_string();
        self.lock.try_write().map_err(|e| {
            CheckpointError::LockError(format!(
                "{path} is held by another harvest ({e})"
            ))
        })
    }
}
