//! JSON record sink
//!
//! Writes one pretty-printed JSON file per record. Files are overwritten
//! unconditionally; the same identifier always maps to the same path, which
//! makes re-harvesting a window idempotent.

use super::{OutputError, OutputResult, RecordPathBuilder};
use crate::identifier::CnnvdIdentifier;
use crate::Record;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Outcome of persisting one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecord {
    /// Identifier parsed from the record
    pub identifier: CnnvdIdentifier,
    /// File the record was written to
    pub path: PathBuf,
}

/// Persists records under the year/month layout
#[derive(Debug, Clone)]
pub struct JsonRecordSink {
    paths: RecordPathBuilder,
}

impl JsonRecordSink {
    /// Create a sink rooted at the target directory
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: RecordPathBuilder::new(root_dir.into()),
        }
    }

    /// Root directory
    pub fn root_dir(&self) -> &Path {
        self.paths.root_dir()
    }

    /// Write a record to `<root>/<year>/<month>/<identifier>.json`
    pub fn save(&self, record: &Record) -> OutputResult<SavedRecord> {
        let identifier = record.identifier()?;

        let dir = self.paths.directory(&identifier);
        std::fs::create_dir_all(&dir).map_err(|source| OutputError::DirectoryCreateFailed {
            path: dir.clone(),
            source,
        })?;

        let path = self.paths.build(&identifier);
        write_json(&path, record)?;
        debug!(file = %path.display(), "Saved record");

        Ok(SavedRecord { identifier, path })
    }

    /// Write a reference file (taxonomy snapshot) at the root directory
    pub fn write_snapshot<T: Serialize + ?Sized>(
        &self,
        file_name: &str,
        value: &T,
    ) -> OutputResult<PathBuf> {
        let root = self.root_dir();
        std::fs::create_dir_all(root).map_err(|source| OutputError::DirectoryCreateFailed {
            path: root.to_path_buf(),
            source,
        })?;

        let path = root.join(file_name);
        write_json(&path, value)?;
        debug!(file = %path.display(), "Saved snapshot");
        Ok(path)
    }
}

/// Serialize `value` as pretty JSON and write it to `path`
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> OutputResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    std::fs::write(path, bytes).map_err(|source| OutputError::FileWriteFailed {
        path: path.to_path_buf(),
        source,
    })
}
