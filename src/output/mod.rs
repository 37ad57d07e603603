//! Record persistence
//!
//! One JSON file per record under `<target>/<year>/<month>/<identifier>.json`,
//! plus the taxonomy snapshots at the root of the target directory.

use crate::identifier::IdentifierError;
use std::path::PathBuf;

pub mod json;
pub mod path;

pub use json::{JsonRecordSink, SavedRecord};
pub use path::RecordPathBuilder;

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// Record directory could not be created
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreateFailed {
        /// Directory path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Record file could not be written
    #[error("failed to write {path}: {source}")]
    FileWriteFailed {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Record identifier cannot be turned into a path
    #[error("cannot place record: {0}")]
    MalformedIdentifier(#[from] IdentifierError),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
