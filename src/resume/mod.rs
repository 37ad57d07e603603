//! Checkpoint persistence for incremental harvesting
//!
//! Provides the `metadata.json` checkpoint with atomic writes and a run lock
//! that keeps two invocations from harvesting into the same directory.

pub mod checkpoint;
pub mod lock;

pub use checkpoint::{Checkpoint, CheckpointStore, CHECKPOINT_FILE};
pub use lock::HarvestLock;

/// Errors related to the checkpoint store
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Checkpoint missing, malformed or from another schema version
    #[error("checkpoint unreadable at {path}: {reason}")]
    Unreadable {
        /// Checkpoint file path
        path: String,
        /// What went wrong
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}
