//! Record path layout
//!
//! Records are stored as `<root>/<year>/<month>/<identifier>.json`. Year and
//! month come from the record's own identifier, not from the window it was
//! listed under, and are written without zero padding (`2023/4`).
//!
//! # Usage Example
//!
//! ```rust
//! use cnnvd_harvester::identifier::CnnvdIdentifier;
//! use cnnvd_harvester::output::RecordPathBuilder;
//! use std::path::PathBuf;
//!
//! let id = CnnvdIdentifier::parse("CNNVD-202304-0662").unwrap();
//! let path = RecordPathBuilder::new(PathBuf::from("data")).build(&id);
//! assert_eq!(path, PathBuf::from("data/2023/4/CNNVD-202304-0662.json"));
//! ```

use crate::identifier::CnnvdIdentifier;
use std::path::{Path, PathBuf};

/// Record file extension
const EXTENSION: &str = "json";

/// Path builder for the year/month record layout
#[derive(Debug, Clone)]
pub struct RecordPathBuilder {
    root_dir: PathBuf,
}

impl RecordPathBuilder {
    /// Create a builder rooted at the target directory
    pub fn new(root_dir: PathBuf) -> Self {
        Self { root_dir }
    }

    /// Root directory
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory holding the records of an identifier's month
    pub fn directory(&self, identifier: &CnnvdIdentifier) -> PathBuf {
        self.root_dir
            .join(identifier.year().to_string())
            .join(identifier.month().to_string())
    }

    /// Full file path of a record
    ///
    /// The identifier is already validated (prefix, digits and dashes only),
    /// so its canonical form is safe to use as a file name.
    pub fn build(&self, identifier: &CnnvdIdentifier) -> PathBuf {
        self.directory(identifier)
            .join(format!("{identifier}.{EXTENSION}"))
    }
}
