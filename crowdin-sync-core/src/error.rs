//! Error taxonomy shared by both pipelines.
//!
//! Missing translations and ambiguous identifiers are not errors; the pipelines
//! skip and log them. Everything here aborts the current run.

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::ServiceError;
use crate::record::StoreError;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A remote call failed.
    #[error("remote service error: {0}")]
    Service(#[source] ServiceError),

    /// The local record store failed.
    #[error("record store error: {0}")]
    Store(#[source] StoreError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Field auto-discovery was requested for records that expose no translatable fields.
    #[error("records of {0} do not expose translatable fields; pass an explicit field list")]
    NotTranslatable(String),

    /// A download was requested for a file that has no remote counterpart.
    #[error("no remote file {name} in directory {directory}; upload it first")]
    FileNotFound { directory: String, name: String },

    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(PathBuf),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<ServiceError> for SyncError {
    fn from(e: ServiceError) -> Self {
        SyncError::Service(e)
    }
}
