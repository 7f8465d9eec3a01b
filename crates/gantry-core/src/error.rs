//! Error types.
//!
//! Two domain error kinds exist: [`StoreError`] for any failure to create,
//! read or reconstruct persisted job state, and [`ReportError`] for any
//! failure to parse a job's completion report. Both always carry the
//! offending path so operators can go straight to the broken file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to create, read, write or reconstruct persisted job state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("problem creating work directory '{}'", .path.display())]
    Workdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to read job record {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid format in {}: {}", .path.display(), .reason)]
    Format { path: PathBuf, reason: String },

    #[error("unable to parse job data in {}: {}", .path.display(), .reason)]
    Parse { path: PathBuf, reason: String },

    #[error("unable to write job record {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to turn a job's output directory into a structured report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("job report file '{}' does not exist", .0.display())]
    Missing(PathBuf),

    #[error("unable to read job report file '{}'", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("job report file '{}' is empty", .0.display())]
    Empty(PathBuf),

    #[error("job report file '{}' is incomplete", .0.display())]
    Incomplete(PathBuf),
}

impl ReportError {
    /// The report file the failure refers to.
    pub fn path(&self) -> &PathBuf {
        match self {
            ReportError::Missing(path)
            | ReportError::Empty(path)
            | ReportError::Incomplete(path) => path,
            ReportError::Unreadable { path, .. } => path,
        }
    }
}
