use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single step's action failed.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("precondition check failed for {}: {source}", .path.display())]
    PreconditionCheck {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("command not found: {program}")]
    CommandNotFound { program: String },

    #[error("`{command}` exited with {status}")]
    ExternalCommand { command: String, status: String },

    #[error("permission denied: {}", .path.display())]
    Permission { path: PathBuf },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot resolve owner {spec:?}: {reason}")]
    Owner { spec: String, reason: String },

    #[error("download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    #[error("ownership fix left {failed} entries unchanged ({changed} re-owned), first: {first}")]
    OwnershipIncomplete {
        failed: usize,
        changed: usize,
        #[source]
        first: Box<StepError>,
    },
}

impl StepError {
    /// Map an I/O error on `path`, surfacing permission problems distinctly.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            StepError::Permission { path }
        } else {
            StepError::Io { path, source }
        }
    }
}

/// Raised only when an abort-policy step fails.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("step {step:?} failed and is marked abort-on-failure")]
    Aborted {
        step: String,
        #[source]
        source: StepError,
    },
}
