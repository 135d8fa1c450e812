use std::io;
use std::path::{Path, PathBuf};

use tally::JobError;
use thiserror::Error;

use crate::record::RecordError;

/// Exit status for a missing input file
pub const EXIT_INPUT_NOT_FOUND: i32 = 2;

/// Exit status for every other failure
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum SalesError {
    #[error("file '{}' does not exist", .0.display())]
    InputNotFound(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: io::Error },

    #[error("line {line}: {source}: {content:?}")]
    Malformed { line: usize, content: String, #[source] source: RecordError },

    #[error("worker panicked on partition {0}")]
    WorkerPanicked(usize),

    #[error("cannot start worker pool: {0}")]
    WorkerPool(String),

    #[error("invalid configuration: {0}")]
    Config(String)
}

pub type Result<T> = std::result::Result<T, SalesError>;

impl SalesError {

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        SalesError::Io { path: path.to_path_buf(), source: source }
    }

    /// Process exit status the command line reports this error with.
    pub fn exit_code(&self) -> i32 {
        match self {
            SalesError::InputNotFound(_) => EXIT_INPUT_NOT_FOUND,
            _ => EXIT_FAILURE
        }
    }
}

impl From<JobError<SalesError>> for SalesError {
    fn from(e: JobError<SalesError>) -> Self {
        match e {
            JobError::Failed(e) => e,
            JobError::Panicked(idx) => SalesError::WorkerPanicked(idx)
        }
    }
}
