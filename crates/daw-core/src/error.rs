//! The shared error taxonomy (spec §7). The audio thread never surfaces one
//! of these: it silences and logs instead. Every other path returns it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DawError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("routing would create a cycle: {0}")]
    Cycle(String),

    #[error("busy: {0}")]
    Busy(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("format unsupported: {0}")]
    FormatUnsupported(String),

    #[error("cancelled")]
    Cancelled,

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

impl From<std::io::Error> for DawError {
    fn from(err: std::io::Error) -> Self {
        DawError::IoError(err.to_string())
    }
}

pub type DawResult<T> = Result<T, DawError>;
