//! The render crate's local error type (spec §7), layered over the
//! shared taxonomy the way the teacher layers `OfflineError` over its
//! own IO/DSP failure modes.

use daw_core::DawError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Core(#[from] DawError),

    #[error("render job cancelled")]
    Cancelled,

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("job not found: {0}")]
    NotFound(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
