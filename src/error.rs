// FallWatch — Pipeline error taxonomy
//
// Per-sample and per-inference errors are contained by the owning task and
// logged. Only startup failures and task death escalate to a restart.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Sensor bus read failed. Transient: the sample is skipped.
    #[error("sensor I/O error: {0}")]
    Io(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted before its precondition holds.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("resource exhausted: {required} bytes requested, {capacity} available")]
    ResourceExhausted { required: usize, capacity: usize },

    #[error("classifier model not loaded")]
    ModelNotReady,
}

pub type Result<T> = std::result::Result<T, PipelineError>;
