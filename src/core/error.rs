//! Error types shared by every stage of a simulation run.

use thiserror::Error;

/// Everything that can stop a run.
///
/// `Config` and `Domain` come from bad input and are reported before any trial
/// is applied. `InvariantViolation` means a caller or the synthesizer produced
/// something impossible; the run is aborted without partial output.
#[derive(Error, Debug)]
pub enum SimError {
    /// Invalid run configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid distribution parameters
    #[error("Domain error: {0}")]
    Domain(String),

    /// Internal consistency check failed
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        SimError::Config(msg.into())
    }

    pub(crate) fn domain(msg: impl Into<String>) -> Self {
        SimError::Domain(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        SimError::InvariantViolation(msg.into())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(e: serde_json::Error) -> Self {
        SimError::Config(format!("invalid config json: {e}"))
    }
}

pub type SimResult<T> = Result<T, SimError>;
