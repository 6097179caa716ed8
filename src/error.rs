// src/error.rs

use thiserror::Error;

use crate::core::scheduler::SchedulerError;

/// Errors that cross an operation boundary.
///
/// Per-probe and per-provider failures never show up here: they are folded into
/// result data (`ProbeOutcome::Failed`, `SourceOutcome::Unavailable`) at the layer
/// where they happen. Only input problems and genuine faults become a `ReconError`.
#[derive(Error, Debug)]
pub enum ReconError {
    /// Missing or malformed caller input. Maps to HTTP 400.
    #[error("{0}")]
    Validation(String),

    /// The target host could not be resolved. Maps to HTTP 400.
    #[error("Could not resolve hostname: {0}")]
    Unresolvable(String),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReconError {
    pub fn validation(message: impl Into<String>) -> Self {
        ReconError::Validation(message.into())
    }

    /// True when the error was caused by the caller rather than by us.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReconError::Validation(_) | ReconError::Unresolvable(_))
    }
}
