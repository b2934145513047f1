//! Error types for the tool opener.
//!
//! Synchronous failures (`CatalogError`, `StartError`) reject a request before
//! any job exists. `DriverError` only ever reaches callers through a failed job
//! record. `TransitionError` flags a programming error in the lifecycle path.

use std::time::Duration;

use thiserror::Error;

use crate::jobs::Phase;

/// Resource catalog lookup failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No catalog entry for the requested name.
    #[error("unknown tool: {name}")]
    NotFound { name: String },
}

/// Platform driver failure. Always carries a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Location rejected before reaching the application.
    #[error("invalid location {location:?}: {reason}")]
    InvalidLocation { location: String, reason: String },

    /// Automation process could not be launched.
    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    /// Automation script ran but reported failure.
    #[error("automation script failed (exit {exit_code:?}): {stderr}")]
    ScriptFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// Automation script did not finish in time.
    #[error("automation script timed out after {0:?}")]
    Timeout(Duration),
}

/// Rejected job record transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The record already reached `Closed` or `Failed`.
    #[error("job is terminal ({current:?}); refusing transition to {requested:?}")]
    Terminal { current: Phase, requested: Phase },

    /// The transition is not part of the lifecycle graph.
    #[error("illegal job transition {from:?} -> {to:?}")]
    Illegal { from: Phase, to: Phase },

    /// `error` must be present exactly when the phase is `Failed`.
    #[error("error text must be set if and only if phase is Failed (requested {requested:?})")]
    ErrorMismatch { requested: Phase },
}

/// Synchronous rejection when submitting a job to `LifecycleManager`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StartError {
    /// Requested duration is above the configured maximum (reject policy).
    #[error("duration {requested_secs}s exceeds maximum of {max_secs}s")]
    DurationExceeded { requested_secs: u64, max_secs: u64 },

    /// The pending queue is full.
    #[error("too many jobs waiting to start (limit {limit})")]
    AtCapacity { limit: usize },

    /// The dispatch loop is gone; no job can run.
    #[error("lifecycle manager is shut down")]
    Closed,
}
