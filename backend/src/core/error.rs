//! Error types for the simulation engine
//!
//! Errors fall into two classes:
//!
//! - **Local** errors fail the call site or the offending process only
//!   (bad configuration, negative delays, a failed sub-process, an unexpected
//!   wake-up).
//! - **Fatal** errors mean shared bookkeeping can no longer be trusted
//!   (`ResourceInvariantViolation`, `ClockRegression`). They abort the whole
//!   run; see [`SimulationError::is_fatal`].

use crate::models::process::ProcessId;
use crate::models::resource::ResourceId;
use thiserror::Error;

/// Errors raised by the engine and by processes running on it.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration rejected before any event was processed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Negative or non-finite scheduling delay
    #[error("Invalid delay: {0} (must be finite and non-negative)")]
    InvalidDelay(f64),

    /// Negative or non-finite virtual time
    #[error("Invalid virtual time: {0}")]
    InvalidTime(f64),

    /// Resource bookkeeping broken (over-grant or unmatched release)
    #[error("Resource invariant violated on {resource}: {detail}")]
    ResourceInvariantViolation { resource: String, detail: String },

    /// The clock was asked to move backward
    #[error("Clock regression: now is {now}, event wakes at {wake_time}")]
    ClockRegression { now: f64, wake_time: f64 },

    /// A joined sub-process terminated in the Failed state
    #[error("Sub-process {name} ({child}) failed: {source}")]
    SubProcessFailure {
        child: ProcessId,
        name: String,
        #[source]
        source: Box<SimulationError>,
    },

    /// Process handle not known to this environment
    #[error("Unknown process: {0}")]
    UnknownProcess(ProcessId),

    /// Resource handle not known to this environment
    #[error("Unknown resource: {0}")]
    UnknownResource(ResourceId),

    /// Join on self or on a child that already has a joiner
    #[error("Cannot join {child}: {reason}")]
    JoinConflict { child: ProcessId, reason: String },

    /// A process was resumed with a wake-up it was not waiting for
    #[error("Process {process} received unexpected wake-up: {wake}")]
    UnexpectedWake { process: String, wake: String },

    /// Failure raised by process logic itself
    #[error("Process failed: {0}")]
    ProcessFailed(String),

    /// The environment was aborted by an earlier fatal error
    #[error("Environment halted by an earlier fatal error")]
    Halted,
}

impl SimulationError {
    /// Whether this error must abort the entire run.
    ///
    /// # Example
    /// ```
    /// use checkout_sim_core::SimulationError;
    ///
    /// let err = SimulationError::ResourceInvariantViolation {
    ///     resource: "regular".to_string(),
    ///     detail: "release without grant".to_string(),
    /// };
    /// assert!(err.is_fatal());
    /// assert!(!SimulationError::InvalidDelay(-1.0).is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimulationError::ResourceInvariantViolation { .. }
                | SimulationError::ClockRegression { .. }
        )
    }
}
