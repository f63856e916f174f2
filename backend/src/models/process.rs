//! Process protocol
//!
//! A process is a unit of sequential logic written as an explicit state
//! machine. The [`Environment`](crate::orchestrator::Environment) calls
//! [`Process::resume`] with a [`Wake`] describing why the process woke up; the
//! process does any instantaneous work and returns the [`Step`] it wants to
//! suspend on next.
//!
//! # Lifecycle
//!
//! ```text
//! Runnable ──Step──▶ Waiting ──event──▶ Runnable ──▶ … ──▶ Completed | Failed
//! ```
//!
//! Terminal states are absorbing: a completed or failed process is never
//! resumed again.

use crate::core::error::SimulationError;
use crate::models::resource::ResourceId;
use crate::orchestrator::Context;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a process owned by an `Environment`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessId(pub(crate) u64);

impl ProcessId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ProcessId {
    fn from(raw: u64) -> Self {
        ProcessId(raw)
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "process#{}", self.0)
    }
}

/// Lifecycle state of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessState {
    /// Scheduled to run, or currently running
    Runnable,
    /// Suspended on a timer, a resource or a join
    Waiting,
    /// Finished with a value
    Completed,
    /// Finished with an error
    Failed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessState::Completed | ProcessState::Failed)
    }
}

/// Why a process is being resumed; the payload of an event
#[derive(Debug)]
pub enum Wake<V> {
    /// First resumption after `spawn`
    Start,
    /// A `Step::Timeout` expired
    Timeout,
    /// One unit of the resource was granted
    Granted(ResourceId),
    /// A joined child reached a terminal state
    Joined {
        child: ProcessId,
        outcome: Result<V, SimulationError>,
    },
}

impl<V> Wake<V> {
    /// Short label for logs and `UnexpectedWake` errors
    pub fn label(&self) -> String {
        match self {
            Wake::Start => "start".to_string(),
            Wake::Timeout => "timeout".to_string(),
            Wake::Granted(resource) => format!("granted {}", resource),
            Wake::Joined { child, outcome } => match outcome {
                Ok(_) => format!("joined {} (completed)", child),
                Err(_) => format!("joined {} (failed)", child),
            },
        }
    }
}

/// What a process suspends on after a resumption
#[derive(Debug)]
pub enum Step<V> {
    /// Sleep for the given virtual duration, then resume with `Wake::Timeout`
    Timeout(f64),
    /// Request one unit of a resource; resumes with `Wake::Granted`
    /// (immediately, without suspending, when capacity is free)
    Request(ResourceId),
    /// Wait for a child to terminate; resumes with `Wake::Joined`
    Join(ProcessId),
    /// Finish with a value
    Complete(V),
}

/// A resumable unit of sequential logic
///
/// `V` is the value type every process in one environment completes with.
/// Returning `Err` fails the process; if the error is fatal (see
/// [`SimulationError::is_fatal`]) the whole run aborts.
pub trait Process<V> {
    fn resume(&mut self, ctx: &mut Context<'_, V>, wake: Wake<V>)
        -> Result<Step<V>, SimulationError>;
}

impl<V, F> Process<V> for F
where
    F: FnMut(&mut Context<'_, V>, Wake<V>) -> Result<Step<V>, SimulationError>,
{
    fn resume(
        &mut self,
        ctx: &mut Context<'_, V>,
        wake: Wake<V>,
    ) -> Result<Step<V>, SimulationError> {
        self(ctx, wake)
    }
}
