//! Capacity-bounded resource with a FIFO wait queue
//!
//! A `Resource` models a fixed number of interchangeable service stations
//! (checkout counters). Processes request one unit at a time; when every unit
//! is taken, requests wait in arrival order.
//!
//! # Critical Invariants
//!
//! 1. **Capacity bound**: `0 <= active <= capacity` at all times
//! 2. **Work conservation**: the wait queue is non-empty only when
//!    `active == capacity`
//! 3. **FIFO fairness**: grants happen strictly in request arrival order; a
//!    holder is never displaced
//! 4. **Release pairing**: a release must match an earlier grant to the same
//!    process
//!
//! Breaking 1 or 4 yields `ResourceInvariantViolation`, which is fatal.
//!
//! # Example
//!
//! ```rust
//! use checkout_sim_core::models::resource::{Resource, RequestOutcome};
//! use checkout_sim_core::ProcessId;
//!
//! let (first, second) = (ProcessId::from(1), ProcessId::from(2));
//! let mut counter = Resource::new("regular", 1).unwrap();
//! assert_eq!(counter.request(first).unwrap(), RequestOutcome::Granted);
//! assert_eq!(counter.request(second).unwrap(), RequestOutcome::Queued { position: 0 });
//!
//! // Releasing hands the unit straight to the head of the queue
//! assert_eq!(counter.release(first).unwrap(), Some(second));
//! assert_eq!(counter.active(), 1);
//! ```

use crate::core::error::SimulationError;
use crate::models::process::ProcessId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Handle to a resource registered with an `Environment`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub(crate) usize);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Result of a capacity request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A unit was free; the requester holds it now
    Granted,
    /// Appended to the wait queue at the given (0-based) position
    Queued { position: usize },
}

/// A pending request in the wait queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRequest {
    pub requester: ProcessId,
    pub enqueue_sequence: u64,
}

/// Counters collected over the resource's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub grants: u64,
    pub releases: u64,
    pub queued: u64,
    pub peak_active: usize,
    pub peak_queue_len: usize,
}

/// Capacity-bounded pool with FIFO waiting
#[derive(Debug, Clone)]
pub struct Resource {
    name: String,
    capacity: usize,
    active: usize,
    /// Units held per process (a process may hold several)
    holders: BTreeMap<ProcessId, usize>,
    wait_queue: VecDeque<ResourceRequest>,
    next_enqueue_sequence: u64,
    stats: ResourceStats,
}

impl Resource {
    /// Create a resource with `capacity` units
    ///
    /// # Errors
    /// `InvalidConfiguration` if `capacity` is zero.
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self, SimulationError> {
        let name = name.into();
        if capacity == 0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "resource '{}' must have positive capacity",
                name
            )));
        }

        Ok(Self {
            name,
            capacity,
            active: 0,
            holders: BTreeMap::new(),
            wait_queue: VecDeque::new(),
            next_enqueue_sequence: 0,
            stats: ResourceStats::default(),
        })
    }

    /// Ask for one unit on behalf of `process`
    ///
    /// Grants immediately when a unit is free, otherwise queues at the tail.
    pub fn request(&mut self, process: ProcessId) -> Result<RequestOutcome, SimulationError> {
        if self.active < self.capacity {
            self.grant(process)?;
            return Ok(RequestOutcome::Granted);
        }

        let position = self.wait_queue.len();
        self.wait_queue.push_back(ResourceRequest {
            requester: process,
            enqueue_sequence: self.next_enqueue_sequence,
        });
        self.next_enqueue_sequence += 1;
        self.stats.queued += 1;
        self.stats.peak_queue_len = self.stats.peak_queue_len.max(self.wait_queue.len());

        Ok(RequestOutcome::Queued { position })
    }

    /// Give back one unit held by `process`
    ///
    /// Returns the process at the head of the wait queue if it was granted
    /// the freed unit; the caller must schedule its resumption at the
    /// current time.
    ///
    /// # Errors
    /// `ResourceInvariantViolation` if `process` holds no unit.
    pub fn release(&mut self, process: ProcessId) -> Result<Option<ProcessId>, SimulationError> {
        match self.holders.get_mut(&process) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.holders.remove(&process);
            }
            None => {
                return Err(self.violation(format!("release by {} which holds no grant", process)));
            }
        }

        self.active = self
            .active
            .checked_sub(1)
            .ok_or_else(|| self.violation("active count underflow".to_string()))?;
        self.stats.releases += 1;

        match self.wait_queue.pop_front() {
            Some(next) => {
                self.grant(next.requester)?;
                Ok(Some(next.requester))
            }
            None => Ok(None),
        }
    }

    fn grant(&mut self, process: ProcessId) -> Result<(), SimulationError> {
        if self.active >= self.capacity {
            return Err(self.violation(format!(
                "grant to {} would exceed capacity {}",
                process, self.capacity
            )));
        }

        self.active += 1;
        *self.holders.entry(process).or_insert(0) += 1;
        self.stats.grants += 1;
        self.stats.peak_active = self.stats.peak_active.max(self.active);
        Ok(())
    }

    fn violation(&self, detail: String) -> SimulationError {
        SimulationError::ResourceInvariantViolation {
            resource: self.name.clone(),
            detail,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units currently granted
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn queue_len(&self) -> usize {
        self.wait_queue.len()
    }

    /// Number of units `process` currently holds
    pub fn held_by(&self, process: ProcessId) -> usize {
        self.holders.get(&process).copied().unwrap_or(0)
    }

    pub fn holds(&self, process: ProcessId) -> bool {
        self.held_by(process) > 0
    }

    /// Requesters in grant order
    pub fn waiting(&self) -> impl Iterator<Item = &ResourceRequest> {
        self.wait_queue.iter()
    }

    pub fn stats(&self) -> ResourceStats {
        self.stats
    }
}
