//! Environment - the simulation run loop
//!
//! Owns the clock, the event queue, the process table, the resources and the
//! run's random source. Processes interact with it only through a
//! [`Context`] handed to them on every resumption.
//!
//! # Architecture
//!
//! ```text
//! run(horizon):
//!   while the next event is due at or before the horizon:
//!     1. Pop the event, advancing the clock to its wake time
//!     2. Resume its process with the event's Wake payload
//!     3. Act on the returned Step:
//!        Timeout  → schedule a wake-up after the delay
//!        Request  → grant now (resume again at once) or queue on the resource
//!        Join     → park until the child terminates
//!        Complete → release held units, hand the value to the joiner
//!   advance the clock to the horizon
//! ```
//!
//! # Failure handling
//!
//! - A process returning a non-fatal error becomes `Failed`. Its joiner (if
//!   any) receives `SubProcessFailure`; otherwise the failure is recorded in
//!   [`Environment::failures`].
//! - A fatal error aborts the run at once and halts the environment.
//! - Units a process still holds when it terminates are released on its
//!   behalf, on every exit path.
//!
//! # Example
//!
//! ```rust
//! use checkout_sim_core::{Context, Environment, SimulationError, Step, Wake};
//!
//! let mut env: Environment<()> = Environment::with_seed(42);
//! let counter = env.add_resource("counter", 1).unwrap();
//!
//! env.spawn_fn("shopper", move |ctx: &mut Context<'_, ()>, wake: Wake<()>| {
//!     match wake {
//!         Wake::Start => Ok(Step::Request(counter)),
//!         Wake::Granted(_) => Ok(Step::Timeout(3.0)),
//!         Wake::Timeout => {
//!             ctx.release(counter)?;
//!             Ok(Step::Complete(()))
//!         }
//!         other => Err(SimulationError::ProcessFailed(other.label())),
//!     }
//! });
//!
//! let summary = env.run(10.0).unwrap();
//! assert_eq!(summary.events_processed, 2);
//! assert_eq!(env.resource(counter).unwrap().active(), 0);
//! ```

use crate::core::error::SimulationError;
use crate::core::time::SimTime;
use crate::events::EventQueue;
use crate::models::process::{Process, ProcessId, ProcessState, Step, Wake};
use crate::models::resource::{RequestOutcome, Resource, ResourceId};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

// ============================================================================
// Run reporting
// ============================================================================

/// Failure of a process nobody was joining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessFailure {
    pub process: ProcessId,
    pub name: String,
    pub at: SimTime,
    pub error: String,
}

/// Outcome of one `run` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Clock value when the run stopped (the horizon)
    pub final_time: SimTime,
    /// Events executed by this call
    pub events_processed: u64,
    /// Events left pending beyond the horizon
    pub pending_events: usize,
    /// Processes that had not terminated when the run stopped
    pub live_processes: usize,
    /// Failures still unjoined when the run stopped
    pub failed_processes: usize,
}

// ============================================================================
// Process table
// ============================================================================

struct ProcessSlot<V> {
    name: String,
    state: ProcessState,
    /// Taken out while the process is being resumed; dropped on termination
    body: Option<Box<dyn Process<V>>>,
    /// Terminal outcome not yet delivered to a joiner
    outcome: Option<Result<V, SimulationError>>,
    joiner: Option<ProcessId>,
}

/// What a single resumption ended in
enum Suspension<V> {
    Waiting,
    Terminated(Result<V, SimulationError>),
}

// ============================================================================
// Environment
// ============================================================================

/// The discrete-event simulation environment
///
/// `V` is the value type processes complete with.
pub struct Environment<V = ()> {
    queue: EventQueue<V>,
    processes: BTreeMap<ProcessId, ProcessSlot<V>>,
    resources: Vec<Resource>,
    rng: RngManager,
    next_pid: u64,
    failures: Vec<ProcessFailure>,
    events_processed: u64,
    halted: bool,
}

impl<V: 'static> Environment<V> {
    /// Create an environment drawing all randomness from `rng`
    pub fn new(rng: RngManager) -> Self {
        Self {
            queue: EventQueue::new(),
            processes: BTreeMap::new(),
            resources: Vec::new(),
            rng,
            next_pid: 0,
            failures: Vec::new(),
            events_processed: 0,
            halted: false,
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(RngManager::new(seed))
    }

    /// Register a resource with `capacity` units
    ///
    /// # Errors
    /// `InvalidConfiguration` if `capacity` is zero.
    pub fn add_resource(
        &mut self,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<ResourceId, SimulationError> {
        let resource = Resource::new(name, capacity)?;
        self.resources.push(resource);
        Ok(ResourceId(self.resources.len() - 1))
    }

    /// Create a process and schedule its start at the current time
    ///
    /// Returns immediately; the process first runs when the loop reaches its
    /// start event.
    pub fn spawn<P>(&mut self, name: impl Into<String>, process: P) -> ProcessId
    where
        P: Process<V> + 'static,
    {
        let pid = ProcessId(self.next_pid);
        self.next_pid += 1;

        let name = name.into();
        trace!(process = %pid, name = %name, now = %self.queue.now(), "spawn");

        self.processes.insert(
            pid,
            ProcessSlot {
                name,
                state: ProcessState::Runnable,
                body: Some(Box::new(process)),
                outcome: None,
                joiner: None,
            },
        );
        self.queue.schedule_now(pid, Wake::Start);
        pid
    }

    /// `spawn` for closures, with the argument types inferred
    pub fn spawn_fn<F>(&mut self, name: impl Into<String>, f: F) -> ProcessId
    where
        F: FnMut(&mut Context<'_, V>, Wake<V>) -> Result<Step<V>, SimulationError> + 'static,
    {
        self.spawn(name, f)
    }

    /// Process events until the queue is empty or the next event is due
    /// after `horizon`
    ///
    /// Events due exactly at the horizon are processed. Events beyond it
    /// stay pending and are never executed by this call.
    ///
    /// # Errors
    /// - `InvalidConfiguration` for a non-positive or non-finite horizon
    ///   (nothing is processed)
    /// - any fatal error raised while processing; the environment is halted
    ///   and further calls return `Halted`
    pub fn run(&mut self, horizon: f64) -> Result<RunSummary, SimulationError> {
        if self.halted {
            return Err(SimulationError::Halted);
        }
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "horizon must be positive and finite, got {}",
                horizon
            )));
        }
        let horizon = SimTime::new(horizon)?;

        let mut processed = 0u64;
        while let Some(next) = self.queue.peek_time() {
            if next > horizon {
                break;
            }
            let Some(event) = self.queue.pop_next().map_err(|e| self.halt(e))? else {
                break;
            };

            self.events_processed += 1;
            processed += 1;
            self.dispatch(event.process, event.wake)
                .map_err(|e| self.halt(e))?;
        }
        self.queue.advance_to(horizon);

        let summary = RunSummary {
            final_time: self.queue.now(),
            events_processed: processed,
            pending_events: self.queue.len(),
            live_processes: self
                .processes
                .values()
                .filter(|slot| !slot.state.is_terminal())
                .count(),
            failed_processes: self.failures.len(),
        };
        debug!(
            now = %summary.final_time,
            events = summary.events_processed,
            pending = summary.pending_events,
            "run stopped"
        );
        Ok(summary)
    }

    fn halt(&mut self, error: SimulationError) -> SimulationError {
        warn!(now = %self.queue.now(), error = %error, "fatal error, aborting run");
        self.halted = true;
        error
    }

    /// Resume `pid` with `wake` and act on the step it returns
    fn dispatch(&mut self, pid: ProcessId, wake: Wake<V>) -> Result<(), SimulationError> {
        let slot = self
            .processes
            .get_mut(&pid)
            .ok_or(SimulationError::UnknownProcess(pid))?;
        if slot.state.is_terminal() {
            trace!(process = %pid, "event for terminated process ignored");
            return Ok(());
        }
        let Some(mut body) = slot.body.take() else {
            return Err(SimulationError::UnknownProcess(pid));
        };
        slot.state = ProcessState::Runnable;

        let suspension = self.drive(pid, &mut body, wake)?;

        match suspension {
            Suspension::Waiting => {
                if let Some(slot) = self.processes.get_mut(&pid) {
                    slot.body = Some(body);
                    slot.state = ProcessState::Waiting;
                }
                Ok(())
            }
            Suspension::Terminated(outcome) => {
                drop(body);
                self.terminate(pid, outcome)
            }
        }
    }

    /// Keep resuming while requests are granted immediately
    fn drive(
        &mut self,
        pid: ProcessId,
        body: &mut Box<dyn Process<V>>,
        mut wake: Wake<V>,
    ) -> Result<Suspension<V>, SimulationError> {
        loop {
            let step = {
                let mut ctx = Context { env: self, pid };
                body.resume(&mut ctx, wake)
            };

            let step = match step {
                Ok(step) => step,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => return Ok(Suspension::Terminated(Err(e))),
            };

            match step {
                Step::Timeout(delay) => {
                    return match self.queue.schedule(delay, pid, Wake::Timeout) {
                        Ok(_) => Ok(Suspension::Waiting),
                        Err(e) => Ok(Suspension::Terminated(Err(e))),
                    };
                }
                Step::Request(rid) => {
                    let Some(resource) = self.resources.get_mut(rid.0) else {
                        return Ok(Suspension::Terminated(Err(
                            SimulationError::UnknownResource(rid),
                        )));
                    };
                    match resource.request(pid)? {
                        RequestOutcome::Granted => {
                            trace!(process = %pid, resource = resource.name(), "granted");
                            wake = Wake::Granted(rid);
                        }
                        RequestOutcome::Queued { position } => {
                            trace!(process = %pid, resource = resource.name(), position, "queued");
                            return Ok(Suspension::Waiting);
                        }
                    }
                }
                Step::Join(child) => {
                    return match self.join(pid, child) {
                        Ok(()) => Ok(Suspension::Waiting),
                        Err(e) => Ok(Suspension::Terminated(Err(e))),
                    };
                }
                Step::Complete(value) => return Ok(Suspension::Terminated(Ok(value))),
            }
        }
    }

    fn join(&mut self, parent: ProcessId, child: ProcessId) -> Result<(), SimulationError> {
        if parent == child {
            return Err(SimulationError::JoinConflict {
                child,
                reason: "a process cannot join itself".to_string(),
            });
        }
        let slot = self
            .processes
            .get_mut(&child)
            .ok_or(SimulationError::UnknownProcess(child))?;
        if slot.joiner.is_some() {
            return Err(SimulationError::JoinConflict {
                child,
                reason: "already joined by another process".to_string(),
            });
        }
        slot.joiner = Some(parent);

        if slot.state.is_terminal() {
            let outcome = slot.outcome.take().ok_or_else(|| SimulationError::JoinConflict {
                child,
                reason: "outcome already consumed".to_string(),
            })?;
            let outcome = Self::joined_outcome(child, &slot.name, outcome);
            // The joiner now owns the failure; it is no longer unjoined
            if outcome.is_err() {
                self.failures.retain(|failure| failure.process != child);
            }
            self.queue
                .schedule_now(parent, Wake::Joined { child, outcome });
        }
        Ok(())
    }

    fn joined_outcome(
        child: ProcessId,
        name: &str,
        outcome: Result<V, SimulationError>,
    ) -> Result<V, SimulationError> {
        outcome.map_err(|source| SimulationError::SubProcessFailure {
            child,
            name: name.to_string(),
            source: Box::new(source),
        })
    }

    /// Move `pid` to its terminal state, releasing anything it still holds
    fn terminate(
        &mut self,
        pid: ProcessId,
        outcome: Result<V, SimulationError>,
    ) -> Result<(), SimulationError> {
        self.release_all(pid)?;

        let now = self.queue.now();
        let slot = self
            .processes
            .get_mut(&pid)
            .ok_or(SimulationError::UnknownProcess(pid))?;
        slot.state = if outcome.is_ok() {
            ProcessState::Completed
        } else {
            ProcessState::Failed
        };
        trace!(process = %pid, name = %slot.name, state = ?slot.state, %now, "terminated");

        match slot.joiner {
            Some(parent) => {
                let outcome = Self::joined_outcome(pid, &slot.name, outcome);
                self.queue
                    .schedule_now(parent, Wake::Joined { child: pid, outcome });
            }
            None => {
                if let Err(error) = &outcome {
                    warn!(process = %pid, name = %slot.name, %now, %error, "unjoined process failed");
                    self.failures.push(ProcessFailure {
                        process: pid,
                        name: slot.name.clone(),
                        at: now,
                        error: error.to_string(),
                    });
                }
                slot.outcome = Some(outcome);
            }
        }
        Ok(())
    }

    fn release_all(&mut self, pid: ProcessId) -> Result<(), SimulationError> {
        for index in 0..self.resources.len() {
            while self.resources[index].holds(pid) {
                warn!(
                    process = %pid,
                    resource = self.resources[index].name(),
                    "releasing unit held at termination"
                );
                self.release(pid, ResourceId(index))?;
            }
        }
        Ok(())
    }

    fn release(&mut self, pid: ProcessId, rid: ResourceId) -> Result<(), SimulationError> {
        let resource = self
            .resources
            .get_mut(rid.0)
            .ok_or(SimulationError::UnknownResource(rid))?;
        if let Some(next) = resource.release(pid)? {
            trace!(process = %next, resource = resource.name(), "granted from queue");
            self.queue.schedule_now(next, Wake::Granted(rid));
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Current virtual time
    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    pub fn resource(&self, rid: ResourceId) -> Option<&Resource> {
        self.resources.get(rid.0)
    }

    pub fn process_state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.processes.get(&pid).map(|slot| slot.state)
    }

    pub fn process_name(&self, pid: ProcessId) -> Option<&str> {
        self.processes.get(&pid).map(|slot| slot.name.as_str())
    }

    /// Take the outcome of a terminated process nobody joined
    pub fn take_outcome(&mut self, pid: ProcessId) -> Option<Result<V, SimulationError>> {
        self.processes.get_mut(&pid).and_then(|slot| slot.outcome.take())
    }

    /// Failures of processes nobody has joined, in the order they happened
    ///
    /// A failure leaves this list when a later join takes its outcome.
    pub fn failures(&self) -> &[ProcessFailure] {
        &self.failures
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Events executed over the environment's lifetime
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn rng_mut(&mut self) -> &mut RngManager {
        &mut self.rng
    }
}

impl<V> std::fmt::Debug for Environment<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("now", &self.queue.now())
            .field("pending_events", &self.queue.len())
            .field("processes", &self.processes.len())
            .field("resources", &self.resources.len())
            .field("halted", &self.halted)
            .finish()
    }
}

// ============================================================================
// Context
// ============================================================================

/// A process's view of the environment during one resumption
pub struct Context<'a, V> {
    env: &'a mut Environment<V>,
    pid: ProcessId,
}

impl<'a, V: 'static> Context<'a, V> {
    /// The running process
    pub fn id(&self) -> ProcessId {
        self.pid
    }

    /// Name the running process was spawned with
    pub fn name(&self) -> &str {
        self.env.process_name(self.pid).unwrap_or_default()
    }

    pub fn now(&self) -> SimTime {
        self.env.now()
    }

    /// The run's random source
    pub fn rng(&mut self) -> &mut RngManager {
        &mut self.env.rng
    }

    /// Spawn a process starting at the current time
    pub fn spawn<P>(&mut self, name: impl Into<String>, process: P) -> ProcessId
    where
        P: Process<V> + 'static,
    {
        self.env.spawn(name, process)
    }

    /// Give back one unit of `resource` held by the running process
    ///
    /// The next waiter, if any, is granted the unit and resumed at the
    /// current time.
    ///
    /// # Errors
    /// `ResourceInvariantViolation` (fatal) if the process holds no unit.
    pub fn release(&mut self, resource: ResourceId) -> Result<(), SimulationError> {
        self.env.release(self.pid, resource)
    }

    pub fn resource(&self, resource: ResourceId) -> Option<&Resource> {
        self.env.resource(resource)
    }

    pub fn process_state(&self, pid: ProcessId) -> Option<ProcessState> {
        self.env.process_state(pid)
    }
}
