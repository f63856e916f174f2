//! Virtual clock and event queue
//!
//! # Critical Invariants
//!
//! 1. **Monotonic clock**: `now` never decreases
//! 2. **Deterministic order**: events pop in ascending `(wake_time, sequence)`
//!
//! # Example
//!
//! ```rust
//! use checkout_sim_core::events::EventQueue;
//! use checkout_sim_core::{ProcessId, Wake};
//!
//! let mut queue: EventQueue<()> = EventQueue::new();
//! queue.schedule(5.0, ProcessId::from(1), Wake::Timeout).unwrap();
//! queue.schedule(0.0, ProcessId::from(2), Wake::Start).unwrap();
//!
//! let first = queue.pop_next().unwrap().unwrap();
//! assert_eq!(first.process, ProcessId::from(2));
//! assert_eq!(queue.now().as_f64(), 0.0);
//!
//! let second = queue.pop_next().unwrap().unwrap();
//! assert_eq!(second.process, ProcessId::from(1));
//! assert_eq!(queue.now().as_f64(), 5.0);
//! ```

use crate::core::error::SimulationError;
use crate::core::time::SimTime;
use crate::events::types::{Event, EventKey};
use crate::models::process::{ProcessId, Wake};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Current virtual time plus the pending wake-ups
#[derive(Debug)]
pub struct EventQueue<V> {
    now: SimTime,
    next_sequence: u64,
    heap: BinaryHeap<Reverse<Event<V>>>,
}

impl<V> Default for EventQueue<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> EventQueue<V> {
    pub fn new() -> Self {
        Self {
            now: SimTime::ZERO,
            next_sequence: 0,
            heap: BinaryHeap::new(),
        }
    }

    /// Schedule `process` to be resumed with `wake` after `delay` units
    ///
    /// A zero delay is legal and yields control without advancing time.
    ///
    /// # Errors
    /// `InvalidDelay` if `delay` is negative or not finite.
    pub fn schedule(
        &mut self,
        delay: f64,
        process: ProcessId,
        wake: Wake<V>,
    ) -> Result<EventKey, SimulationError> {
        let wake_time = self.now.after(delay)?;
        Ok(self.push(wake_time, process, wake))
    }

    /// Schedule at the current time; cannot fail
    pub fn schedule_now(&mut self, process: ProcessId, wake: Wake<V>) -> EventKey {
        self.push(self.now, process, wake)
    }

    fn push(&mut self, wake_time: SimTime, process: ProcessId, wake: Wake<V>) -> EventKey {
        let key = EventKey {
            wake_time,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.heap.push(Reverse(Event { key, process, wake }));
        key
    }

    /// Remove the earliest event and advance `now` to its wake time
    ///
    /// # Errors
    /// `ClockRegression` (fatal) if the event is due before `now`.
    pub fn pop_next(&mut self) -> Result<Option<Event<V>>, SimulationError> {
        let Some(Reverse(event)) = self.heap.pop() else {
            return Ok(None);
        };

        if event.wake_time() < self.now {
            return Err(SimulationError::ClockRegression {
                now: self.now.as_f64(),
                wake_time: event.wake_time().as_f64(),
            });
        }

        self.now = event.wake_time();
        Ok(Some(event))
    }

    /// Wake time of the earliest pending event
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|Reverse(event)| event.wake_time())
    }

    /// Move the clock forward to `time`; earlier times are ignored
    pub fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_delay_rejected_without_scheduling() {
        let mut queue: EventQueue<()> = EventQueue::new();
        let err = queue
            .schedule(-1.0, ProcessId(1), Wake::Timeout)
            .unwrap_err();

        assert!(matches!(err, SimulationError::InvalidDelay(d) if d == -1.0));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_nan_delay_rejected() {
        let mut queue: EventQueue<()> = EventQueue::new();
        assert!(queue.schedule(f64::NAN, ProcessId(1), Wake::Timeout).is_err());
    }

    #[test]
    fn test_advance_to_never_moves_backward() {
        let mut queue: EventQueue<()> = EventQueue::new();
        queue.schedule(10.0, ProcessId(1), Wake::Timeout).unwrap();
        queue.pop_next().unwrap();

        queue.advance_to(SimTime::new(3.0).unwrap());
        assert_eq!(queue.now().as_f64(), 10.0);
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let mut queue: EventQueue<()> = EventQueue::new();
        let a = queue.schedule(1.0, ProcessId(1), Wake::Timeout).unwrap();
        let b = queue.schedule_now(ProcessId(2), Wake::Start);

        assert!(b.sequence > a.sequence);
        assert!(b < a, "earlier wake time orders first despite later sequence");
    }
}
