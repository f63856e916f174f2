//! Scheduled events
//!
//! An event is a future resumption of one process. Events are ordered by
//! `(wake_time, sequence)`; the sequence number is assigned when the event is
//! scheduled, so events due at the same instant run first-scheduled,
//! first-run.

use crate::core::time::SimTime;
use crate::models::process::{ProcessId, Wake};
use std::cmp::Ordering;

/// Ordering key of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    pub wake_time: SimTime,
    pub sequence: u64,
}

/// A scheduled resumption of `process`, delivering `wake`
#[derive(Debug)]
pub struct Event<V> {
    pub key: EventKey,
    pub process: ProcessId,
    pub wake: Wake<V>,
}

impl<V> Event<V> {
    pub fn wake_time(&self) -> SimTime {
        self.key.wake_time
    }

    pub fn sequence(&self) -> u64 {
        self.key.sequence
    }
}

impl<V> PartialEq for Event<V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<V> Eq for Event<V> {}

impl<V> PartialOrd for Event<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Ord for Event<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
