//! Per-customer result records and the shared log they are appended to

use crate::core::time::SimTime;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// One completed customer journey
///
/// Created once when the customer leaves and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub customer: String,
    pub enter_time: SimTime,
    pub shopping_time: SimTime,
    pub start_queue: SimTime,
    pub checkout_start: SimTime,
    pub paying_time: SimTime,
    pub packing_time: SimTime,
    pub leave_time: SimTime,
    pub checkout_choice_regular: bool,
}

impl ResultRecord {
    /// Time spent between joining the queue and reaching a counter
    pub fn queue_wait(&self) -> f64 {
        self.checkout_start.as_f64() - self.start_queue.as_f64()
    }
}

/// Append-only results collection shared by the processes of one run
///
/// Cloning yields another handle to the same log. Runs are single-threaded,
/// so interior mutability through `Rc<RefCell<_>>` is enough.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    records: Rc<RefCell<Vec<ResultRecord>>>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ResultRecord) {
        self.records.borrow_mut().push(record);
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Copy of the records appended so far, in completion order
    pub fn snapshot(&self) -> Vec<ResultRecord> {
        self.records.borrow().clone()
    }
}
