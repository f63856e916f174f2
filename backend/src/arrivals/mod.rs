//! Customer arrivals
//!
//! The generator is an endless process: spawn a customer, wait a uniform
//! `[1, 5]` time units, repeat. It never completes and knows nothing about
//! the horizon; the environment stops it by not processing its next wake-up.
//!
//! # Key Principles
//!
//! 1. **Determinism**: gaps are drawn from the environment's RNG, after the
//!    customer is spawned and before that customer first runs
//! 2. **Naming**: customers are named `Customer 1`, `Customer 2`, ...
//!
//! # Example
//!
//! ```
//! use checkout_sim_core::arrivals::ArrivalGenerator;
//! use checkout_sim_core::customers::StoreLayout;
//! use checkout_sim_core::{Environment, ResultLog, SimTime};
//!
//! let mut env: Environment<SimTime> = Environment::with_seed(42);
//! let layout = StoreLayout {
//!     regular: env.add_resource("regular", 1).unwrap(),
//!     self_checkout: env.add_resource("self-checkout", 2).unwrap(),
//!     shopping_items_time: 20,
//!     packing_items_time: 3,
//! };
//! let results = ResultLog::new();
//!
//! env.spawn("customer generator", ArrivalGenerator::new(layout, results.clone()));
//! env.run(120.0).unwrap();
//! assert!(!results.is_empty());
//! ```

use crate::core::error::SimulationError;
use crate::core::time::SimTime;
use crate::customers::{Customer, StoreLayout};
use crate::models::process::{Process, Step, Wake};
use crate::models::record::ResultLog;
use crate::orchestrator::Context;
use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

/// Longest gap between two arrivals, in time units
pub const MAX_INTERARRIVAL_TIME: u32 = 5;

/// Shared view of how many customers a generator has spawned
///
/// Stays readable after the generator itself has been handed to the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct ArrivalCount(Rc<Cell<u64>>);

impl ArrivalCount {
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    fn increment(&self) -> u64 {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }
}

/// Endless source of customers for one store
#[derive(Debug)]
pub struct ArrivalGenerator {
    layout: StoreLayout,
    results: ResultLog,
    spawned: ArrivalCount,
}

impl ArrivalGenerator {
    pub fn new(layout: StoreLayout, results: ResultLog) -> Self {
        Self {
            layout,
            results,
            spawned: ArrivalCount::default(),
        }
    }

    /// Handle to the number of customers spawned so far
    pub fn arrivals(&self) -> ArrivalCount {
        self.spawned.clone()
    }
}

impl Process<SimTime> for ArrivalGenerator {
    fn resume(
        &mut self,
        ctx: &mut Context<'_, SimTime>,
        wake: Wake<SimTime>,
    ) -> Result<Step<SimTime>, SimulationError> {
        match wake {
            Wake::Start | Wake::Timeout => {
                let id = self.spawned.increment();
                let name = format!("Customer {}", id);
                trace!(customer = %name, at = %ctx.now(), "arrival");
                ctx.spawn(
                    name.clone(),
                    Customer::new(name, self.layout, self.results.clone()),
                );

                let gap = ctx.rng().uniform_inclusive(1, MAX_INTERARRIVAL_TIME);
                Ok(Step::Timeout(f64::from(gap)))
            }
            other => Err(SimulationError::UnexpectedWake {
                process: "customer generator".to_string(),
                wake: other.label(),
            }),
        }
    }
}
