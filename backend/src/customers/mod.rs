//! Supermarket customer flow
//!
//! The workload built on the engine: customers shop, queue at a regular
//! counter (capacity `cap`) or a self-checkout (capacity `2 × cap`), pay,
//! pack and leave, while an [`ArrivalGenerator`] keeps sending new ones.
//!
//! - **activity**: the joined sub-process behind every milestone
//! - **flow**: the customer state machine
//!
//! [`run_store`] wires one complete scenario: a fresh environment, both
//! counters, the generator, a run to the horizon.

pub mod activity;
pub mod flow;

pub use activity::Activity;
pub use flow::{Customer, CustomerPlan, StoreLayout, EXIT_DELAY, MAX_PAYING_TIME};

use crate::arrivals::ArrivalGenerator;
use crate::core::error::SimulationError;
use crate::core::time::SimTime;
use crate::models::record::{ResultLog, ResultRecord};
use crate::models::resource::ResourceStats;
use crate::orchestrator::{Environment, ProcessFailure, RunSummary};
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Parameters of one store simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Upper bound of the shopping duration draw
    pub shopping_items_time: u32,
    /// Upper bound of the packing duration draw
    pub packing_items_time: u32,
    /// Regular counters; self-checkout gets twice as many
    pub capacity: usize,
    /// Virtual time at which the run stops
    pub horizon: f64,
    pub seed: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            shopping_items_time: 20,
            packing_items_time: 3,
            capacity: 1,
            horizon: 540.0,
            seed: 12345,
        }
    }
}

impl ScenarioConfig {
    /// Reject configurations that cannot produce a meaningful run
    ///
    /// # Errors
    /// `InvalidConfiguration` naming the first offending field.
    pub fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |msg: String| Err(SimulationError::InvalidConfiguration(msg));

        if self.shopping_items_time == 0 {
            return invalid("shopping_items_time must be positive".to_string());
        }
        if self.packing_items_time == 0 {
            return invalid("packing_items_time must be positive".to_string());
        }
        if self.capacity == 0 {
            return invalid("capacity must be positive".to_string());
        }
        if self.capacity.checked_mul(2).is_none() {
            return invalid(format!(
                "capacity {} too large for the self-checkout (2 x capacity)",
                self.capacity
            ));
        }
        if !self.horizon.is_finite() || self.horizon <= 0.0 {
            return invalid(format!("horizon must be positive, got {}", self.horizon));
        }
        Ok(())
    }
}

/// Everything one store run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRun {
    pub records: Vec<ResultRecord>,
    pub summary: RunSummary,
    pub failures: Vec<ProcessFailure>,
    pub customers_arrived: u64,
    pub regular_stats: ResourceStats,
    pub self_checkout_stats: ResourceStats,
}

/// Build the store's counters on `env`
pub fn build_store(
    env: &mut Environment<SimTime>,
    config: &ScenarioConfig,
) -> Result<StoreLayout, SimulationError> {
    let regular = env.add_resource("regular", config.capacity)?;
    let self_checkout_capacity = config.capacity.checked_mul(2).ok_or_else(|| {
        SimulationError::InvalidConfiguration(format!(
            "capacity {} too large for the self-checkout (2 x capacity)",
            config.capacity
        ))
    })?;
    let self_checkout = env.add_resource("self-checkout", self_checkout_capacity)?;

    Ok(StoreLayout {
        regular,
        self_checkout,
        shopping_items_time: config.shopping_items_time,
        packing_items_time: config.packing_items_time,
    })
}

/// Run one store scenario from time 0 to `config.horizon`
///
/// # Errors
/// `InvalidConfiguration` before anything runs, or a fatal engine error.
///
/// # Example
/// ```
/// use checkout_sim_core::customers::{run_store, ScenarioConfig};
///
/// let run = run_store(&ScenarioConfig { horizon: 60.0, ..Default::default() }).unwrap();
/// assert!(run.customers_arrived >= 12);
/// assert!(run.records.len() as u64 <= run.customers_arrived);
/// ```
pub fn run_store(config: &ScenarioConfig) -> Result<StoreRun, SimulationError> {
    config.validate()?;

    let mut env: Environment<SimTime> = Environment::new(RngManager::new(config.seed));
    let layout = build_store(&mut env, config)?;
    let results = ResultLog::new();

    let generator = ArrivalGenerator::new(layout, results.clone());
    let arrivals = generator.arrivals();
    env.spawn("customer generator", generator);
    let summary = env.run(config.horizon)?;

    let stats = |rid| env.resource(rid).map(|r| r.stats()).unwrap_or_default();
    let run = StoreRun {
        records: results.snapshot(),
        summary,
        failures: env.failures().to_vec(),
        customers_arrived: arrivals.get(),
        regular_stats: stats(layout.regular),
        self_checkout_stats: stats(layout.self_checkout),
    };

    info!(
        shopping_items_time = config.shopping_items_time,
        packing_items_time = config.packing_items_time,
        capacity = config.capacity,
        customers = run.customers_arrived,
        completed = run.records.len(),
        "simulation finished"
    );
    Ok(run)
}
