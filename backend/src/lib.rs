//! Checkout Simulator Core - Rust Engine
//!
//! Discrete-event simulation of a supermarket checkout area with
//! deterministic execution.
//!
//! # Architecture
//!
//! - **core**: Virtual time, wall-clock rendering and errors
//! - **events**: Event queue (the clock plus time-ordered wake-ups)
//! - **models**: Domain types (Process, Resource, ResultRecord)
//! - **orchestrator**: The environment and its run loop
//! - **customers**: Customer flow and the store scenario runner
//! - **arrivals**: Customer generator
//! - **output**: CSV export of result records
//! - **sweep**: Parameter sweep over store configurations
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. Virtual time never decreases
//! 2. A resource never has more active holders than its capacity
//! 3. All randomness is deterministic (seeded RNG owned by the environment)
//! 4. Same-time events run in the order they were scheduled

// Module declarations
pub mod arrivals;
pub mod core;
pub mod customers;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod rng;
pub mod sweep;

// Re-exports for convenience
pub use arrivals::{ArrivalCount, ArrivalGenerator};
pub use core::error::SimulationError;
pub use core::time::{SimTime, WallClock};
pub use customers::{run_store, Customer, CustomerPlan, ScenarioConfig, StoreLayout, StoreRun};
pub use models::{
    process::{Process, ProcessId, ProcessState, Step, Wake},
    record::{ResultLog, ResultRecord},
    resource::{RequestOutcome, Resource, ResourceId, ResourceStats},
};
pub use orchestrator::{Context, Environment, ProcessFailure, RunSummary};
pub use output::{write_records, write_records_to_path, OutputError};
pub use rng::RngManager;
pub use sweep::{run_sweep, SweepConfig, SweepPoint, SweepReport};

// FFI module (when feature enabled)
#[cfg(feature = "python")]
pub mod ffi;
