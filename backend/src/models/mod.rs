//! Domain models for the simulation engine

pub mod process;
pub mod record;
pub mod resource;

// Re-exports
pub use process::{Process, ProcessId, ProcessState, Step, Wake};
pub use record::{ResultLog, ResultRecord};
pub use resource::{RequestOutcome, Resource, ResourceId, ResourceStats};
