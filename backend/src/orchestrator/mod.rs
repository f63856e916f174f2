//! Orchestrator - the environment and its run loop
//!
//! See `engine.rs` for full implementation.

pub mod engine;

// Re-export main types for convenience
pub use engine::{Context, Environment, ProcessFailure, RunSummary};
