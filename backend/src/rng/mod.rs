//! Deterministic random number generation
//!
//! Uses the xorshift64* algorithm for fast, reproducible draws.
//! CRITICAL: every random draw in a simulation run MUST come from the
//! `RngManager` owned by that run's `Environment`. Nothing reads a global
//! random source.

mod xorshift;

pub use xorshift::RngManager;
