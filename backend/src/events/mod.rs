//! Clock and pending wake-ups
//!
//! - **types**: `Event` and its ordering key
//! - **queue**: `EventQueue`, the virtual clock plus a time-ordered heap

pub mod queue;
pub mod types;

pub use queue::EventQueue;
pub use types::{Event, EventKey};
