//! Core primitives shared by every layer: virtual time and errors

pub mod error;
pub mod time;
