//! Virtual time for the simulation
//!
//! The simulation clock is a dimensionless, non-negative scalar that only
//! moves when events are processed. This module provides the time value
//! itself and the conversion of virtual time into a wall-clock `HH:MM`
//! string for reports.

use crate::core::error::SimulationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A point in virtual time
///
/// Always finite and non-negative. Ordering is total, so `SimTime` can key
/// the event heap directly.
///
/// # Example
/// ```
/// use checkout_sim_core::SimTime;
///
/// let t = SimTime::new(2.5).unwrap();
/// assert_eq!(t.as_f64(), 2.5);
/// assert!(SimTime::new(-1.0).is_err());
/// assert!(SimTime::ZERO < t);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SimTime(f64);

impl SimTime {
    /// Start of every simulation
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a time value, rejecting negative and non-finite input
    pub fn new(value: f64) -> Result<Self, SimulationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(SimulationError::InvalidTime(value));
        }
        // Normalizes -0.0 so equality and ordering agree.
        Ok(SimTime(value + 0.0))
    }

    /// Raw value in time units
    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// This time shifted forward by `delay` units
    ///
    /// # Errors
    /// `InvalidDelay` if `delay` is negative or not finite.
    ///
    /// # Example
    /// ```
    /// use checkout_sim_core::SimTime;
    ///
    /// let t = SimTime::new(4.0).unwrap().after(0.5).unwrap();
    /// assert_eq!(t.as_f64(), 4.5);
    /// ```
    pub fn after(self, delay: f64) -> Result<Self, SimulationError> {
        if !delay.is_finite() || delay < 0.0 {
            return Err(SimulationError::InvalidDelay(delay));
        }
        SimTime::new(self.0 + delay)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimulationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SimTime::new(value)
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> f64 {
        time.0
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Wall-clock formatting
// ============================================================================

/// Maps virtual time onto a 24-hour wall clock
///
/// # Example
/// ```
/// use checkout_sim_core::WallClock;
///
/// let clock = WallClock::new(9, 1);
/// assert_eq!(clock.format_units(0.0), "09:00");
/// assert_eq!(clock.format_units(65.0), "10:05");
/// assert_eq!(clock.format_units(900.0), "00:00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallClock {
    /// Hour of day at virtual time zero
    pub start_hour: u32,
    /// Wall-clock minutes per virtual time unit
    pub minutes_per_unit: u32,
}

impl WallClock {
    pub fn new(start_hour: u32, minutes_per_unit: u32) -> Self {
        Self {
            start_hour,
            minutes_per_unit,
        }
    }

    /// Format a virtual time as `HH:MM`
    pub fn format(&self, time: SimTime) -> String {
        self.format_units(time.as_f64())
    }

    /// Format a raw offset in time units as `HH:MM`, wrapping past midnight
    pub fn format_units(&self, offset_units: f64) -> String {
        let minutes_total =
            f64::from(self.start_hour) * 60.0 + offset_units * f64::from(self.minutes_per_unit);
        let hours = (minutes_total / 60.0).floor() as u64 % 24;
        let minutes = (minutes_total % 60.0).floor() as u64;
        format!("{:02}:{:02}", hours, minutes)
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new(9, 1)
    }
}
