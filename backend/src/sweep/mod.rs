//! Parameter sweep over store configurations
//!
//! Runs one independent simulation per point of the Cartesian product
//! `shopping_items_time × packing_items_time × capacity` and writes one CSV
//! file per point, named `supermarket_simulation_{sit}_{pit}_{cap}.csv`.
//!
//! # Key Principles
//!
//! 1. **Isolation**: every point gets a fresh environment and fresh counters;
//!    a failing point is reported and the sweep moves on
//! 2. **Determinism**: each point's seed is derived from the base seed and
//!    the point itself, so adding a point never changes another point's run

use crate::core::error::SimulationError;
use crate::core::time::WallClock;
use crate::customers::{run_store, ScenarioConfig, StoreRun};
use crate::output::{write_records_to_path, OutputError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Why a sweep point produced no output
#[derive(Debug, Error)]
pub enum SweepError {
    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

// ============================================================================
// Configuration
// ============================================================================

/// Sweep parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub shopping_items_time: Vec<u32>,
    pub packing_items_time: Vec<u32>,
    pub capacity: Vec<usize>,
    /// Opening hour; virtual time 0
    pub start_hour: u32,
    /// Closing hour; the horizon
    pub end_hour: u32,
    pub minutes_per_unit: u32,
    /// Base seed every point's seed is derived from
    pub seed: u64,
    pub output_dir: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            shopping_items_time: vec![20, 30],
            packing_items_time: vec![3, 15],
            capacity: vec![1, 2, 3],
            start_hour: 9,
            end_hour: 18,
            minutes_per_unit: 1,
            seed: 12345,
            output_dir: PathBuf::from("."),
        }
    }
}

impl SweepConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, OutputError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// # Errors
    /// `InvalidConfiguration` for empty parameter lists or a non-positive
    /// opening window.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.shopping_items_time.is_empty()
            || self.packing_items_time.is_empty()
            || self.capacity.is_empty()
        {
            return Err(SimulationError::InvalidConfiguration(
                "every sweep dimension needs at least one value".to_string(),
            ));
        }
        if self.end_hour <= self.start_hour {
            return Err(SimulationError::InvalidConfiguration(format!(
                "end_hour {} must be after start_hour {}",
                self.end_hour, self.start_hour
            )));
        }
        if self.minutes_per_unit == 0 {
            return Err(SimulationError::InvalidConfiguration(
                "minutes_per_unit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Opening window in virtual time units
    ///
    /// Only meaningful for a config that passes [`validate`](Self::validate).
    ///
    /// # Example
    /// ```
    /// use checkout_sim_core::sweep::SweepConfig;
    ///
    /// assert_eq!(SweepConfig::default().horizon(), 540.0);
    /// ```
    pub fn horizon(&self) -> f64 {
        let minutes = (f64::from(self.end_hour) - f64::from(self.start_hour)) * 60.0;
        minutes / f64::from(self.minutes_per_unit)
    }

    pub fn clock(&self) -> WallClock {
        WallClock::new(self.start_hour, self.minutes_per_unit)
    }

    /// All points, shopping time outermost and capacity innermost
    pub fn points(&self) -> Vec<SweepPoint> {
        let mut points = Vec::new();
        for &shopping_items_time in &self.shopping_items_time {
            for &packing_items_time in &self.packing_items_time {
                for &capacity in &self.capacity {
                    points.push(SweepPoint {
                        shopping_items_time,
                        packing_items_time,
                        capacity,
                    });
                }
            }
        }
        points
    }

    /// Scenario for one point, with its derived seed
    pub fn scenario(&self, point: &SweepPoint) -> ScenarioConfig {
        ScenarioConfig {
            shopping_items_time: point.shopping_items_time,
            packing_items_time: point.packing_items_time,
            capacity: point.capacity,
            horizon: self.horizon(),
            seed: point.derive_seed(self.seed),
        }
    }
}

/// One combination of sweep parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub shopping_items_time: u32,
    pub packing_items_time: u32,
    pub capacity: usize,
}

impl SweepPoint {
    /// Output file name for this point
    ///
    /// # Example
    /// ```
    /// use checkout_sim_core::sweep::SweepPoint;
    ///
    /// let point = SweepPoint { shopping_items_time: 20, packing_items_time: 3, capacity: 2 };
    /// assert_eq!(point.file_name(), "supermarket_simulation_20_3_2.csv");
    /// ```
    pub fn file_name(&self) -> String {
        format!(
            "supermarket_simulation_{}_{}_{}.csv",
            self.shopping_items_time, self.packing_items_time, self.capacity
        )
    }

    /// Seed for this point: first 8 bytes of SHA-256 over the base seed and
    /// the three parameters
    pub fn derive_seed(&self, base_seed: u64) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(base_seed.to_le_bytes());
        hasher.update(self.shopping_items_time.to_le_bytes());
        hasher.update(self.packing_items_time.to_le_bytes());
        hasher.update((self.capacity as u64).to_le_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

// ============================================================================
// Running
// ============================================================================

/// Summary of one successful point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointDigest {
    pub file: PathBuf,
    pub seed: u64,
    pub customers_arrived: u64,
    pub customers_completed: usize,
    pub events_processed: u64,
    pub failed_processes: usize,
    pub mean_queue_wait: Option<f64>,
}

impl PointDigest {
    fn new(file: PathBuf, seed: u64, run: &StoreRun) -> Self {
        let waits: Vec<f64> = run.records.iter().map(|r| r.queue_wait()).collect();
        let mean_queue_wait = if waits.is_empty() {
            None
        } else {
            Some(waits.iter().sum::<f64>() / waits.len() as f64)
        };

        Self {
            file,
            seed,
            customers_arrived: run.customers_arrived,
            customers_completed: run.records.len(),
            events_processed: run.summary.events_processed,
            failed_processes: run.failures.len(),
            mean_queue_wait,
        }
    }
}

/// Outcome of one point; `error` is set when it failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOutcome {
    pub point: SweepPoint,
    pub digest: Option<PointDigest>,
    pub error: Option<String>,
}

/// Outcome of a whole sweep, in point order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub outcomes: Vec<PointOutcome>,
}

impl SweepReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &PointOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

/// Run and write a single point
pub fn run_point(config: &SweepConfig, point: &SweepPoint) -> Result<PointDigest, SweepError> {
    config.validate()?;
    let scenario = config.scenario(point);
    let run = run_store(&scenario)?;

    let file = config.output_dir.join(point.file_name());
    write_records_to_path(&file, &run.records, &config.clock())?;
    Ok(PointDigest::new(file, scenario.seed, &run))
}

/// Run every point; failures are logged and reported, never fatal to the
/// sweep
///
/// # Errors
/// `InvalidConfiguration` if the sweep itself is malformed (nothing runs).
pub fn run_sweep(config: &SweepConfig) -> Result<SweepReport, SimulationError> {
    config.validate()?;

    let mut report = SweepReport::default();
    for point in config.points() {
        let outcome = match run_point(config, &point) {
            Ok(digest) => {
                info!(
                    shopping_items_time = point.shopping_items_time,
                    packing_items_time = point.packing_items_time,
                    capacity = point.capacity,
                    completed = digest.customers_completed,
                    "sweep point finished"
                );
                PointOutcome {
                    point,
                    digest: Some(digest),
                    error: None,
                }
            }
            Err(e) => {
                error!(
                    shopping_items_time = point.shopping_items_time,
                    packing_items_time = point.packing_items_time,
                    capacity = point.capacity,
                    error = %e,
                    "sweep point failed"
                );
                PointOutcome {
                    point,
                    digest: None,
                    error: Some(e.to_string()),
                }
            }
        };
        report.outcomes.push(outcome);
    }

    Ok(report)
}
