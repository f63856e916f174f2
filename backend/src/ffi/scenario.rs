//! JSON wrappers around [`run_store`] and [`run_sweep`]

use pyo3::prelude::*;

use crate::customers::{run_store, ScenarioConfig};
use crate::sweep::{run_sweep, SweepConfig};

fn value_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}: {}", context, e))
}

fn runtime_error(context: &str, e: impl std::fmt::Display) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}: {}", context, e))
}

/// Run one store scenario
///
/// # Example (from Python)
///
/// ```python
/// import json
/// from checkout_sim_core import run_scenario
///
/// run = json.loads(run_scenario(json.dumps({
///     "shopping_items_time": 20,
///     "packing_items_time": 3,
///     "capacity": 2,
///     "horizon": 540.0,
///     "seed": 7,
/// })))
/// print(len(run["records"]), "customers served")
/// ```
///
/// # Errors
///
/// Raises ValueError for malformed JSON or an invalid configuration, and
/// RuntimeError if the run aborts.
#[pyfunction]
pub fn run_scenario(config_json: &str) -> PyResult<String> {
    let config: ScenarioConfig =
        serde_json::from_str(config_json).map_err(|e| value_error("Invalid scenario", e))?;
    config
        .validate()
        .map_err(|e| value_error("Invalid scenario", e))?;

    let run = run_store(&config).map_err(|e| runtime_error("Simulation failed", e))?;
    serde_json::to_string(&run).map_err(|e| runtime_error("Serialization failed", e))
}

/// Run a sweep, writing one CSV per point; returns the sweep report
///
/// Fields missing from `config_json` take their defaults.
#[pyfunction]
pub fn run_sweep_json(config_json: &str) -> PyResult<String> {
    let config: SweepConfig =
        serde_json::from_str(config_json).map_err(|e| value_error("Invalid sweep", e))?;

    let report = run_sweep(&config).map_err(|e| value_error("Invalid sweep", e))?;
    serde_json::to_string(&report).map_err(|e| runtime_error("Serialization failed", e))
}
