//! Python bindings
//!
//! Exposes store runs and sweeps to Python as JSON-in/JSON-out functions.
//! Only compiled with the `python` feature.

pub mod scenario;

use pyo3::prelude::*;

/// Module entry point for `import checkout_sim_core`
#[pymodule]
fn checkout_sim_core(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(scenario::run_scenario, m)?)?;
    m.add_function(wrap_pyfunction!(scenario::run_sweep_json, m)?)?;
    Ok(())
}
