//! A single named step of a customer's visit
//!
//! Every milestone in the customer flow is an `Activity` sub-process that the
//! customer joins. It completes with the virtual time at which it ended:
//! immediately for markers (duration 0), after the duration otherwise.

use crate::core::error::SimulationError;
use crate::core::time::SimTime;
use crate::models::process::{Process, Step, Wake};
use crate::orchestrator::Context;
use tracing::debug;

/// A timed or instantaneous activity performed by one customer
#[derive(Debug, Clone)]
pub struct Activity {
    customer: String,
    label: &'static str,
    duration: u32,
}

impl Activity {
    pub fn new(customer: impl Into<String>, label: &'static str, duration: u32) -> Self {
        Self {
            customer: customer.into(),
            label,
            duration,
        }
    }

    /// Zero-duration marker (entering, queueing, checkout, leaving)
    pub fn marker(customer: impl Into<String>, label: &'static str) -> Self {
        Self::new(customer, label, 0)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }
}

impl Process<SimTime> for Activity {
    fn resume(
        &mut self,
        ctx: &mut Context<'_, SimTime>,
        wake: Wake<SimTime>,
    ) -> Result<Step<SimTime>, SimulationError> {
        match wake {
            Wake::Start if self.duration == 0 => {
                debug!(customer = %self.customer, at = %ctx.now(), "doing {}", self.label);
                Ok(Step::Complete(ctx.now()))
            }
            Wake::Start => {
                debug!(customer = %self.customer, at = %ctx.now(), "doing {} starts", self.label);
                Ok(Step::Timeout(f64::from(self.duration)))
            }
            Wake::Timeout => {
                debug!(customer = %self.customer, at = %ctx.now(), "doing {} ends", self.label);
                Ok(Step::Complete(ctx.now()))
            }
            other => Err(SimulationError::UnexpectedWake {
                process: format!("{} {}", self.customer, self.label),
                wake: other.label(),
            }),
        }
    }
}
