//! The customer process
//!
//! ```text
//! Enter → Shop → Queue → choose {regular, self-checkout} → acquire counter
//!       → Checkout → Pay → Pack → Leave → release counter → 0.5 delay → record
//! ```
//!
//! Each arrow is a joined [`Activity`]; the value it returns is stored as
//! the matching milestone. Random draws happen in this order, from the
//! environment's RNG: shopping duration (after entering), checkout choice
//! (after queueing), paying duration (after checkout), packing duration
//! (after paying).

use crate::core::error::SimulationError;
use crate::core::time::SimTime;
use crate::customers::activity::Activity;
use crate::models::process::{Process, ProcessId, Step, Wake};
use crate::models::record::{ResultLog, ResultRecord};
use crate::models::resource::ResourceId;
use crate::orchestrator::Context;
use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Pause between leaving the counter and the record being written
pub const EXIT_DELAY: f64 = 0.5;

/// Longest paying step, in time units
pub const MAX_PAYING_TIME: u32 = 5;

/// The two counters of a store and the duration limits of its customers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLayout {
    pub regular: ResourceId,
    pub self_checkout: ResourceId,
    /// Upper bound of the shopping duration draw
    pub shopping_items_time: u32,
    /// Upper bound of the packing duration draw
    pub packing_items_time: u32,
}

/// Fixed choices for one customer, replacing the random draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerPlan {
    pub shopping: u32,
    pub regular: bool,
    pub paying: u32,
    pub packing: u32,
}

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Random,
    Scripted(CustomerPlan),
}

impl Behavior {
    fn shopping(&self, rng: &mut RngManager, layout: &StoreLayout) -> u32 {
        match self {
            Behavior::Random => rng.uniform_inclusive(1, layout.shopping_items_time),
            Behavior::Scripted(plan) => plan.shopping,
        }
    }

    fn regular(&self, rng: &mut RngManager) -> bool {
        match self {
            Behavior::Random => rng.uniform_inclusive(1, 2) == 1,
            Behavior::Scripted(plan) => plan.regular,
        }
    }

    fn paying(&self, rng: &mut RngManager) -> u32 {
        match self {
            Behavior::Random => rng.uniform_inclusive(1, MAX_PAYING_TIME),
            Behavior::Scripted(plan) => plan.paying,
        }
    }

    fn packing(&self, rng: &mut RngManager, layout: &StoreLayout) -> u32 {
        match self {
            Behavior::Random => rng.uniform_inclusive(1, layout.packing_items_time),
            Behavior::Scripted(plan) => plan.packing,
        }
    }
}

/// Where the customer is in its visit; each variant names what it waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Arriving,
    Entering,
    Shopping,
    Queueing,
    Acquiring(ResourceId),
    Checkout(ResourceId),
    Paying(ResourceId),
    Packing(ResourceId),
    Leaving(ResourceId),
    Departing,
    Done,
}

#[derive(Debug, Default, Clone, Copy)]
struct Milestones {
    enter: Option<SimTime>,
    shopping: Option<SimTime>,
    queue: Option<SimTime>,
    checkout: Option<SimTime>,
    paying: Option<SimTime>,
    packing: Option<SimTime>,
    leave: Option<SimTime>,
}

/// One shopper, from entering the store to the written result record
#[derive(Debug)]
pub struct Customer {
    name: String,
    layout: StoreLayout,
    behavior: Behavior,
    results: ResultLog,
    stage: Stage,
    milestones: Milestones,
    regular: bool,
}

impl Customer {
    /// A customer whose durations and checkout choice are drawn at random
    pub fn new(name: impl Into<String>, layout: StoreLayout, results: ResultLog) -> Self {
        Self::with_behavior(name, layout, results, Behavior::Random)
    }

    /// A customer following `plan` instead of drawing
    pub fn scripted(
        name: impl Into<String>,
        layout: StoreLayout,
        results: ResultLog,
        plan: CustomerPlan,
    ) -> Self {
        Self::with_behavior(name, layout, results, Behavior::Scripted(plan))
    }

    fn with_behavior(
        name: impl Into<String>,
        layout: StoreLayout,
        results: ResultLog,
        behavior: Behavior,
    ) -> Self {
        Self {
            name: name.into(),
            layout,
            behavior,
            results,
            stage: Stage::Arriving,
            milestones: Milestones::default(),
            regular: false,
        }
    }

    fn start_activity(
        &self,
        ctx: &mut Context<'_, SimTime>,
        label: &'static str,
        duration: u32,
    ) -> Step<SimTime> {
        self.join(ctx, Activity::new(self.name.clone(), label, duration))
    }

    fn start_marker(&self, ctx: &mut Context<'_, SimTime>, label: &'static str) -> Step<SimTime> {
        self.join(ctx, Activity::marker(self.name.clone(), label))
    }

    fn join(&self, ctx: &mut Context<'_, SimTime>, activity: Activity) -> Step<SimTime> {
        let child: ProcessId = ctx.spawn(format!("{} {}", self.name, activity.label()), activity);
        Step::Join(child)
    }

    fn unexpected(&self, wake: &Wake<SimTime>) -> SimulationError {
        SimulationError::UnexpectedWake {
            process: format!("{} ({:?})", self.name, self.stage),
            wake: wake.label(),
        }
    }

    fn record(&self) -> Result<ResultRecord, SimulationError> {
        let missing = |what: &str| {
            SimulationError::ProcessFailed(format!("{} has no {} milestone", self.name, what))
        };
        let m = &self.milestones;
        Ok(ResultRecord {
            customer: self.name.clone(),
            enter_time: m.enter.ok_or_else(|| missing("enter"))?,
            shopping_time: m.shopping.ok_or_else(|| missing("shopping"))?,
            start_queue: m.queue.ok_or_else(|| missing("queue"))?,
            checkout_start: m.checkout.ok_or_else(|| missing("checkout"))?,
            paying_time: m.paying.ok_or_else(|| missing("paying"))?,
            packing_time: m.packing.ok_or_else(|| missing("packing"))?,
            leave_time: m.leave.ok_or_else(|| missing("leave"))?,
            checkout_choice_regular: self.regular,
        })
    }
}

impl Process<SimTime> for Customer {
    fn resume(
        &mut self,
        ctx: &mut Context<'_, SimTime>,
        wake: Wake<SimTime>,
    ) -> Result<Step<SimTime>, SimulationError> {
        let (stage, outcome) = match (self.stage, wake) {
            (Stage::Arriving, Wake::Start) => {
                self.stage = Stage::Entering;
                return Ok(self.start_marker(ctx, "entering"));
            }
            (Stage::Acquiring(counter), Wake::Granted(granted)) if granted == counter => {
                let label = if self.regular { "checkout" } else { "self-checkout" };
                self.stage = Stage::Checkout(counter);
                return Ok(self.start_marker(ctx, label));
            }
            (Stage::Departing, Wake::Timeout) => {
                self.results.push(self.record()?);
                self.stage = Stage::Done;
                debug!(customer = %self.name, at = %ctx.now(), "result recorded");
                let leave = self.milestones.leave.unwrap_or_else(|| ctx.now());
                return Ok(Step::Complete(leave));
            }
            // Every other transition is the end of a joined activity
            (stage, Wake::Joined { outcome, .. }) => (stage, outcome),
            (_, wake) => return Err(self.unexpected(&wake)),
        };
        let at = outcome?;

        match stage {
            Stage::Entering => {
                self.milestones.enter = Some(at);
                let shopping = self.behavior.shopping(ctx.rng(), &self.layout);
                self.stage = Stage::Shopping;
                Ok(self.start_activity(ctx, "shopping", shopping))
            }
            Stage::Shopping => {
                self.milestones.shopping = Some(at);
                self.stage = Stage::Queueing;
                Ok(self.start_marker(ctx, "queueing"))
            }
            Stage::Queueing => {
                self.milestones.queue = Some(at);
                self.regular = self.behavior.regular(ctx.rng());
                let counter = if self.regular {
                    self.layout.regular
                } else {
                    self.layout.self_checkout
                };
                self.stage = Stage::Acquiring(counter);
                Ok(Step::Request(counter))
            }
            Stage::Checkout(counter) => {
                self.milestones.checkout = Some(at);
                let paying = self.behavior.paying(ctx.rng());
                self.stage = Stage::Paying(counter);
                Ok(self.start_activity(ctx, "paying", paying))
            }
            Stage::Paying(counter) => {
                self.milestones.paying = Some(at);
                let packing = self.behavior.packing(ctx.rng(), &self.layout);
                self.stage = Stage::Packing(counter);
                Ok(self.start_activity(ctx, "packing", packing))
            }
            Stage::Packing(counter) => {
                self.milestones.packing = Some(at);
                self.stage = Stage::Leaving(counter);
                Ok(self.start_marker(ctx, "leaving"))
            }
            Stage::Leaving(counter) => {
                self.milestones.leave = Some(at);
                ctx.release(counter)?;
                self.stage = Stage::Departing;
                Ok(Step::Timeout(EXIT_DELAY))
            }
            Stage::Arriving | Stage::Acquiring(_) | Stage::Departing | Stage::Done => {
                Err(SimulationError::UnexpectedWake {
                    process: format!("{} ({:?})", self.name, stage),
                    wake: "joined".to_string(),
                })
            }
        }
    }
}
