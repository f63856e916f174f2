//! Tests for the Environment run loop
//!
//! Horizon handling, joins, failure propagation and fatal aborts.

use checkout_sim_core::{
    Context, Environment, ProcessState, ResultLog, ResultRecord, SimTime,
    SimulationError, Step, Wake,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn t(v: f64) -> SimTime {
    SimTime::new(v).unwrap()
}

fn record(name: &str, at: SimTime) -> ResultRecord {
    ResultRecord {
        customer: name.to_string(),
        enter_time: at,
        shopping_time: at,
        start_queue: at,
        checkout_start: at,
        paying_time: at,
        packing_time: at,
        leave_time: at,
        checkout_choice_regular: true,
    }
}

/// A process that completes with `value` after `delay`
fn sleeper(
    delay: f64,
    value: u32,
) -> impl FnMut(&mut Context<'_, u32>, Wake<u32>) -> Result<Step<u32>, SimulationError> {
    move |_ctx, wake| match wake {
        Wake::Start => Ok(Step::Timeout(delay)),
        Wake::Timeout => Ok(Step::Complete(value)),
        other => Err(SimulationError::ProcessFailed(other.label())),
    }
}

// ============================================================================
// Horizon
// ============================================================================

#[test]
fn test_zero_horizon_rejected_before_any_event() {
    let mut env: Environment<SimTime> = Environment::with_seed(1);
    let results = ResultLog::new();
    let log = results.clone();
    env.spawn_fn("writer", move |ctx, _wake| {
        log.push(record("Customer 1", ctx.now()));
        Ok(Step::Complete(ctx.now()))
    });

    assert!(matches!(
        env.run(0.0),
        Err(SimulationError::InvalidConfiguration(_))
    ));
    assert_eq!(env.events_processed(), 0);
    assert!(results.is_empty());
    assert!(!env.is_halted());
}

#[test]
fn test_events_beyond_horizon_never_run() {
    let mut env: Environment<()> = Environment::with_seed(1);
    let ticks = Rc::new(RefCell::new(Vec::new()));
    let log = ticks.clone();

    env.spawn_fn("ticker", move |ctx, _wake| {
        log.borrow_mut().push(ctx.now().as_f64());
        Ok(Step::Timeout(2.5))
    });

    let summary = env.run(10.0).unwrap();
    assert_eq!(*ticks.borrow(), vec![0.0, 2.5, 5.0, 7.5, 10.0]);
    assert_eq!(summary.final_time, t(10.0));
    assert_eq!(summary.pending_events, 1);
    assert_eq!(summary.live_processes, 1);
}

#[test]
fn test_run_continues_from_previous_horizon() {
    let mut env: Environment<()> = Environment::with_seed(1);
    let count = Rc::new(Cell::new(0u32));
    let seen = count.clone();

    env.spawn_fn("ticker", move |_ctx, _wake| {
        seen.set(seen.get() + 1);
        Ok(Step::Timeout(1.0))
    });

    env.run(3.5).unwrap();
    assert_eq!(count.get(), 4);
    env.run(5.0).unwrap();
    assert_eq!(count.get(), 6);
    assert_eq!(env.events_processed(), 6);
}

#[test]
fn test_spawn_returns_before_child_runs() {
    let mut env: Environment<()> = Environment::with_seed(1);
    let started = Rc::new(Cell::new(false));
    let flag = started.clone();

    let pid = env.spawn_fn("lazy", move |_ctx, _wake| {
        flag.set(true);
        Ok(Step::Complete(()))
    });
    assert!(!started.get());
    assert_eq!(env.process_state(pid), Some(ProcessState::Runnable));

    env.run(1.0).unwrap();
    assert!(started.get());
    assert_eq!(env.process_state(pid), Some(ProcessState::Completed));
    assert!(matches!(env.take_outcome(pid), Some(Ok(()))));
}

// ============================================================================
// Joins
// ============================================================================

#[test]
fn test_join_delivers_child_value() {
    let mut env: Environment<u32> = Environment::with_seed(1);
    let got = Rc::new(RefCell::new(None));
    let slot = got.clone();

    env.spawn_fn("parent", move |ctx, wake| match wake {
        Wake::Start => Ok(Step::Join(ctx.spawn("child", sleeper(2.0, 7)))),
        Wake::Joined { outcome, .. } => {
            *slot.borrow_mut() = Some((ctx.now().as_f64(), outcome?));
            Ok(Step::Complete(0))
        }
        other => Err(SimulationError::ProcessFailed(other.label())),
    });

    env.run(10.0).unwrap();
    assert_eq!(*got.borrow(), Some((2.0, 7)));
}

#[test]
fn test_child_failure_reaches_joiner() {
    let mut env: Environment<u32> = Environment::with_seed(1);

    let parent = env.spawn_fn("parent", move |ctx, wake| match wake {
        Wake::Start => {
            let child = ctx.spawn(
                "child",
                |_ctx: &mut Context<'_, u32>, _wake: Wake<u32>| -> Result<Step<u32>, SimulationError> {
                    Err(SimulationError::ProcessFailed("out of stock".to_string()))
                },
            );
            Ok(Step::Join(child))
        }
        Wake::Joined { outcome, .. } => {
            let err = outcome.unwrap_err();
            assert!(matches!(err, SimulationError::SubProcessFailure { .. }));
            Err(err)
        }
        other => Err(SimulationError::ProcessFailed(other.label())),
    });

    env.run(1.0).unwrap();
    assert_eq!(env.process_state(parent), Some(ProcessState::Failed));

    // Only the unjoined parent is recorded; the child's failure went to it
    let failures = env.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "parent");
    assert!(failures[0].error.contains("out of stock"));
}

#[test]
fn test_join_already_finished_child() {
    let mut env: Environment<u32> = Environment::with_seed(1);
    let got = Rc::new(Cell::new(None));
    let slot = got.clone();
    let child_pid = Rc::new(Cell::new(None));
    let child_slot = child_pid.clone();

    env.spawn_fn("parent", move |ctx, wake| match wake {
        Wake::Start => {
            child_slot.set(Some(ctx.spawn("quick", sleeper(0.0, 3))));
            Ok(Step::Timeout(5.0))
        }
        Wake::Timeout => match child_slot.get() {
            Some(child) => Ok(Step::Join(child)),
            None => Err(SimulationError::ProcessFailed("no child".to_string())),
        },
        Wake::Joined { outcome, .. } => {
            slot.set(Some((ctx.now().as_f64(), outcome?)));
            Ok(Step::Complete(0))
        }
        other => Err(SimulationError::ProcessFailed(other.label())),
    });

    env.run(10.0).unwrap();
    assert_eq!(got.get(), Some((5.0, 3)));
    assert_eq!(
        env.process_state(child_pid.get().unwrap()),
        Some(ProcessState::Completed)
    );
}

#[test]
fn test_second_joiner_conflicts() {
    let mut env: Environment<u32> = Environment::with_seed(1);
    let child = env.spawn("child", sleeper(4.0, 1));

    let first = env.spawn_fn("first", move |_ctx, wake| match wake {
        Wake::Start => Ok(Step::Join(child)),
        Wake::Joined { outcome, .. } => Ok(Step::Complete(outcome?)),
        other => Err(SimulationError::ProcessFailed(other.label())),
    });
    let second = env.spawn_fn("second", move |_ctx, wake| match wake {
        Wake::Start => Ok(Step::Join(child)),
        _ => Ok(Step::Complete(0)),
    });

    env.run(10.0).unwrap();
    assert!(matches!(env.take_outcome(first), Some(Ok(1))));
    assert_eq!(env.process_state(second), Some(ProcessState::Failed));
    assert!(env.failures()[0].error.contains("already joined"));
}

// ============================================================================
// Fatal errors
// ============================================================================

#[test]
fn test_invariant_violation_aborts_run_keeping_records() {
    let mut env: Environment<SimTime> = Environment::with_seed(1);
    let counter = env.add_resource("regular", 1).unwrap();
    let results = ResultLog::new();
    let late_ran = Rc::new(Cell::new(false));

    let log = results.clone();
    env.spawn_fn("Customer 1", move |ctx, wake| match wake {
        Wake::Start => Ok(Step::Timeout(1.0)),
        _ => {
            log.push(record("Customer 1", ctx.now()));
            Ok(Step::Complete(ctx.now()))
        }
    });
    env.spawn_fn("rogue", move |ctx, wake| match wake {
        Wake::Start => Ok(Step::Timeout(2.0)),
        _ => {
            // Releasing a unit never granted
            ctx.release(counter)?;
            Ok(Step::Complete(ctx.now()))
        }
    });
    let flag = late_ran.clone();
    env.spawn_fn("late", move |ctx, wake| match wake {
        Wake::Start => Ok(Step::Timeout(3.0)),
        _ => {
            flag.set(true);
            Ok(Step::Complete(ctx.now()))
        }
    });

    let err = env.run(10.0).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::ResourceInvariantViolation { .. }
    ));
    assert!(env.is_halted());
    assert!(!late_ran.get());
    assert_eq!(env.now(), t(2.0));
    assert_eq!(results.len(), 1);
    assert_eq!(results.snapshot()[0].customer, "Customer 1");

    assert!(matches!(env.run(20.0), Err(SimulationError::Halted)));
    assert!(!late_ran.get());
}

#[test]
fn test_negative_timeout_fails_process_only() {
    let mut env: Environment<()> = Environment::with_seed(1);
    let pid = env.spawn_fn("backwards", |_ctx, _wake| Ok(Step::Timeout(-1.0)));

    env.run(1.0).unwrap();
    assert_eq!(env.process_state(pid), Some(ProcessState::Failed));
    assert!(env.failures()[0].error.contains("delay"));
    assert!(!env.is_halted());
}

#[test]
fn test_late_join_claims_unjoined_failure() {
    let mut env: Environment<u32> = Environment::with_seed(1);
    let child = env.spawn_fn("child", |_ctx, _wake| {
        Err(SimulationError::ProcessFailed("out of stock".to_string()))
    });

    let parent = env.spawn_fn("parent", move |_ctx, wake| match wake {
        Wake::Start => Ok(Step::Timeout(2.0)),
        Wake::Timeout => Ok(Step::Join(child)),
        Wake::Joined { outcome, .. } => Ok(Step::Complete(outcome?)),
        other => Err(SimulationError::ProcessFailed(other.label())),
    });

    // Child fails at t=0 with nobody joining it yet
    env.run(1.0).unwrap();
    assert_eq!(env.failures().len(), 1);
    assert_eq!(env.failures()[0].name, "child");

    // The join at t=2 hands the failure to the parent, which re-raises it
    let summary = env.run(5.0).unwrap();
    assert_eq!(env.process_state(parent), Some(ProcessState::Failed));
    let names: Vec<&str> = env.failures().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["parent"]);
    assert!(env.failures()[0].error.contains("out of stock"));
    assert_eq!(summary.failed_processes, 1);
}

#[test]
fn test_late_join_of_completed_child_keeps_failures_empty() {
    let mut env: Environment<u32> = Environment::with_seed(1);
    let child = env.spawn("child", sleeper(0.0, 9));
    env.spawn_fn("parent", move |_ctx, wake| match wake {
        Wake::Start => Ok(Step::Timeout(1.0)),
        Wake::Timeout => Ok(Step::Join(child)),
        Wake::Joined { outcome, .. } => Ok(Step::Complete(outcome?)),
        other => Err(SimulationError::ProcessFailed(other.label())),
    });

    env.run(5.0).unwrap();
    assert!(env.failures().is_empty());
}
