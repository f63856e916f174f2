//! Customer flow tests
//!
//! Scripted customers pin exact timestamps; full store runs check the
//! properties every run must satisfy.

use checkout_sim_core::customers::{build_store, Activity, EXIT_DELAY};
use checkout_sim_core::{
    run_store, Customer, CustomerPlan, Environment, ProcessState, ResultLog, ResultRecord,
    ScenarioConfig, SimTime, SimulationError, StoreLayout,
};

fn store(capacity: usize) -> (Environment<SimTime>, StoreLayout) {
    let mut env: Environment<SimTime> = Environment::with_seed(7);
    let config = ScenarioConfig {
        capacity,
        ..Default::default()
    };
    let layout = build_store(&mut env, &config).unwrap();
    (env, layout)
}

fn plan(shopping: u32, regular: bool, paying: u32, packing: u32) -> CustomerPlan {
    CustomerPlan {
        shopping,
        regular,
        paying,
        packing,
    }
}

fn times(record: &ResultRecord) -> [f64; 7] {
    [
        record.enter_time.as_f64(),
        record.shopping_time.as_f64(),
        record.start_queue.as_f64(),
        record.checkout_start.as_f64(),
        record.paying_time.as_f64(),
        record.packing_time.as_f64(),
        record.leave_time.as_f64(),
    ]
}

// ============================================================================
// Scripted customers
// ============================================================================

#[test]
fn test_single_customer_timeline() {
    let (mut env, layout) = store(1);
    let results = ResultLog::new();
    let pid = env.spawn(
        "Customer 1",
        Customer::scripted("Customer 1", layout, results.clone(), plan(12, true, 3, 2)),
    );

    env.run(60.0).unwrap();

    let records = results.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].customer, "Customer 1");
    assert_eq!(times(&records[0]), [0.0, 12.0, 12.0, 12.0, 15.0, 17.0, 17.0]);
    assert!(records[0].checkout_choice_regular);
    assert_eq!(env.process_state(pid), Some(ProcessState::Completed));
    assert_eq!(env.take_outcome(pid).unwrap().unwrap().as_f64(), 17.0);
}

/// Capacity 1, both regular, requests at t=1 and t=3: the second customer
/// starts checkout exactly when the first releases the counter
#[test]
fn test_second_customer_starts_at_first_release() {
    let (mut env, layout) = store(1);
    let results = ResultLog::new();
    env.spawn(
        "Customer 1",
        Customer::scripted("Customer 1", layout, results.clone(), plan(1, true, 2, 3)),
    );
    env.spawn(
        "Customer 2",
        Customer::scripted("Customer 2", layout, results.clone(), plan(3, true, 2, 3)),
    );

    env.run(60.0).unwrap();

    let records = results.snapshot();
    assert_eq!(records.len(), 2);
    let (first, second) = (&records[0], &records[1]);
    assert_eq!(first.customer, "Customer 1");
    assert_eq!(second.customer, "Customer 2");

    assert_eq!(times(first), [0.0, 1.0, 1.0, 1.0, 3.0, 6.0, 6.0]);
    assert_eq!(second.start_queue.as_f64(), 3.0);
    assert_eq!(second.checkout_start, first.leave_time);
    assert_eq!(times(second), [0.0, 3.0, 3.0, 6.0, 8.0, 11.0, 11.0]);
    assert_eq!(second.queue_wait(), 3.0);

    let regular = env.resource(layout.regular).unwrap();
    assert_eq!(regular.active(), 0);
    assert_eq!(regular.stats().peak_active, 1);
    assert_eq!(regular.stats().queued, 1);
}

#[test]
fn test_self_checkout_has_double_capacity() {
    let (mut env, layout) = store(1);
    let results = ResultLog::new();
    for n in 1..=2 {
        let name = format!("Customer {}", n);
        env.spawn(
            name.clone(),
            Customer::scripted(name, layout, results.clone(), plan(2, false, 4, 1)),
        );
    }

    env.run(60.0).unwrap();

    let records = results.snapshot();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(!record.checkout_choice_regular);
        assert_eq!(record.checkout_start.as_f64(), 2.0);
        assert_eq!(record.leave_time.as_f64(), 7.0);
    }
    assert_eq!(env.resource(layout.regular).unwrap().stats().grants, 0);
    assert_eq!(env.resource(layout.self_checkout).unwrap().stats().peak_active, 2);
}

#[test]
fn test_record_written_after_exit_delay() {
    let (mut env, layout) = store(1);
    let results = ResultLog::new();
    env.spawn(
        "Customer 1",
        Customer::scripted("Customer 1", layout, results.clone(), plan(1, true, 1, 1)),
    );

    // Leaves at 3, record due at 3 + EXIT_DELAY
    env.run(3.0).unwrap();
    assert!(results.is_empty());
    assert_eq!(env.resource(layout.regular).unwrap().active(), 0);

    env.run(3.0 + EXIT_DELAY).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn test_customer_past_horizon_leaves_no_record() {
    let (mut env, layout) = store(1);
    let results = ResultLog::new();
    env.spawn(
        "Customer 1",
        Customer::scripted("Customer 1", layout, results.clone(), plan(20, true, 5, 3)),
    );

    let summary = env.run(10.0).unwrap();
    assert!(results.is_empty());
    assert!(summary.live_processes > 0);
}

#[test]
fn test_activity_marker_completes_immediately() {
    let mut env: Environment<SimTime> = Environment::with_seed(1);
    let marker = env.spawn("Customer 1 queueing", Activity::marker("Customer 1", "queueing"));
    let timed = env.spawn("Customer 1 paying", Activity::new("Customer 1", "paying", 4));

    env.run(10.0).unwrap();
    assert_eq!(env.take_outcome(marker).unwrap().unwrap().as_f64(), 0.0);
    assert_eq!(env.take_outcome(timed).unwrap().unwrap().as_f64(), 4.0);
}

// ============================================================================
// Full store runs
// ============================================================================

fn day(capacity: usize, seed: u64) -> ScenarioConfig {
    ScenarioConfig {
        shopping_items_time: 30,
        packing_items_time: 15,
        capacity,
        horizon: 540.0,
        seed,
    }
}

#[test]
fn test_store_run_milestones_ordered_and_bounded() {
    let config = day(1, 11);
    let run = run_store(&config).unwrap();

    assert!(!run.records.is_empty());
    assert!(run.failures.is_empty());
    assert!(run.records.len() as u64 <= run.customers_arrived);
    // First arrival at 0, then gaps of 1..=5
    assert!(run.customers_arrived >= 108 && run.customers_arrived <= 541);

    for record in &run.records {
        let t = times(record);
        assert!(t.windows(2).all(|w| w[0] <= w[1]), "{:?}", record);
        assert!(t[6] + EXIT_DELAY <= config.horizon);

        let shopping = t[1] - t[0];
        let paying = t[4] - t[3];
        let packing = t[5] - t[4];
        assert!((1.0..=30.0).contains(&shopping));
        assert!((1.0..=5.0).contains(&paying));
        assert!((1.0..=15.0).contains(&packing));
    }
}

#[test]
fn test_store_run_respects_capacity() {
    for capacity in 1..=3 {
        let run = run_store(&day(capacity, 5)).unwrap();
        assert!(run.regular_stats.peak_active <= capacity);
        assert!(run.self_checkout_stats.peak_active <= 2 * capacity);

        // Reconstructed from the records: customers at a counter at once
        for (regular, limit) in [(true, capacity), (false, 2 * capacity)] {
            let at_counter: Vec<&ResultRecord> = run
                .records
                .iter()
                .filter(|r| r.checkout_choice_regular == regular)
                .collect();
            for probe in &at_counter {
                let now = probe.checkout_start;
                let busy = at_counter
                    .iter()
                    .filter(|r| r.checkout_start <= now && now < r.leave_time)
                    .count();
                assert!(busy <= limit, "{} busy at {} (limit {})", busy, now, limit);
            }
        }
    }
}

#[test]
fn test_store_run_serves_in_queue_order() {
    let run = run_store(&day(1, 3)).unwrap();

    for regular in [true, false] {
        let served: Vec<&ResultRecord> = run
            .records
            .iter()
            .filter(|r| r.checkout_choice_regular == regular)
            .collect();
        for a in &served {
            for b in &served {
                if a.start_queue < b.start_queue {
                    assert!(
                        a.checkout_start <= b.checkout_start,
                        "{} queued first but was served after {}",
                        a.customer,
                        b.customer
                    );
                }
            }
        }
    }
}

#[test]
fn test_invalid_scenario_rejected() {
    let config = ScenarioConfig {
        capacity: 0,
        ..Default::default()
    };
    assert!(run_store(&config).is_err());

    let config = ScenarioConfig {
        horizon: 0.0,
        ..Default::default()
    };
    assert!(run_store(&config).is_err());
}

#[test]
fn test_oversized_capacity_rejected_not_overflowed() {
    let config = ScenarioConfig {
        capacity: usize::MAX / 2 + 1,
        horizon: 5.0,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(SimulationError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        run_store(&config),
        Err(SimulationError::InvalidConfiguration(_))
    ));

    let mut env: Environment<SimTime> = Environment::with_seed(1);
    assert!(matches!(
        build_store(&mut env, &config),
        Err(SimulationError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_largest_doubling_capacity_accepted() {
    let config = ScenarioConfig {
        capacity: usize::MAX / 2,
        ..Default::default()
    };
    assert!(config.validate().is_ok());
}
