//! Replay properties over arbitrary failure points

use continuity::{ContinuityConfig, Endpoint, IdempotencyClass, Outcome, ResilientExecutor, Value};
use continuity_sim::{BreakMode, SimBackend};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

fn run_upserts(keys: &[i64], fault: Option<(u64, BreakMode)>) -> (SimBackend, Vec<Outcome>) {
    let backend = SimBackend::new();
    if let Some((nth, mode)) = fault {
        backend.break_execution(nth, mode);
    }
    let executor = ResilientExecutor::builder(backend.connector())
        .endpoint(Endpoint::new("primary", 1521))
        .config(ContinuityConfig::new().backoff(Duration::from_millis(1), Duration::from_millis(5)))
        .build()
        .unwrap();

    let tickets: Vec<_> = keys
        .iter()
        .map(|&key| {
            executor
                .enqueue(
                    "MERGE",
                    vec![Value::I64(key), Value::from(format!("v{}", key))],
                    IdempotencyClass::Idempotent,
                )
                .unwrap()
        })
        .collect();
    let outcomes = tickets
        .iter()
        .map(|t| t.wait(None).unwrap().outcome)
        .collect();
    (backend, outcomes)
}

fn break_mode() -> impl Strategy<Value = BreakMode> {
    prop_oneof![Just(BreakMode::BeforeApply), Just(BreakMode::AfterApply)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// An injected link failure anywhere leaves the same final state as none
    #[test]
    fn prop_idempotent_replay_converges(
        keys in prop::collection::vec(0i64..20, 1..8),
        at in 0usize..8,
        mode in break_mode(),
    ) {
        let nth = (at % keys.len()) as u64 + 1;
        let (baseline, _) = run_upserts(&keys, None);
        let (faulted, outcomes) = run_upserts(&keys, Some((nth, mode)));

        prop_assert!(outcomes.iter().all(|o| *o == Outcome::Committed));
        let expected: BTreeMap<_, _> = baseline.rows();
        prop_assert_eq!(faulted.rows(), expected);
    }

    /// Unsafe operations are executed at most once, whatever the failure
    #[test]
    fn prop_unsafe_never_reexecuted(
        count in 1u64..6,
        at in 0u64..6,
        mode in break_mode(),
    ) {
        let nth = at % count + 1;
        let backend = SimBackend::new();
        backend.break_execution(nth, mode);
        let executor = ResilientExecutor::builder(backend.connector())
            .endpoint(Endpoint::new("primary", 1521))
            .config(ContinuityConfig::new().backoff(Duration::from_millis(1), Duration::from_millis(5)))
            .build()
            .unwrap();

        let mut unknown = 0;
        for _ in 0..count {
            let completion = executor
                .submit("UPDATE", vec![Value::from("hits")], IdempotencyClass::Unsafe)
                .unwrap();
            if completion.outcome == Outcome::Unknown {
                unknown += 1;
            }
        }

        prop_assert_eq!(unknown, 1);
        prop_assert_eq!(backend.execution_count(), count);
        let applied = match mode {
            BreakMode::BeforeApply => count - 1,
            BreakMode::AfterApply => count,
        };
        prop_assert_eq!(backend.counter("hits"), applied as i64);
    }
}
