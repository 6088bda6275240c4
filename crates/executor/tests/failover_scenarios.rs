//! Failover scenarios against the simulated backend
//!
//! Each test builds one executor over a fresh `SimBackend`, injects a fault
//! and checks both the caller-visible outcome and the backend's final state.

use continuity_core::{
    ContinuityConfig, Endpoint, FailureReason, IdempotencyClass, Outcome, Value,
};
use continuity_durability::read_journal;
use continuity_executor::{Error, ResilientExecutor};
use continuity_session::{CancelStatus, SessionState, StaticEndpoints};
use continuity_sim::{BreakMode, SimBackend};
use std::thread;
use std::time::{Duration, Instant};

const MERGE: &str = "MERGE INTO demo_tac_ac t USING (SELECT :id id, :note note FROM dual) s \
                     ON (t.id = s.id) WHEN NOT MATCHED THEN INSERT (id, note) VALUES (s.id, s.note)";

fn fast_config() -> ContinuityConfig {
    ContinuityConfig::new().backoff(Duration::from_millis(1), Duration::from_millis(10))
}

fn executor(backend: &SimBackend, config: ContinuityConfig) -> ResilientExecutor {
    ResilientExecutor::builder(backend.connector())
        .endpoint(Endpoint::new("primary", 1521))
        .config(config)
        .build()
        .unwrap()
}

fn upsert(key: i64) -> Vec<Value> {
    vec![Value::I64(key), Value::from(format!("note {}", key))]
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached");
        thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// Idempotent replay
// ============================================================================

#[test]
fn test_idempotent_upserts_survive_ambiguous_ack() {
    let backend = SimBackend::new();
    // Key 2 commits but its acknowledgement is lost
    backend.break_execution(2, BreakMode::AfterApply);
    let executor = executor(&backend, fast_config());

    let tickets: Vec<_> = (1..=3)
        .map(|key| {
            executor
                .enqueue(MERGE, upsert(key), IdempotencyClass::Idempotent)
                .unwrap()
        })
        .collect();

    for ticket in &tickets {
        let completion = ticket.wait(None).unwrap();
        assert_eq!(completion.outcome, Outcome::Committed);
    }
    let replayed = tickets[1].wait(None).unwrap();
    assert_eq!(replayed.attempts, 2);

    let rows = backend.rows();
    assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(rows.values().all(|row| row.writes == 1));

    let counters = executor.counters();
    assert_eq!(counters.disruptions, 1);
    assert_eq!(counters.replayed, 1);
    assert_eq!(counters.link_acquisitions, 2);
    assert_eq!(executor.last_committed(), 3);
}

#[test]
fn test_idempotent_replay_after_lost_request() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::BeforeApply);
    let executor = executor(&backend, fast_config());

    let completion = executor
        .submit(MERGE, upsert(7), IdempotencyClass::Idempotent)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Committed);
    assert_eq!(completion.rows_affected, Some(1));
    assert_eq!(backend.row(7).unwrap().writes, 1);
}

#[test]
fn test_switchover_loop() {
    let backend = SimBackend::new();
    let executor = executor(&backend, fast_config());

    for iteration in 1..=12 {
        if iteration % 3 == 0 {
            backend.switchover();
        }
        let completion = executor
            .submit(
                MERGE,
                vec![Value::I64(1001), Value::from(format!("iteration {}", iteration))],
                IdempotencyClass::Idempotent,
            )
            .unwrap();
        assert!(completion.is_committed());
    }

    let row = backend.row(1001).unwrap();
    assert_eq!(row.writes, 1);
    assert_eq!(row.values, vec![Value::from("iteration 1")]);
    assert_eq!(executor.counters().disruptions, 4);
    assert_eq!(backend.open_count(), 5);
}

// ============================================================================
// Unsafe and at-most-once
// ============================================================================

#[test]
fn test_unsafe_increment_is_not_replayed() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::AfterApply);
    let executor = executor(&backend, fast_config());

    let completion = executor
        .submit("UPDATE counters", vec![Value::from("hits")], IdempotencyClass::Unsafe)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Unknown);
    assert_eq!(backend.counter("hits"), 1);
    assert_eq!(backend.execution_count(), 1);

    // The session recovers and keeps serving
    let next = executor
        .submit("UPDATE counters", vec![Value::from("hits")], IdempotencyClass::Unsafe)
        .unwrap();
    assert!(next.is_committed());
    assert_eq!(backend.counter("hits"), 2);
    assert_eq!(executor.counters().unknown, 1);
}

#[test]
fn test_unsafe_lost_request_is_still_unknown() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::BeforeApply);
    let executor = executor(&backend, fast_config());

    let completion = executor
        .submit("UPDATE counters", vec![Value::from("hits")], IdempotencyClass::Unsafe)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Unknown);
    assert_eq!(backend.counter("hits"), 0);
}

#[test]
fn test_at_most_once_confirmed_committed() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::AfterApply);
    let executor = ResilientExecutor::builder(backend.connector())
        .endpoint(Endpoint::new("primary", 1521))
        .confirmation(backend.confirmation())
        .config(fast_config())
        .build()
        .unwrap();

    let completion = executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::AtMostOnce)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Committed);
    assert_eq!(completion.rows_affected, None);
    assert_eq!(backend.execution_count(), 1);
    assert_eq!(backend.row(1).unwrap().writes, 1);
}

#[test]
fn test_at_most_once_confirmed_not_committed() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::BeforeApply);
    let executor = ResilientExecutor::builder(backend.connector())
        .endpoint(Endpoint::new("primary", 1521))
        .confirmation(backend.confirmation())
        .config(fast_config())
        .build()
        .unwrap();

    let completion = executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::AtMostOnce)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Committed);
    assert_eq!(completion.attempts, 2);
    assert_eq!(backend.execution_count(), 2);
    assert_eq!(executor.counters().replayed, 1);
}

#[test]
fn test_at_most_once_degrades_when_confirmation_unavailable() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::AfterApply);
    backend.set_confirmation_available(false);
    let executor = ResilientExecutor::builder(backend.connector())
        .endpoint(Endpoint::new("primary", 1521))
        .confirmation(backend.confirmation())
        .config(fast_config())
        .build()
        .unwrap();

    let completion = executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::AtMostOnce)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Unknown);
    assert_eq!(backend.execution_count(), 1);
}

#[test]
fn test_at_most_once_without_confirmation_is_unknown() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::BeforeApply);
    let executor = executor(&backend, fast_config());

    let completion = executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::AtMostOnce)
        .unwrap();
    assert_eq!(completion.outcome, Outcome::Unknown);
    assert!(backend.row(1).is_none());
}

#[test]
fn test_undispatched_operations_run_normally_after_reconnect() {
    let backend = SimBackend::new();
    backend.break_execution(1, BreakMode::AfterApply);
    let executor = executor(&backend, fast_config());

    let first = executor
        .enqueue("UPDATE", vec![Value::from("hits")], IdempotencyClass::Unsafe)
        .unwrap();
    let second = executor
        .enqueue("UPDATE", vec![Value::from("hits")], IdempotencyClass::Unsafe)
        .unwrap();

    assert_eq!(first.wait(None).unwrap().outcome, Outcome::Unknown);
    assert_eq!(second.wait(None).unwrap().outcome, Outcome::Committed);
    assert_eq!(backend.counter("hits"), 2);
}

// ============================================================================
// Terminal failures
// ============================================================================

#[test]
fn test_statement_error_is_terminal_and_session_stays_active() {
    let backend = SimBackend::new();
    let executor = executor(&backend, fast_config());

    executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::Idempotent)
        .unwrap();
    let duplicate = executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::Idempotent)
        .unwrap();

    assert_eq!(duplicate.outcome, Outcome::Failed);
    assert!(matches!(duplicate.failure, Some(FailureReason::Statement { .. })));
    assert_eq!(executor.state(), Some(SessionState::Active));
    assert_eq!(backend.open_count(), 1);
    assert_eq!(executor.counters().disruptions, 0);
}

#[test]
fn test_exhaustion_fails_everything_pending() {
    let backend = SimBackend::new();
    let config = ContinuityConfig::new()
        .backoff(Duration::from_millis(20), Duration::from_millis(50))
        .max_attempts(3);
    let executor = executor(&backend, config);
    executor
        .submit(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap();

    backend.fail_next_opens(10);
    backend.break_next_execute(BreakMode::BeforeApply);
    let in_flight = executor
        .enqueue(MERGE, upsert(2), IdempotencyClass::Idempotent)
        .unwrap();
    let queued = executor
        .enqueue(MERGE, upsert(3), IdempotencyClass::Idempotent)
        .unwrap();

    let first = in_flight.wait(None).unwrap();
    assert_eq!(first.outcome, Outcome::Failed);
    assert_eq!(
        first.failure,
        Some(FailureReason::DisruptionExhausted {
            attempts: 3,
            dispatched: true
        })
    );
    let second = queued.wait(None).unwrap();
    assert_eq!(
        second.failure,
        Some(FailureReason::DisruptionExhausted {
            attempts: 3,
            dispatched: false
        })
    );

    assert_eq!(executor.state(), Some(SessionState::Closed));
    let err = executor
        .submit(MERGE, upsert(4), IdempotencyClass::Idempotent)
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed { .. }));
    assert_eq!(executor.counters().acquisition_failures, 3);
}

#[test]
fn test_first_acquisition_exhausted() {
    let backend = SimBackend::new();
    backend.fail_next_opens(u32::MAX);
    let executor = executor(&backend, fast_config().max_attempts(2));

    let completion = executor
        .submit(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap();
    assert_eq!(
        completion.failure,
        Some(FailureReason::DisruptionExhausted {
            attempts: 2,
            dispatched: false
        })
    );
    assert_eq!(executor.state(), Some(SessionState::Closed));
    let err = executor
        .submit(MERGE, upsert(2), IdempotencyClass::Idempotent)
        .unwrap_err();
    assert!(matches!(err, Error::SessionClosed { .. }));
}

// ============================================================================
// Timeouts, cancellation and close
// ============================================================================

#[test]
fn test_timeout_leaves_operation_pending() {
    let backend = SimBackend::new();
    backend.fail_next_opens(3);
    let config = ContinuityConfig::new().backoff(Duration::from_millis(100), Duration::from_millis(100));
    let executor = executor(&backend, config);

    let ticket = executor
        .enqueue(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap();
    let err = ticket.wait(Some(Duration::from_millis(20))).unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(ticket.outcome(), Outcome::Pending);

    let completion = ticket.wait(None).unwrap();
    assert!(completion.is_committed());
    assert_eq!(backend.row(1).unwrap().writes, 1);
}

#[test]
fn test_unbounded_timeout_waits_through_recovery() {
    let backend = SimBackend::new();
    backend.fail_next_opens(1);
    let executor = executor(&backend, fast_config());

    let completion = executor
        .submit_with_timeout(
            MERGE,
            upsert(1),
            IdempotencyClass::Idempotent,
            Some(Duration::MAX),
        )
        .unwrap();
    assert!(completion.is_committed());

    let ticket = executor
        .enqueue(MERGE, upsert(2), IdempotencyClass::Idempotent)
        .unwrap();
    assert!(ticket.wait(Some(Duration::MAX)).unwrap().is_committed());
}

#[test]
fn test_submit_timeout_from_config() {
    let backend = SimBackend::new();
    backend.fail_next_opens(2);
    let config = ContinuityConfig::new()
        .backoff(Duration::from_millis(200), Duration::from_millis(200))
        .submit_timeout_after(Some(Duration::from_millis(10)));
    let executor = executor(&backend, config);

    let err = executor
        .submit(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { sequence: 1, .. }));

    // Still replayed once a link is back
    wait_until(|| backend.row(1).is_some());
}

#[test]
fn test_cancel_before_dispatch() {
    let backend = SimBackend::new();
    backend.fail_next_opens(2);
    let config = ContinuityConfig::new().backoff(Duration::from_millis(200), Duration::from_millis(200));
    let executor = executor(&backend, config);

    let ticket = executor
        .enqueue(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap();
    assert_eq!(executor.cancel(&ticket), CancelStatus::Cancelled);

    let completion = ticket.wait(None).unwrap();
    assert_eq!(completion.outcome, Outcome::Failed);
    assert_eq!(completion.failure, Some(FailureReason::Cancelled));
    assert_eq!(
        ticket.cancel(),
        CancelStatus::AlreadyResolved(Outcome::Failed)
    );

    let next = executor
        .submit(MERGE, upsert(2), IdempotencyClass::Idempotent)
        .unwrap();
    assert!(next.is_committed());
    assert!(backend.row(1).is_none());
    assert_eq!(executor.counters().cancelled, 1);
}

#[test]
fn test_cancel_after_dispatch_cannot_confirm() {
    let backend = SimBackend::new();
    let config = ContinuityConfig::new().backoff(Duration::from_millis(200), Duration::from_millis(200));
    let executor = executor(&backend, config);
    executor
        .submit(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap();

    backend.fail_next_opens(1);
    backend.break_next_execute(BreakMode::AfterApply);
    let ticket = executor
        .enqueue(MERGE, upsert(2), IdempotencyClass::Idempotent)
        .unwrap();
    wait_until(|| backend.execution_count() >= 2);

    assert_eq!(ticket.cancel(), CancelStatus::CannotConfirm);
    let completion = ticket.wait(None).unwrap();
    assert!(completion.is_committed());
    assert_eq!(backend.row(2).unwrap().writes, 1);
}

#[test]
fn test_close_fails_undispatched() {
    let backend = SimBackend::new();
    backend.fail_next_opens(u32::MAX);
    let config = ContinuityConfig::new().backoff(Duration::from_millis(500), Duration::from_millis(500));
    let executor = executor(&backend, config);

    let ticket = executor
        .enqueue(MERGE, upsert(1), IdempotencyClass::Idempotent)
        .unwrap();
    let started = Instant::now();
    executor.close();
    // Close interrupts the backoff sleep
    assert!(started.elapsed() < Duration::from_millis(400));

    let completion = ticket.wait(None).unwrap();
    assert_eq!(completion.failure, Some(FailureReason::SessionClosed));
    assert_eq!(executor.state(), Some(SessionState::Closed));
}

// ============================================================================
// Endpoints, journal, parallel sessions
// ============================================================================

#[test]
fn test_falls_over_to_standby() {
    let backend = SimBackend::new();
    backend.set_endpoint_down("primary-scan", true);
    let primary = Endpoint::new("primary-scan", 1521).with_service("br_tac_svc");
    let standby = Endpoint::new("standby-scan", 1521).with_service("br_tac_svc");
    let executor = ResilientExecutor::builder(backend.connector())
        .endpoints(StaticEndpoints::new(vec![primary, standby.clone()]).unwrap())
        .config(fast_config())
        .build()
        .unwrap();

    let completion = executor
        .submit(MERGE, upsert(1003), IdempotencyClass::Idempotent)
        .unwrap();
    assert!(completion.is_committed());
    assert_eq!(backend.opened_endpoints(), vec![standby]);
    assert_eq!(executor.counters().acquisition_failures, 1);
}

#[test]
fn test_journal_records_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.journal");
    let backend = SimBackend::new();
    let executor = executor(&backend, fast_config().journal(&path, true));

    executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::Idempotent)
        .unwrap();
    executor
        .submit("INSERT", vec![Value::I64(1)], IdempotencyClass::Idempotent)
        .unwrap();
    executor.close();

    let journal = read_journal(&path).unwrap();
    assert!(journal.corruption.is_none());
    let latest = journal.latest_by_sequence();
    assert_eq!(latest[&1].outcome, Outcome::Committed);
    assert_eq!(latest[&2].outcome, Outcome::Failed);
    assert_eq!(latest[&2].statement, "INSERT");
}

#[test]
fn test_sessions_run_in_parallel() {
    let backend = SimBackend::new();
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let backend = backend.clone();
            thread::spawn(move || {
                let executor = executor(&backend, fast_config());
                for i in 0..10 {
                    let key = worker * 100 + i;
                    let completion = executor
                        .submit(MERGE, upsert(key), IdempotencyClass::Idempotent)
                        .unwrap();
                    assert!(completion.is_committed());
                }
                executor.session_id().unwrap()
            })
        })
        .collect();

    let mut sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    sessions.sort();
    sessions.dedup();
    assert_eq!(sessions.len(), 4);
    assert_eq!(backend.rows().len(), 40);
}
