//! Integration tests for read/test/apply against fake capabilities.
//!
//! Covers the restart decision matrix, active-node gating and error
//! propagation. Uses the in-memory fakes from dbopt-testing.

use std::time::Duration;

use dbopt_reconcile::{
    ApplyOutcome, ConfigOption, DesiredState, ReconcileError, RestartError, TestOutcome,
};
use dbopt_testing::{FakeConnector, FakeInstance, Harness, RestartBehavior, RestartCall};
use proptest::prelude::*;
use rstest::rstest;

const INSTANCE: &str = "MSSQLSERVER";
const MAX_MEMORY: &str = "max server memory (MB)";
const CTFP: &str = "cost threshold for parallelism";

fn instance() -> FakeInstance {
    FakeInstance::new(vec![
        ConfigOption::new(CTFP, 5, true),
        ConfigOption::new(MAX_MEMORY, 2048, false),
    ])
}

fn harness_with(fake: FakeInstance, restart: RestartBehavior) -> Harness {
    Harness::new(
        FakeConnector::new().with_instance(Harness::LOCAL_HOST, INSTANCE, fake),
        restart,
    )
}

#[test]
fn test_read_returns_stored_value() {
    let harness = Harness::single(INSTANCE, instance());

    let observed = harness.reconciler.read(None, INSTANCE, MAX_MEMORY).unwrap();

    assert_eq!(observed.server_name, Harness::LOCAL_HOST);
    assert_eq!(observed.instance_name, INSTANCE);
    assert_eq!(observed.option_name, MAX_MEMORY);
    assert_eq!(observed.option_value, 2048);
    assert!(observed.is_active_node);
    assert_eq!(harness.connector.connect_count(), 1);
}

#[test]
fn test_read_state_echoes_restart_settings() {
    let harness = Harness::single(INSTANCE, instance());
    harness.active_node.set(false);

    let desired = DesiredState::new(INSTANCE, CTFP, 50)
        .with_restart_service(true)
        .with_restart_timeout_secs(300);
    let observed = harness.reconciler.read_state(&desired).unwrap();

    assert_eq!(observed.option_value, 5);
    assert!(observed.restart_service);
    assert_eq!(observed.restart_timeout_secs, 300);
    assert!(!observed.is_active_node);
}

#[test]
fn test_read_missing_option_fails() {
    let harness = Harness::single(INSTANCE, instance());

    let err = harness
        .reconciler
        .read(None, INSTANCE, "min memory per query (KB)")
        .unwrap_err();

    assert!(err.is_option_not_found());
    assert_eq!(
        err.to_string(),
        "configuration option 'min memory per query (KB)' was not found on the instance"
    );
}

#[test]
fn test_connection_failure_propagates_unmodified() {
    let harness = Harness::new(FakeConnector::failing("login timeout"), RestartBehavior::Succeed);
    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096).with_server_name("SQL02");

    let err = harness.reconciler.apply(&desired).unwrap_err();
    match err {
        ReconcileError::Connection(inner) => {
            assert_eq!(inner.server, "SQL02");
            assert_eq!(inner.instance, INSTANCE);
            assert_eq!(inner.reason, "login timeout");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(harness.reconciler.test(&desired).unwrap_err().is_connection());
    assert_eq!(harness.connector.connect_count(), 2);
}

#[test]
fn test_unknown_server_is_a_connection_error() {
    let harness = Harness::single(INSTANCE, instance());
    let err = harness
        .reconciler
        .read(Some("ELSEWHERE"), INSTANCE, MAX_MEMORY)
        .unwrap_err();
    assert!(err.is_connection());
}

#[rstest]
#[case::equal(2048, TestOutcome::Satisfied)]
#[case::different(4096, TestOutcome::Unsatisfied)]
fn test_compares_values(#[case] desired_value: i32, #[case] expected: TestOutcome) {
    let harness = Harness::single(INSTANCE, instance());
    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, desired_value);

    assert_eq!(harness.reconciler.test(&desired).unwrap(), expected);
}

#[rstest]
#[case::gated_inactive(true, false, TestOutcome::NotApplicable)]
#[case::gated_active(true, true, TestOutcome::Unsatisfied)]
#[case::ungated_inactive(false, false, TestOutcome::Unsatisfied)]
fn test_active_node_gating(
    #[case] only_active: bool,
    #[case] active: bool,
    #[case] expected: TestOutcome,
) {
    let harness = Harness::single(INSTANCE, instance());
    harness.active_node.set(active);

    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096)
        .with_process_only_on_active_node(only_active);

    assert_eq!(harness.reconciler.test(&desired).unwrap(), expected);
}

#[test]
fn test_not_applicable_even_when_values_match() {
    let harness = Harness::single(INSTANCE, instance());
    harness.active_node.set(false);

    let desired =
        DesiredState::new(INSTANCE, MAX_MEMORY, 2048).with_process_only_on_active_node(true);

    assert_eq!(harness.reconciler.test(&desired).unwrap(), TestOutcome::NotApplicable);
}

#[rstest]
#[case::restart_requested(true)]
#[case::restart_not_requested(false)]
fn test_dynamic_option_never_restarts(#[case] restart_service: bool) {
    let fake = instance();
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);

    let desired = DesiredState::new(INSTANCE, CTFP, 50).with_restart_service(restart_service);
    let outcome = harness.reconciler.apply(&desired).unwrap();

    assert_eq!(outcome, ApplyOutcome::NoRestartNeeded);
    assert_eq!(fake.value_of(CTFP), Some(50));
    assert!(harness.restarter.calls().is_empty());
}

#[test]
fn test_non_dynamic_option_restarts_once_with_timeout() {
    let fake = instance();
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);

    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096)
        .with_restart_service(true)
        .with_restart_timeout_secs(45);
    let outcome = harness.reconciler.apply(&desired).unwrap();

    assert_eq!(outcome, ApplyOutcome::Restarted);
    assert_eq!(fake.value_of(MAX_MEMORY), Some(4096));
    assert_eq!(
        harness.restarter.calls(),
        vec![RestartCall {
            server: Harness::LOCAL_HOST.to_string(),
            instance: INSTANCE.to_string(),
            timeout: Duration::from_secs(45),
        }]
    );
}

#[test]
fn test_non_dynamic_option_without_restart_warns() {
    let fake = instance();
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);

    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096);
    let outcome = harness.reconciler.apply(&desired).unwrap();

    assert_eq!(outcome, ApplyOutcome::RestartRequired);
    assert!(outcome.restart_pending());
    assert_eq!(fake.commit_count(), 1);
    assert!(harness.restarter.calls().is_empty());
}

#[rstest]
#[case::failure(RestartBehavior::Fail)]
#[case::timeout(RestartBehavior::TimeOut)]
fn test_restart_errors_propagate_after_commit(#[case] behavior: RestartBehavior) {
    let fake = instance();
    let harness = harness_with(fake.clone(), behavior);

    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096).with_restart_service(true);
    let err = harness.reconciler.apply(&desired).unwrap_err();

    match (behavior, err) {
        (RestartBehavior::Fail, ReconcileError::Restart(RestartError::Failed { .. })) => {}
        (RestartBehavior::TimeOut, ReconcileError::Restart(RestartError::Timeout { timeout, .. })) => {
            assert_eq!(timeout, Duration::from_secs(120));
        }
        (_, other) => panic!("unexpected error: {other:?}"),
    }
    // The value was committed before the restart was attempted.
    assert_eq!(fake.value_of(MAX_MEMORY), Some(4096));
}

#[test]
fn test_commit_failure_skips_restart() {
    let fake = instance().failing_commits("value out of range");
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);

    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096).with_restart_service(true);
    let err = harness.reconciler.apply(&desired).unwrap_err();

    match err {
        ReconcileError::Commit(e) => assert_eq!(e.option, MAX_MEMORY),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fake.value_of(MAX_MEMORY), Some(2048));
    assert!(harness.restarter.calls().is_empty());
}

#[test]
fn test_apply_missing_option_fails_before_commit() {
    let fake = instance();
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);

    let err = harness
        .reconciler
        .apply(&DesiredState::new(INSTANCE, "user connections", 100))
        .unwrap_err();

    assert!(err.is_option_not_found());
    assert_eq!(fake.commit_count(), 0);
}

#[test]
fn test_apply_ignores_active_node_gating() {
    let fake = instance();
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);
    harness.active_node.set(false);

    let desired =
        DesiredState::new(INSTANCE, CTFP, 25).with_process_only_on_active_node(true);
    harness.reconciler.apply(&desired).unwrap();

    assert_eq!(fake.value_of(CTFP), Some(25));
}

#[test]
fn test_apply_twice_is_stable_but_reruns_restart_decision() {
    let fake = instance();
    let harness = harness_with(fake.clone(), RestartBehavior::Succeed);
    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096).with_restart_service(true);

    harness.reconciler.apply(&desired).unwrap();
    let first = harness.reconciler.read_state(&desired).unwrap();
    harness.reconciler.apply(&desired).unwrap();
    let second = harness.reconciler.read_state(&desired).unwrap();

    assert_eq!(first, second);
    assert_eq!(fake.commit_count(), 2);
    assert_eq!(harness.restarter.calls().len(), 2);
}

#[test]
fn test_max_server_memory_scenario() {
    let fake = instance();
    let harness = harness_with(fake, RestartBehavior::Succeed);
    let desired = DesiredState::new(INSTANCE, MAX_MEMORY, 4096);

    assert_eq!(harness.reconciler.test(&desired).unwrap(), TestOutcome::Unsatisfied);
    assert_eq!(
        harness.reconciler.apply(&desired).unwrap(),
        ApplyOutcome::RestartRequired
    );
    let observed = harness.reconciler.read(None, INSTANCE, MAX_MEMORY).unwrap();
    assert_eq!(observed.option_value, 4096);
    assert_eq!(harness.reconciler.test(&desired).unwrap(), TestOutcome::Satisfied);
}

#[test]
fn test_observed_state_serializes_snake_case() {
    let harness = Harness::single(INSTANCE, instance());
    let observed = harness.reconciler.read(None, INSTANCE, CTFP).unwrap();

    let json = serde_json::to_value(&observed).unwrap();
    assert_eq!(json["option_value"], 5);
    assert_eq!(json["is_active_node"], true);
    assert_eq!(json["restart_timeout_secs"], 120);
}

proptest! {
    #[test]
    fn prop_test_satisfied_iff_equal(stored in any::<i32>(), wanted in any::<i32>()) {
        let fake = FakeInstance::new(vec![ConfigOption::new(MAX_MEMORY, stored, false)]);
        let harness = Harness::single(INSTANCE, fake);

        let outcome = harness
            .reconciler
            .test(&DesiredState::new(INSTANCE, MAX_MEMORY, wanted))
            .unwrap();

        prop_assert_eq!(outcome.is_satisfied(), stored == wanted);
        prop_assert_ne!(outcome, TestOutcome::NotApplicable);
    }
}
