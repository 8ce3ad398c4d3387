//! Contract tests for health scoring and circuit breaking as seen through
//! the orchestrator. A manual clock drives the cool-down, so nothing sleeps.

use chainfall_core::{
    AdapterDescriptor, FallbackOrchestrator, HealthState, ManualClock, Operation,
    ScriptStep, ScriptedAdapter, UtcDateTime, ALL_ADAPTERS_FAILED,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const COOL_DOWN: Duration = Duration::from_millis(60_000);

fn orchestrator_with_clock() -> (FallbackOrchestrator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        UtcDateTime::parse("2025-03-01T09:00:00Z").expect("valid timestamp"),
    ));
    let orchestrator = FallbackOrchestrator::builder()
        .with_clock(clock.clone())
        .build()
        .expect("default configuration is valid");
    (orchestrator, clock)
}

fn always_failing(id: &str) -> Arc<ScriptedAdapter> {
    Arc::new(ScriptedAdapter::always_fail(
        AdapterDescriptor::new(id, id, 0).with_chains(["x"]),
        "explorer returned NOTOK",
    ))
}

async fn call(orchestrator: &FallbackOrchestrator) -> chainfall_core::CallOutcome {
    orchestrator
        .execute_with_fallback("x", Operation::TokenMetadata, Value::Null)
        .await
}

#[tokio::test]
async fn registration_creates_a_perfect_health_record() {
    let (orchestrator, _) = orchestrator_with_clock();
    orchestrator.register("x", always_failing("A"));

    let health = orchestrator.health().get("A").expect("record exists");

    assert_eq!(health.score, 100.0);
    assert_eq!(health.consecutive_failures, 0);
    assert_eq!(health.total_calls, 0);
    assert_eq!(health.successful_calls, 0);
    assert_eq!(health.last_failure_at, None);
    assert!(!health.circuit_open);
    assert_eq!(health.status(), HealthState::Healthy);
    assert_eq!(health.success_rate(), None);
}

#[tokio::test]
async fn score_follows_the_exponential_moving_average() {
    let (orchestrator, _) = orchestrator_with_clock();
    orchestrator.register("x", always_failing("A"));

    for n in 1..=5 {
        call(&orchestrator).await;
        let score = orchestrator.health().get("A").expect("record exists").score;
        let expected = 100.0 * 0.8_f64.powi(n);
        assert!(
            (score - expected).abs() < 1e-9,
            "after {n} failures expected {expected}, got {score}"
        );
    }
}

#[tokio::test]
async fn scenario_b_eighth_failure_opens_the_circuit() {
    // Given: a single adapter that always fails
    let (orchestrator, _) = orchestrator_with_clock();
    let adapter = always_failing("A");
    orchestrator.register("x", adapter.clone());

    // When: seven calls fail the circuit is still closed
    for _ in 0..7 {
        call(&orchestrator).await;
    }
    assert!(!orchestrator.health().snapshot()["A"].circuit_open);

    // And: the eighth call opens it
    call(&orchestrator).await;

    // Then
    let snapshot = orchestrator.health().snapshot();
    assert!(snapshot["A"].circuit_open);
    assert!(snapshot["A"].score < 20.0);
    assert_eq!(snapshot["A"].consecutive_failures, 8);
    assert_eq!(adapter.call_count(), 8);
}

#[tokio::test]
async fn scenario_c_open_circuit_is_skipped_without_health_change() {
    let (orchestrator, clock) = orchestrator_with_clock();
    let adapter = always_failing("A");
    orchestrator.register("x", adapter.clone());
    for _ in 0..8 {
        call(&orchestrator).await;
    }
    let before = orchestrator.health().get("A").expect("record exists");

    // When: a ninth call arrives inside the cool-down
    clock.advance(Duration::from_millis(59_999));
    let outcome = call(&orchestrator).await;

    // Then: A is annotated as skipped and untouched
    assert!(!outcome.succeeded);
    assert_eq!(outcome.attempted_adapter_ids, vec!["A (circuit open)"]);
    assert_eq!(outcome.error_message.as_deref(), Some(ALL_ADAPTERS_FAILED));
    assert!(outcome.failures.is_empty());
    assert_eq!(adapter.call_count(), 8);
    assert_eq!(orchestrator.health().get("A").expect("record exists"), before);
}

#[tokio::test]
async fn circuit_half_opens_after_cool_down_and_retries() {
    // Given: an adapter that fails eight times and then recovers
    let (orchestrator, clock) = orchestrator_with_clock();
    let mut script = vec![ScriptStep::fail("down"); 8];
    script.push(ScriptStep::ok(json!("recovered")));
    let adapter = Arc::new(ScriptedAdapter::new(
        AdapterDescriptor::new("A", "A", 0).with_chains(["x"]),
        script,
    ));
    orchestrator.register("x", adapter.clone());
    for _ in 0..8 {
        call(&orchestrator).await;
    }
    let decayed = orchestrator.health().get("A").expect("record exists").score;

    // When: the cool-down elapses
    clock.advance(COOL_DOWN);
    let outcome = call(&orchestrator).await;

    // Then: A is attempted normally and succeeds
    assert!(outcome.succeeded);
    assert_eq!(outcome.attempted_adapter_ids, vec!["A"]);
    let health = orchestrator.health().get("A").expect("record exists");
    assert!(!health.circuit_open);
    assert_eq!(health.consecutive_failures, 0);
    assert!((health.score - (decayed * 0.8 + 20.0)).abs() < 1e-9);
}

#[tokio::test]
async fn failure_after_half_open_decays_from_the_previous_score() {
    let (orchestrator, clock) = orchestrator_with_clock();
    orchestrator.register("x", always_failing("A"));
    for _ in 0..8 {
        call(&orchestrator).await;
    }

    clock.advance(COOL_DOWN);
    let outcome = call(&orchestrator).await;

    assert_eq!(outcome.attempted_adapter_ids, vec!["A"]);
    let health = orchestrator.health().get("A").expect("record exists");
    assert!(health.circuit_open, "score never recovered, so the circuit re-opens");
    assert_eq!(health.consecutive_failures, 1);
    assert!((health.score - 100.0 * 0.8_f64.powi(9)).abs() < 1e-9);
}

#[tokio::test]
async fn open_circuit_on_primary_routes_to_backup() {
    let (orchestrator, _) = orchestrator_with_clock();
    orchestrator.register("x", always_failing("A"));
    orchestrator.register(
        "x",
        Arc::new(ScriptedAdapter::always_ok(
            AdapterDescriptor::new("B", "B", 1).with_chains(["x"]),
            json!("ok"),
        )),
    );
    for _ in 0..8 {
        call(&orchestrator).await;
    }

    let outcome = call(&orchestrator).await;

    assert!(outcome.succeeded);
    assert_eq!(outcome.source_adapter_id, "B");
    assert_eq!(outcome.attempted_adapter_ids, vec!["A (circuit open)", "B"]);
}

#[tokio::test]
async fn manual_reset_reopens_the_adapter_immediately() {
    let (orchestrator, _) = orchestrator_with_clock();
    let adapter = always_failing("A");
    orchestrator.register("x", adapter.clone());
    for _ in 0..8 {
        call(&orchestrator).await;
    }

    orchestrator.health().reset("A").expect("registered adapter");
    let outcome = call(&orchestrator).await;

    assert_eq!(outcome.attempted_adapter_ids, vec!["A"]);
    assert_eq!(adapter.call_count(), 9);
    let health = orchestrator.health().get("A").expect("record exists");
    assert!((health.score - 80.0).abs() < 1e-9);
    assert!(!health.circuit_open);
}

#[tokio::test]
async fn health_is_shared_across_chains() {
    let (orchestrator, _) = orchestrator_with_clock();
    let shared = Arc::new(ScriptedAdapter::always_fail(
        AdapterDescriptor::new("shared", "Shared", 0).with_chains(["x", "y"]),
        "boom",
    ));
    orchestrator.register_for_supported_chains(shared);

    for _ in 0..4 {
        call(&orchestrator).await;
        orchestrator
            .execute_with_fallback("y", Operation::TokenMetadata, Value::Null)
            .await;
    }

    let health = orchestrator.health().get("shared").expect("record exists");
    assert_eq!(health.consecutive_failures, 8);
    assert!(health.circuit_open);
}

#[tokio::test]
async fn snapshot_serializes_for_the_dashboard() {
    let (orchestrator, _) = orchestrator_with_clock();
    orchestrator.register("x", always_failing("A"));
    call(&orchestrator).await;

    let value = serde_json::to_value(orchestrator.health().snapshot()).expect("serializable");

    assert_eq!(value["A"]["consecutive_failures"], 1);
    assert_eq!(value["A"]["total_calls"], 1);
    assert_eq!(value["A"]["circuit_open"], false);
    assert_eq!(value["A"]["last_failure_at"], "2025-03-01T09:00:00Z");
}
