//! Behavior-driven tests for the fallback walk.
//!
//! These tests verify HOW a request moves through a chain's adapters:
//! priority order, fallback on failure, timeouts, panics, and exhaustion.

use chainfall_core::{
    AdapterDescriptor, FallbackOrchestrator, Operation, ScriptStep, ScriptedAdapter,
    ALL_ADAPTERS_FAILED, NO_SOURCE,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn descriptor(id: &str, priority: i32) -> AdapterDescriptor {
    AdapterDescriptor::new(id, format!("{id} adapter"), priority).with_chains(["x"])
}

fn ok(id: &str, priority: i32, data: Value) -> Arc<ScriptedAdapter> {
    Arc::new(ScriptedAdapter::always_ok(descriptor(id, priority), data))
}

fn failing(id: &str, priority: i32) -> Arc<ScriptedAdapter> {
    Arc::new(ScriptedAdapter::always_fail(
        descriptor(id, priority),
        "upstream 502",
    ))
}

// =============================================================================
// Priority order
// =============================================================================

#[tokio::test]
async fn when_primary_succeeds_backup_is_never_invoked() {
    // Given: a primary and a backup adapter for the chain
    let primary = ok("primary", 0, json!("from primary"));
    let backup = ok("backup", 1, json!("from backup"));
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", primary.clone());
    orchestrator.register("x", backup.clone());

    // When: a request is routed
    let outcome = orchestrator
        .execute_with_fallback("x", Operation::TokenMetadata, json!({ "token": "0x1" }))
        .await;

    // Then: only the primary is attempted
    assert!(outcome.succeeded);
    assert_eq!(outcome.data, Some(json!("from primary")));
    assert_eq!(outcome.attempted_adapter_ids, vec!["primary"]);
    assert_eq!(primary.call_count(), 1);
    assert_eq!(backup.call_count(), 0);
}

#[tokio::test]
async fn when_adapters_share_priority_registration_order_wins() {
    // Given: two failing adapters at the same priority, registered in order
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", failing("registered-first", 3));
    orchestrator.register("x", failing("registered-second", 3));
    orchestrator.register("x", ok("last-resort", 9, json!(true)));

    // When: the request falls through both
    let outcome = orchestrator
        .execute_with_fallback("x", Operation::TokenMetadata, Value::Null)
        .await;

    // Then: they were tried in registration order
    assert_eq!(
        outcome.attempted_adapter_ids,
        vec!["registered-first", "registered-second", "last-resort"]
    );
}

#[tokio::test]
async fn chain_lookup_ignores_case() {
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("Ethereum", ok("etherscan", 0, json!({ "decimals": 18 })));

    let outcome = orchestrator
        .execute_with_fallback("ETHEREUM", Operation::TokenMetadata, Value::Null)
        .await;

    assert!(outcome.succeeded);
    assert_eq!(outcome.source_adapter_id, "etherscan");
}

// =============================================================================
// Fallback
// =============================================================================

#[tokio::test]
async fn scenario_a_failing_primary_falls_back_to_backup() {
    // Given: A always fails, B always succeeds with "ok"
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", failing("A", 0));
    orchestrator.register("x", ok("B", 1, json!("ok")));

    // When: the chain is queried
    let outcome = orchestrator
        .execute_with_fallback("x", Operation::SecurityScan, Value::Null)
        .await;

    // Then: B serves the request after A
    assert!(outcome.succeeded);
    assert_eq!(outcome.data, Some(json!("ok")));
    assert_eq!(outcome.source_adapter_id, "B");
    assert_eq!(outcome.attempted_adapter_ids, vec!["A", "B"]);
    assert_eq!(outcome.error_message, None);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].adapter_id, "A");
    assert_eq!(outcome.failures[0].code, "adapter.failed");
}

#[tokio::test]
async fn fallback_moves_health_scores_in_opposite_directions() {
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", failing("A", 0));
    orchestrator.register("x", ok("B", 1, json!("ok")));

    // Degrade B a little first so a success has room to raise it.
    orchestrator.health().record_outcome("B", false);
    let before = orchestrator.health().snapshot();

    orchestrator
        .execute_with_fallback("x", Operation::SecurityScan, Value::Null)
        .await;
    let after = orchestrator.health().snapshot();

    assert!(after["A"].score < before["A"].score);
    assert!(after["B"].score > before["B"].score);
    assert_eq!(after["A"].consecutive_failures, 1);
    assert_eq!(after["B"].consecutive_failures, 0);
}

#[tokio::test]
async fn slow_adapter_is_abandoned_after_timeout() {
    // Given: a primary that never answers and a short per-attempt deadline
    let orchestrator = FallbackOrchestrator::builder()
        .with_adapter_timeout(Duration::from_millis(25))
        .build()
        .expect("valid configuration");
    orchestrator.register(
        "x",
        Arc::new(ScriptedAdapter::hanging(descriptor("stuck", 0))),
    );
    orchestrator.register("x", ok("backup", 1, json!("served")));

    // When: the request is routed
    let outcome = orchestrator
        .execute_with_fallback("x", Operation::MarketData, Value::Null)
        .await;

    // Then: the timeout counts as a failure and the backup answers
    assert!(outcome.succeeded);
    assert_eq!(outcome.source_adapter_id, "backup");
    assert_eq!(outcome.failures[0].code, "adapter.timeout");
    let stuck = orchestrator.health().get("stuck").expect("record exists");
    assert_eq!(stuck.consecutive_failures, 1);
    assert!(stuck.last_failure_at.is_some());
}

#[tokio::test]
async fn panicking_adapter_does_not_crash_the_executor() {
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register(
        "x",
        Arc::new(ScriptedAdapter::panicking(
            descriptor("buggy", 0),
            "called unwrap on a missing field",
        )),
    );
    orchestrator.register("x", ok("steady", 1, json!({ "holders": 1200 })));

    let outcome = orchestrator
        .execute_with_fallback("x", Operation::TokenMetadata, Value::Null)
        .await;

    assert!(outcome.succeeded);
    assert_eq!(outcome.source_adapter_id, "steady");
    assert_eq!(outcome.failures[0].code, "adapter.panicked");
    assert_eq!(
        orchestrator
            .health()
            .get("buggy")
            .expect("record exists")
            .consecutive_failures,
        1
    );
}

#[tokio::test]
async fn recovering_adapter_serves_once_script_turns_healthy() {
    let orchestrator = FallbackOrchestrator::default();
    let flaky = Arc::new(ScriptedAdapter::new(
        descriptor("flaky", 0),
        vec![ScriptStep::fail("cold start"), ScriptStep::ok(json!("warm"))],
    ));
    orchestrator.register("x", flaky.clone());
    orchestrator.register("x", ok("backup", 1, json!("backup")));

    let first = orchestrator
        .execute_with_fallback("x", Operation::TokenMetadata, Value::Null)
        .await;
    let second = orchestrator
        .execute_with_fallback("x", Operation::TokenMetadata, Value::Null)
        .await;

    assert_eq!(first.source_adapter_id, "backup");
    assert_eq!(second.source_adapter_id, "flaky");
    assert_eq!(second.attempted_adapter_ids, vec!["flaky"]);
}

// =============================================================================
// Exhaustion and unroutable chains
// =============================================================================

#[tokio::test]
async fn when_every_adapter_fails_outcome_lists_each_once() {
    // Given: three failing adapters
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", failing("a", 0));
    orchestrator.register("x", failing("b", 1));
    orchestrator.register("x", failing("c", 2));

    // When: the request is routed
    let outcome = orchestrator
        .execute_with_fallback("x", Operation::ContractSource, Value::Null)
        .await;

    // Then: a failed outcome, not an error
    assert!(!outcome.succeeded);
    assert_eq!(outcome.data, None);
    assert_eq!(outcome.source_adapter_id, NO_SOURCE);
    assert_eq!(outcome.error_message.as_deref(), Some(ALL_ADAPTERS_FAILED));
    assert_eq!(outcome.attempted_adapter_ids, vec!["a", "b", "c"]);
    assert_eq!(outcome.failures.len(), 3);
}

#[tokio::test]
async fn scenario_d_unknown_chain_names_the_chain() {
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", ok("a", 0, json!(1)));

    let outcome = orchestrator
        .execute_with_fallback("unknown", Operation::TokenMetadata, Value::Null)
        .await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.source_adapter_id, NO_SOURCE);
    assert!(outcome
        .error_message
        .as_deref()
        .expect("error message present")
        .contains("unknown"));
    assert!(outcome.attempted_adapter_ids.is_empty());
    assert_eq!(outcome.elapsed_ms, 0);
    assert_eq!(
        orchestrator
            .health()
            .get("a")
            .expect("record exists")
            .total_calls,
        0
    );
}

#[tokio::test]
async fn outcome_serializes_for_the_analysis_service() {
    let orchestrator = FallbackOrchestrator::default();
    orchestrator.register("x", failing("A", 0));
    orchestrator.register("x", ok("B", 1, json!("ok")));

    let outcome = orchestrator
        .execute_with_fallback("x", Operation::MarketData, Value::Null)
        .await;
    let value = serde_json::to_value(&outcome).expect("serializable outcome");

    assert_eq!(value["chain"], "x");
    assert_eq!(value["operation"], "market_data");
    assert_eq!(value["source_adapter_id"], "B");
    assert_eq!(value["attempted_adapter_ids"], json!(["A", "B"]));
    assert!(value.get("error_message").is_none());
}
