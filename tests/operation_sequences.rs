// Copyright (c) 2025 - Cowboy AI, Inc.
//! Integration tests for add/remove sequences against one controller
//!
//! These tests verify the transactional contract end to end:
//! 1. Model phase → runtime phase → commit
//! 2. Failures at either phase roll back model and services
//! 3. Legacy addresses behave exactly like their canonical targets

mod fixtures;

use pretty_assertions::assert_eq;
use test_case::test_case;

use cim_stack_controller::{
    ControllerError, ExecutionOptions, ModelValue, Operation, OperationOutcome, OperationResult, ReadOptions,
    ServiceState,
};
use fixtures::*;

/// Test: add; remove; add with identical parameters ends where a single add does
#[tokio::test]
async fn test_add_remove_add_cycle() -> anyhow::Result<()> {
    let (controller, _) = controller();
    let add = structured_stack_add(STACK, "UDP", &["MPING", "FLUSH"]);

    assert!(controller.submit(add.clone()).await?.is_success());
    let single_add = controller
        .read_resource(&stack_address(STACK), ReadOptions::recursive())
        .await?;
    let single_add_services = controller.installed_services().await;

    assert!(controller
        .submit(Operation::remove(stack_address(STACK)))
        .await?
        .is_success());
    assert!(controller.installed_services().await.is_empty());

    assert!(controller.submit(add).await?.is_success());
    let cycled = controller
        .read_resource(&stack_address(STACK), ReadOptions::recursive())
        .await?;

    assert_eq!(cycled, single_add);
    assert_eq!(controller.installed_services().await, single_add_services);
    for name in &single_add_services {
        assert_eq!(controller.service_state(name).await, ServiceState::Up);
    }
    Ok(())
}

/// Test: add; remove; remove fails with ResourceNotFound and leaves nothing installed
#[tokio::test]
async fn test_double_remove_fails_cleanly() -> anyhow::Result<()> {
    let (controller, recorder) = controller();
    controller
        .submit(structured_stack_add(STACK, "UDP", &["MPING"]))
        .await?;

    let first = controller.submit(Operation::remove(stack_address(STACK))).await?;
    assert!(first.is_success());

    let stops_after_first = recorder.calls().len();
    let second = controller.submit(Operation::remove(stack_address(STACK))).await?;
    assert_eq!(
        second,
        OperationOutcome::Failed {
            failure: ControllerError::ResourceNotFound(stack_address(STACK))
        }
    );
    assert!(controller.installed_services().await.is_empty());
    assert_eq!(recorder.calls().len(), stops_after_first);
    Ok(())
}

/// Test: inline transport and protocols build the same shape as separate adds
#[tokio::test]
async fn test_structured_add_matches_sequential_adds() -> anyhow::Result<()> {
    let (controller, _) = controller();
    let protocols = ["MPING", "FLUSH"];

    assert!(controller
        .submit(structured_stack_add("structured", "UDP", &protocols))
        .await?
        .is_success());
    assert!(controller
        .submit(composite_stack_add("sequential", "UDP", &protocols))
        .await?
        .is_success());

    let structured = controller
        .read_resource(&stack_address("structured"), ReadOptions::recursive())
        .await?;
    let sequential = controller
        .read_resource(&stack_address("sequential"), ReadOptions::recursive())
        .await?;
    assert_eq!(structured.to_model(), sequential.to_model());
    assert_eq!(structured.child_names("protocol"), vec!["MPING", "FLUSH"]);
    assert_eq!(structured.child_names("transport"), vec!["UDP"]);

    assert!(controller
        .submit(Operation::remove(stack_address("structured")))
        .await?
        .is_success());
    let again = controller
        .submit(Operation::remove(stack_address("structured")))
        .await?;
    assert_eq!(
        again.failure(),
        Some(&ControllerError::ResourceNotFound(stack_address("structured")))
    );
    Ok(())
}

/// Test: legacy transport remove / add / remove / remove
#[tokio::test]
async fn test_legacy_transport_replace_sequence() -> anyhow::Result<()> {
    let (controller, _) = controller();
    controller
        .submit(structured_stack_add(STACK, "UDP", &["MPING"]))
        .await?;

    let removed = controller.submit(Operation::remove(legacy_transport(STACK))).await?;
    assert!(removed.is_success());
    assert_eq!(
        controller.service_state(&transport_service(STACK)).await,
        ServiceState::Removed
    );

    let added = controller
        .submit(Operation::add(legacy_transport(STACK)).with_parameter("type", "TCP"))
        .await?;
    assert!(added.is_success());
    let transport = controller
        .service_descriptor(&transport_service(STACK))
        .await
        .expect("transport should be installed");
    assert_eq!(transport.state, ServiceState::Up);
    assert_eq!(transport.config.get("type"), Some(&ModelValue::from("TCP")));
    assert_eq!(
        controller.service_state(&channel_factory(STACK)).await,
        ServiceState::Up
    );
    let stack = controller
        .read_resource(&stack_address(STACK), ReadOptions::default())
        .await?;
    assert_eq!(stack.child_names("transport"), vec!["TCP"]);

    assert!(controller
        .submit(Operation::remove(legacy_transport(STACK)))
        .await?
        .is_success());
    assert!(!controller
        .installed_services()
        .await
        .contains(&transport_service(STACK)));

    let fourth = controller.submit(Operation::remove(legacy_transport(STACK))).await?;
    assert_eq!(
        fourth.failure(),
        Some(&ControllerError::ResourceNotFound(legacy_transport(STACK)))
    );
    Ok(())
}

/// Test: a legacy add of another transport type replaces the old one in one step
#[tokio::test]
async fn test_legacy_add_replaces_existing_transport() -> anyhow::Result<()> {
    let (controller, recorder) = controller();
    controller
        .submit(structured_stack_add(STACK, "UDP", &["MPING"]))
        .await?;

    let outcome = controller
        .submit(Operation::add(legacy_transport(STACK)).with_parameter("type", "TCP"))
        .await?;
    assert!(outcome.is_success());

    let stack = controller
        .read_resource(&stack_address(STACK), ReadOptions::default())
        .await?;
    assert_eq!(stack.child_names("transport"), vec!["TCP"]);
    let transport = controller
        .service_descriptor(&transport_service(STACK))
        .await
        .expect("transport should be installed");
    assert_eq!(transport.config.get("type"), Some(&ModelValue::from("TCP")));
    assert_eq!(recorder.starts_of(transport_service(STACK).as_str()), 2);
    assert_eq!(recorder.starts_of(channel_factory(STACK).as_str()), 2);
    Ok(())
}

/// Test: a legacy add naming the current transport type is a duplicate
#[tokio::test]
async fn test_legacy_add_of_same_transport_is_duplicate() -> anyhow::Result<()> {
    let (controller, _) = controller();
    controller.submit(structured_stack_add(STACK, "UDP", &[])).await?;

    let outcome = controller
        .submit(Operation::add(legacy_transport(STACK)).with_parameter("type", "UDP"))
        .await?;
    assert_eq!(
        outcome.failure(),
        Some(&ControllerError::DuplicateResource(
            stack_address(STACK).child("transport", "UDP")?
        ))
    );
    Ok(())
}

/// Test: an aborted remove(stack) brings the channel factory back up
#[tokio::test]
async fn test_rollback_reinstalls_removed_services() -> anyhow::Result<()> {
    let (controller, recorder) = controller();
    controller
        .submit(structured_stack_add(STACK, "UDP", &["MPING", "FLUSH"]))
        .await?;
    let before = controller
        .read_resource(&stack_address(STACK), ReadOptions::recursive())
        .await?;

    let outcome = controller
        .submit_with(
            Operation::remove(stack_address(STACK)),
            ExecutionOptions::default().abort_after_runtime_step(1),
        )
        .await?;

    assert_eq!(outcome.failure(), Some(&ControllerError::RollbackRequested(1)));
    assert_eq!(
        controller.service_state(&channel_factory(STACK)).await,
        ServiceState::Up
    );
    assert_eq!(recorder.stops_of(channel_factory(STACK).as_str()), 1);
    assert_eq!(recorder.starts_of(channel_factory(STACK).as_str()), 2);
    for protocol in ["MPING", "FLUSH"] {
        assert_eq!(
            controller.service_state(&protocol_service(STACK, protocol)).await,
            ServiceState::Up
        );
    }
    let after = controller
        .read_resource(&stack_address(STACK), ReadOptions::recursive())
        .await?;
    assert_eq!(after, before);
    Ok(())
}

#[derive(Debug)]
enum FinalStepFailure {
    Validation,
    ServiceStart,
    Abort,
}

/// Test: no partial stack is visible after a composite whose last step fails
#[test_case(FinalStepFailure::Validation ; "model phase failure")]
#[test_case(FinalStepFailure::ServiceStart ; "service start failure")]
#[test_case(FinalStepFailure::Abort ; "abort after last runtime step")]
#[tokio::test]
async fn test_composite_is_atomic(failure: FinalStepFailure) -> anyhow::Result<()> {
    let (controller, recorder) = controller();
    let stack = stack_address(STACK);
    let mut protocol = Operation::add(stack.child("protocol", "MPING")?);
    let mut options = ExecutionOptions::default();
    match failure {
        FinalStepFailure::Validation => protocol = protocol.with_parameter("no-such-attribute", "x"),
        FinalStepFailure::ServiceStart => recorder.fail_start(protocol_service(STACK, "MPING").as_str()),
        FinalStepFailure::Abort => options = options.abort_after_runtime_step(3),
    }
    let composite = Operation::composite(vec![
        Operation::add(stack.clone()),
        Operation::add(stack.child("transport", "UDP")?),
        protocol,
    ]);

    let outcome = controller.submit_with(composite, options).await?;
    assert!(!outcome.is_success());

    let read = controller.read_resource(&stack, ReadOptions::default()).await;
    assert_eq!(read, Err(ControllerError::ResourceNotFound(stack.clone())));
    assert!(controller.installed_services().await.is_empty());
    Ok(())
}

/// Test: a composite returns one result per submitted step
#[tokio::test]
async fn test_composite_results_follow_submission() -> anyhow::Result<()> {
    let (controller, _) = controller();
    controller.submit(structured_stack_add(STACK, "UDP", &[])).await?;
    let stack = stack_address(STACK);

    let outcome = controller
        .submit(Operation::composite(vec![
            Operation::write_attribute(stack.clone(), "statistics-enabled", true),
            Operation::read_attribute(stack.clone(), "statistics-enabled"),
        ]))
        .await?;

    let result = outcome.result().expect("composite should succeed");
    assert_eq!(
        result,
        &OperationResult::Composite(vec![
            OperationResult::Empty,
            OperationResult::Value(ModelValue::Bool(true)),
        ])
    );
    Ok(())
}

/// Test: later steps can address resources added earlier in the same composite
#[tokio::test]
async fn test_composite_steps_see_earlier_steps() -> anyhow::Result<()> {
    let (controller, _) = controller();
    let stack = stack_address(STACK);

    let outcome = controller
        .submit(Operation::composite(vec![
            Operation::add(stack.clone()),
            Operation::add(legacy_transport(STACK)).with_parameter("type", "UDP"),
            Operation::write_attribute(legacy_transport(STACK), "site", "s1"),
        ]))
        .await?;
    assert!(outcome.is_success());

    let transport = controller
        .read_resource(&stack.child("transport", "UDP")?, ReadOptions::default())
        .await?;
    assert_eq!(transport.attributes.get("site"), Some(&ModelValue::from("s1")));
    Ok(())
}

/// Test: a lone stack without a transport cannot come up and is rolled back
#[tokio::test]
async fn test_stack_without_transport_is_rejected() -> anyhow::Result<()> {
    let (controller, _) = controller();

    let outcome = controller.submit(Operation::add(stack_address(STACK))).await?;
    assert_eq!(
        outcome.failure(),
        Some(&ControllerError::DependencyUnsatisfied {
            service: channel_factory(STACK),
            missing: vec![transport_service(STACK)],
        })
    );
    assert!(controller.installed_services().await.is_empty());
    Ok(())
}
