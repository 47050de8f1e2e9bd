// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Model/Service Consistency
//!
//! Every committed state must have exactly the services its resource tree
//! describes, and every failed submission must leave both untouched.

use proptest::prelude::*;
use std::collections::BTreeSet;

use cim_stack_controller::{
    Controller, ExecutionOptions, ModelValue, Operation, ReadOptions, ResourceAddress, ResourceSnapshot, ServiceName,
};

use crate::fixtures::{controller, legacy_transport, stack_address, structured_stack_add};

// ============================================================================
// Operation Generators
// ============================================================================

const STACKS: [&str; 2] = ["alpha", "beta"];
const TRANSPORTS: [&str; 2] = ["UDP", "TCP"];
const PROTOCOLS: [&str; 3] = ["MPING", "MERGE3", "FLUSH"];
const CHANNELS: [&str; 2] = ["ee", "web"];

#[derive(Debug, Clone)]
enum Step {
    AddStack { stack: usize, transport: usize, protocols: Vec<usize> },
    RemoveStack(usize),
    AddProtocol { stack: usize, protocol: usize },
    RemoveProtocol { stack: usize, protocol: usize },
    LegacyAddTransport { stack: usize, transport: usize },
    LegacyRemoveTransport(usize),
    AddChannel { channel: usize, stack: usize },
    RemoveChannel(usize),
    WriteStatistics { stack: usize, enabled: bool },
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..2usize, 0..2usize, prop::collection::vec(0..3usize, 0..3)).prop_map(|(stack, transport, protocols)| {
            Step::AddStack {
                stack,
                transport,
                protocols,
            }
        }),
        (0..2usize).prop_map(Step::RemoveStack),
        (0..2usize, 0..3usize).prop_map(|(stack, protocol)| Step::AddProtocol { stack, protocol }),
        (0..2usize, 0..3usize).prop_map(|(stack, protocol)| Step::RemoveProtocol { stack, protocol }),
        (0..2usize, 0..2usize).prop_map(|(stack, transport)| Step::LegacyAddTransport { stack, transport }),
        (0..2usize).prop_map(Step::LegacyRemoveTransport),
        (0..2usize, 0..2usize).prop_map(|(channel, stack)| Step::AddChannel { channel, stack }),
        (0..2usize).prop_map(Step::RemoveChannel),
        (0..2usize, any::<bool>()).prop_map(|(stack, enabled)| Step::WriteStatistics { stack, enabled }),
    ]
}

fn channel_address(channel: usize) -> ResourceAddress {
    ResourceAddress::from_pairs(&[("channel", CHANNELS[channel])]).expect("valid channel address")
}

fn to_operation(step: &Step) -> Operation {
    match step {
        Step::AddStack {
            stack,
            transport,
            protocols,
        } => {
            let mut names: Vec<&str> = Vec::new();
            for protocol in protocols {
                if !names.contains(&PROTOCOLS[*protocol]) {
                    names.push(PROTOCOLS[*protocol]);
                }
            }
            structured_stack_add(STACKS[*stack], TRANSPORTS[*transport], &names)
        }
        Step::RemoveStack(stack) => Operation::remove(stack_address(STACKS[*stack])),
        Step::AddProtocol { stack, protocol } => {
            Operation::add_protocol(stack_address(STACKS[*stack]), PROTOCOLS[*protocol])
        }
        Step::RemoveProtocol { stack, protocol } => {
            Operation::remove_protocol(stack_address(STACKS[*stack]), PROTOCOLS[*protocol])
        }
        Step::LegacyAddTransport { stack, transport } => {
            Operation::add(legacy_transport(STACKS[*stack])).with_parameter("type", TRANSPORTS[*transport])
        }
        Step::LegacyRemoveTransport(stack) => Operation::remove(legacy_transport(STACKS[*stack])),
        Step::AddChannel { channel, stack } => {
            Operation::add(channel_address(*channel)).with_parameter("stack", STACKS[*stack])
        }
        Step::RemoveChannel(channel) => Operation::remove(channel_address(*channel)),
        Step::WriteStatistics { stack, enabled } => Operation::write_attribute(
            stack_address(STACKS[*stack]),
            "statistics-enabled",
            ModelValue::Bool(*enabled),
        ),
    }
}

// ============================================================================
// Observed State
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Observed {
    model: ResourceSnapshot,
    services: Vec<ServiceName>,
}

async fn observe(controller: &Controller) -> Observed {
    Observed {
        model: controller
            .read_resource(&ResourceAddress::root(), ReadOptions::recursive())
            .await
            .expect("root is always readable"),
        services: controller.installed_services().await,
    }
}

/// Services the committed model calls for
fn expected_services(controller: &Controller, model: &ResourceSnapshot) -> BTreeSet<ServiceName> {
    let names = controller.names();
    let mut expected = BTreeSet::new();
    for stack in model.children.iter().filter(|child| child.resource_type == "stack") {
        expected.insert(names.channel_factory(&stack.name));
        if !stack.child_names("transport").is_empty() {
            expected.insert(names.transport(&stack.name));
        }
        for protocol in stack.child_names("protocol") {
            expected.insert(names.protocol(&stack.name, protocol));
        }
    }
    for channel in model.children.iter().filter(|child| child.resource_type == "channel") {
        expected.insert(names.channel(&channel.name));
    }
    expected
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: installed services always match the committed model
    #[test]
    fn prop_services_match_model(steps in prop::collection::vec(step_strategy(), 1..20)) {
        tokio_test::block_on(async {
            let (controller, _) = controller();
            for step in &steps {
                let before = observe(&controller).await;
                let outcome = controller
                    .submit(to_operation(step))
                    .await
                    .expect("no compensation may fail");
                let after = observe(&controller).await;

                if !outcome.is_success() {
                    assert_eq!(after, before, "failed {:?} changed state", step);
                }
                let installed: BTreeSet<ServiceName> = after.services.iter().cloned().collect();
                assert_eq!(installed, expected_services(&controller, &after.model), "after {:?}", step);
            }
        });
    }

    /// Property: an aborted submission is invisible
    #[test]
    fn prop_aborted_submission_is_invisible(
        setup in prop::collection::vec(step_strategy(), 0..10),
        step in step_strategy(),
    ) {
        tokio_test::block_on(async {
            let (controller, _) = controller();
            for setup_step in &setup {
                controller
                    .submit(to_operation(setup_step))
                    .await
                    .expect("no compensation may fail");
            }
            let before = observe(&controller).await;

            let outcome = controller
                .submit_with(to_operation(&step), ExecutionOptions::default().abort_after_runtime_step(1))
                .await
                .expect("no compensation may fail");

            assert!(!outcome.is_success());
            assert_eq!(observe(&controller).await, before);
        });
    }
}
