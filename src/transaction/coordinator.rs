// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transaction Coordinator
//!
//! Drives a submission through the two-phase protocol and compensates on
//! failure.
//!
//! # Algorithm
//!
//! 1. **Model phase.** Steps run in submission order. Each step's address is
//!    resolved against the tree as it stands at that point, so a step can
//!    name a resource added by an earlier step of the same composite. Inline
//!    child specifications expand into follow-up steps right after their
//!    parent. A failure at step *k* reverts the model changes of steps
//!    *1..k*; no service has been touched yet.
//! 2. **Runtime phase.** Steps run again in the same order, now against the
//!    service graph, driven by the model changes each step produced. After
//!    each step every service whose dependencies are up is started. A
//!    failure, a cancellation, or the abort hook reverts every step, runtime
//!    and model, newest first.
//! 3. **Verification.** Every service the transaction installed must be up.
//! 4. **Commit.** The record is dropped.
//!
//! A compensation that fails during rollback yields [`InconsistentState`]
//! instead of an ordinary failed outcome.

use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, error, info, warn};

use super::record::{ModelChange, StepRecord};
use super::Transaction;
use crate::alias::{AliasResolver, ResolvedOperation, ROOT_TYPE};
use crate::errors::{ControllerError, ControllerResult, InconsistentState};
use crate::handlers::{HandlerRegistry, ModelContext, RuntimeContext};
use crate::model::ResourceTree;
use crate::operation::{ExecutionOptions, Operation, OperationKind, OperationOutcome, OperationResult};
use crate::service::{ServiceFactory, ServiceGraph, ServiceName};
use crate::state_machine::TransactionInput;

/// Executes submissions against one tree and one service graph
pub struct TransactionCoordinator<'a> {
    registry: &'a HandlerRegistry,
    aliases: &'a AliasResolver,
    factory: &'a dyn ServiceFactory,
}

impl<'a> TransactionCoordinator<'a> {
    pub fn new(registry: &'a HandlerRegistry, aliases: &'a AliasResolver, factory: &'a dyn ServiceFactory) -> Self {
        Self {
            registry,
            aliases,
            factory,
        }
    }

    /// Run `operation` as one transaction
    ///
    /// The caller must hold exclusive access to `tree` and `graph` for the
    /// whole call.
    pub async fn execute(
        &self,
        tree: &mut ResourceTree,
        graph: &mut ServiceGraph,
        operation: Operation,
        options: &ExecutionOptions,
    ) -> Result<OperationOutcome, InconsistentState> {
        let mut tx = Transaction::begin();
        let composite = matches!(operation.kind, OperationKind::Composite(_));
        let steps = operation.steps();
        debug!(transaction = %tx.id(), steps = steps.len(), composite, "transaction started");

        if let Err(failure) = self.model_phase(&mut tx, tree, steps, options) {
            let failures = tx.record_mut().revert_model(tree);
            return self.rolled_back(tx, failure, failures);
        }

        let previously_up: BTreeSet<ServiceName> = graph
            .installed()
            .into_iter()
            .filter(|name| graph.is_up(name))
            .collect();

        if let Err(failure) = self.runtime_phase(&mut tx, graph, options).await {
            let mut failures = tx.record_mut().revert_runtime(graph, &previously_up).await;
            failures.extend(tx.record_mut().revert_model(tree));
            return self.rolled_back(tx, failure, failures);
        }

        if let Err(err) = tx.advance(TransactionInput::Commit) {
            error!(transaction = %tx.id(), error = %err, "commit transition rejected");
        }
        let mut results = tx.record().results();
        let result = if composite {
            OperationResult::Composite(results)
        } else if results.is_empty() {
            OperationResult::Empty
        } else {
            results.swap_remove(0)
        };
        info!(transaction = %tx.id(), steps = tx.record().len(), "transaction committed");
        Ok(OperationOutcome::Success { result })
    }

    fn model_phase(
        &self,
        tx: &mut Transaction,
        tree: &mut ResourceTree,
        steps: Vec<Operation>,
        options: &ExecutionOptions,
    ) -> ControllerResult<()> {
        tx.advance(TransactionInput::BeginModel)?;
        let mut queue: VecDeque<(usize, Operation)> = steps.into_iter().enumerate().collect();

        while let Some((origin, operation)) = queue.pop_front() {
            if options.is_cancelled() {
                return Err(ControllerError::Cancelled);
            }

            let target = operation.address.clone();
            let kind = operation.kind.name();
            let mut resolved = self.aliases.canonicalize(operation, tree).map_err(|err| {
                debug!(transaction = %tx.id(), address = %target, error = %err, "address resolution failed");
                err
            })?;

            let mut changes = Vec::new();
            let applied = {
                let mut ctx = ModelContext::new(tree, &mut changes);
                self.apply_model(&mut ctx, &mut resolved)
            };
            let (result, follow_ups) = match applied {
                Ok(applied) => applied,
                Err(err) => {
                    tx.record_mut().push(StepRecord {
                        origin,
                        operation: resolved.operation,
                        model: changes,
                        services: Vec::new(),
                        result: OperationResult::Empty,
                    });
                    debug!(transaction = %tx.id(), operation = kind, address = %target, error = %err, "model step failed");
                    return Err(err);
                }
            };

            debug!(
                transaction = %tx.id(),
                operation = kind,
                address = %resolved.operation.address,
                changes = changes.len(),
                "model step applied"
            );
            tx.record_mut().push(StepRecord {
                origin,
                operation: resolved.operation,
                model: changes,
                services: Vec::new(),
                result,
            });
            for follow_up in follow_ups.into_iter().rev() {
                queue.push_front((origin, follow_up));
            }
        }
        Ok(())
    }

    fn apply_model(
        &self,
        ctx: &mut ModelContext<'_>,
        resolved: &mut ResolvedOperation,
    ) -> ControllerResult<(OperationResult, Vec<Operation>)> {
        let operation = &mut resolved.operation;
        match operation.kind.clone() {
            OperationKind::Add => {
                let handler = self.registry.handler_for(&operation.address)?;
                let follow_ups = handler.expand(operation)?;
                if let Some(replaced) = &resolved.replaces {
                    let replaced_handler = self.registry.handler_for(replaced)?;
                    replaced_handler.model_remove(ctx, &Operation::remove(replaced.clone()))?;
                }
                handler.model_add(ctx, operation)?;
                Ok((OperationResult::Empty, follow_ups))
            }
            OperationKind::Remove => {
                let handler = self.registry.handler_for(&operation.address)?;
                handler.model_remove(ctx, operation)?;
                Ok((OperationResult::Empty, Vec::new()))
            }
            OperationKind::WriteAttribute { name, value } => {
                let handler = self.registry.handler_for(&operation.address)?;
                handler.model_write(ctx, &operation.address, &name, &value)?;
                Ok((OperationResult::Empty, Vec::new()))
            }
            OperationKind::ReadAttribute { name } => {
                let handler = self.registry.handler_for(&operation.address)?;
                let mut value = handler.read_attribute(ctx.tree(), &operation.address, &name)?;
                if let Some(legacy) = &resolved.legacy_attribute {
                    let resource_type = operation.address.resource_type().unwrap_or(ROOT_TYPE);
                    value = self.aliases.present_attribute(resource_type, legacy, &value)?;
                }
                Ok((OperationResult::Value(value), Vec::new()))
            }
            OperationKind::ReadResource(options) => {
                let mut snapshot = ctx.tree().read(&operation.address, options.recursive)?;
                if options.include_aliases {
                    self.aliases.project_snapshot(&mut snapshot, ctx.tree());
                }
                Ok((OperationResult::Resource(snapshot), Vec::new()))
            }
            kind @ (OperationKind::AddProtocol | OperationKind::RemoveProtocol | OperationKind::Composite(_)) => {
                Err(ControllerError::UnsupportedOperation {
                    operation: kind.name().to_string(),
                    address: operation.address.clone(),
                })
            }
        }
    }

    async fn runtime_phase(
        &self,
        tx: &mut Transaction,
        graph: &mut ServiceGraph,
        options: &ExecutionOptions,
    ) -> ControllerResult<()> {
        tx.advance(TransactionInput::BeginRuntime)?;
        let id = tx.id();

        for (index, step) in tx.record_mut().steps_mut().iter_mut().enumerate() {
            if options.is_cancelled() {
                return Err(ControllerError::Cancelled);
            }

            let StepRecord {
                operation,
                model,
                services,
                ..
            } = step;
            let mut ctx = RuntimeContext::new(graph, self.factory, services);
            for change in model.iter() {
                self.apply_runtime(&mut ctx, change).await?;
            }
            let started = ctx.start_ready().await?;
            debug!(
                transaction = %id,
                step = index + 1,
                address = %operation.address,
                started = started.len(),
                "runtime step applied"
            );

            if options.abort_after_runtime_step == Some(index + 1) {
                warn!(transaction = %id, step = index + 1, "rollback requested");
                return Err(ControllerError::RollbackRequested(index + 1));
            }
        }

        for name in tx.record().installed_services() {
            if graph.snapshot(&name).is_installed() && !graph.is_up(&name) {
                return Err(ControllerError::DependencyUnsatisfied {
                    missing: graph.missing_dependencies(&name),
                    service: name,
                });
            }
        }

        if options.is_cancelled() {
            return Err(ControllerError::Cancelled);
        }
        Ok(())
    }

    async fn apply_runtime(&self, ctx: &mut RuntimeContext<'_>, change: &ModelChange) -> ControllerResult<()> {
        let handler = self.registry.handler_for(change.address())?;
        match change {
            ModelChange::Added { address, node } => handler.runtime_added(ctx, address, node).await,
            ModelChange::Removed { node, .. } => handler.runtime_removed(ctx, node).await,
            ModelChange::AttributeWritten {
                address, name, node, ..
            } => handler.runtime_written(ctx, address, node, name).await,
        }
    }

    fn rolled_back(
        &self,
        mut tx: Transaction,
        failure: ControllerError,
        failures: Vec<ControllerError>,
    ) -> Result<OperationOutcome, InconsistentState> {
        let phase = tx.state();
        match tx.advance(TransactionInput::Fail {
            reason: failure.to_string(),
        }) {
            Ok(output) if output.is_critical => {
                warn!(transaction = %tx.id(), ?phase, error = %failure, "runtime failure, services compensated")
            }
            Ok(_) => debug!(transaction = %tx.id(), ?phase, error = %failure, "model failure, changes reverted"),
            Err(err) => error!(transaction = %tx.id(), error = %err, "rollback transition rejected"),
        }
        if let Err(err) = tx.advance(TransactionInput::RollbackComplete) {
            error!(transaction = %tx.id(), error = %err, "rollback transition rejected");
        }
        debug!(transaction = %tx.id(), path = ?tx.path(), "transaction rolled back");

        if failures.is_empty() {
            return Ok(OperationOutcome::Failed { failure });
        }

        error!(
            transaction = %tx.id(),
            cause = %failure,
            failures = ?failures,
            "management layer bug: rollback could not restore a consistent state"
        );
        Err(InconsistentState {
            transaction: tx.id(),
            cause: failure,
            failures,
        })
    }
}
