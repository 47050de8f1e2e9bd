// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transaction Record
//!
//! Ordered deltas of the in-flight transaction, one [`StepRecord`] per
//! executed step. Used only for rollback and dropped on commit.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::address::ResourceAddress;
use crate::errors::ControllerError;
use crate::model::{ModelValue, ResourceNode, ResourceTree};
use crate::operation::{Operation, OperationResult};
use crate::service::{RemovedService, ServiceGraph, ServiceName};

/// A single model mutation
#[derive(Debug, Clone, PartialEq)]
pub enum ModelChange {
    /// Node created; `node` is its state right after the add
    Added {
        address: ResourceAddress,
        node: ResourceNode,
    },
    /// Subtree detached from `position` among its siblings
    Removed {
        address: ResourceAddress,
        node: ResourceNode,
        position: usize,
    },
    /// Attribute replaced; `node` is the node right after the write
    AttributeWritten {
        address: ResourceAddress,
        name: String,
        previous: ModelValue,
        node: ResourceNode,
    },
}

impl ModelChange {
    pub fn address(&self) -> &ResourceAddress {
        match self {
            ModelChange::Added { address, .. }
            | ModelChange::Removed { address, .. }
            | ModelChange::AttributeWritten { address, .. } => address,
        }
    }

    fn revert(self, tree: &mut ResourceTree) -> Result<(), ControllerError> {
        match self {
            ModelChange::Added { address, .. } => tree.remove(&address).map(|_| ()),
            ModelChange::Removed {
                address,
                node,
                position,
            } => tree.restore(&address, node, position),
            ModelChange::AttributeWritten {
                address,
                name,
                previous,
                ..
            } => tree.write_attribute(&address, &name, previous).map(|_| ()),
        }
    }
}

/// A single service graph mutation
#[derive(Debug, Clone)]
pub enum ServiceChange {
    Installed { name: ServiceName },
    Removed(RemovedService),
    Reconfigured {
        name: ServiceName,
        previous: BTreeMap<String, ModelValue>,
    },
}

/// Deltas and result of one executed step
#[derive(Debug, Clone)]
pub struct StepRecord {
    /// Position of the submitted step this one belongs to
    pub origin: usize,
    pub operation: Operation,
    pub model: Vec<ModelChange>,
    pub services: Vec<ServiceChange>,
    pub result: OperationResult,
}

/// Rollback log of a transaction
#[derive(Debug, Default)]
pub struct TransactionRecord {
    steps: Vec<StepRecord>,
}

impl TransactionRecord {
    pub fn push(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [StepRecord] {
        &mut self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Services installed by this transaction, in installation order
    pub fn installed_services(&self) -> Vec<ServiceName> {
        self.steps
            .iter()
            .flat_map(|step| step.services.iter())
            .filter_map(|change| match change {
                ServiceChange::Installed { name } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Results grouped by submitted step
    pub fn results(&self) -> Vec<OperationResult> {
        let mut results: Vec<OperationResult> = Vec::new();
        let mut last_origin = None;
        for step in &self.steps {
            if last_origin != Some(step.origin) {
                results.push(step.result.clone());
                last_origin = Some(step.origin);
            }
        }
        results
    }

    /// Undo every model change, newest first
    pub fn revert_model(&mut self, tree: &mut ResourceTree) -> Vec<ControllerError> {
        let mut failures = Vec::new();
        for step in self.steps.iter_mut().rev() {
            for change in step.model.drain(..).rev() {
                let address = change.address().clone();
                if let Err(err) = change.revert(tree) {
                    failures.push(err);
                } else {
                    debug!(address = %address, "model change reverted");
                }
            }
        }
        failures
    }

    /// Undo every service change, newest first, then bring back whatever
    /// was up before the transaction
    pub async fn revert_runtime(
        &mut self,
        graph: &mut ServiceGraph,
        previously_up: &BTreeSet<ServiceName>,
    ) -> Vec<ControllerError> {
        let mut failures = Vec::new();
        for step in self.steps.iter_mut().rev() {
            for change in step.services.drain(..).rev() {
                let outcome = match change {
                    ServiceChange::Installed { name } => {
                        if graph.snapshot(&name).is_installed() {
                            graph.remove(&name, true).await.map(|_| ())
                        } else {
                            Ok(())
                        }
                    }
                    ServiceChange::Removed(removed) => graph.install(removed.spec, removed.service),
                    ServiceChange::Reconfigured { name, previous } => {
                        graph.reconfigure(&name, previous).await.map(|_| ())
                    }
                };
                if let Err(err) = outcome {
                    failures.push(err);
                }
            }
        }

        let report = graph.start_ready().await;
        failures.extend(report.failures);

        for name in previously_up {
            if !graph.is_up(name) {
                failures.push(ControllerError::DependencyUnsatisfied {
                    service: name.clone(),
                    missing: graph.missing_dependencies(name),
                });
            }
        }
        failures
    }
}
