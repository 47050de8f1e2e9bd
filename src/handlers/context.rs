// Copyright (c) 2025 - Cowboy AI, Inc.
//! Recording Contexts
//!
//! Handlers never touch the tree or the graph directly. They go through a
//! context that appends every mutation to the step's delta list, so each
//! change can be compensated individually.

use std::collections::BTreeMap;

use crate::address::ResourceAddress;
use crate::errors::ControllerResult;
use crate::model::{ModelValue, ResourceNode, ResourceTree};
use crate::service::{ServiceFactory, ServiceGraph, ServiceName, ServiceSpec};
use crate::transaction::record::{ModelChange, ServiceChange};

fn detached(node: &ResourceNode) -> ResourceNode {
    let mut node = node.clone();
    node.children.clear();
    node
}

/// Model-phase access to the resource tree
pub struct ModelContext<'a> {
    tree: &'a mut ResourceTree,
    changes: &'a mut Vec<ModelChange>,
}

impl<'a> ModelContext<'a> {
    pub fn new(tree: &'a mut ResourceTree, changes: &'a mut Vec<ModelChange>) -> Self {
        Self { tree, changes }
    }

    pub fn tree(&self) -> &ResourceTree {
        &*self.tree
    }

    pub fn add(
        &mut self,
        address: &ResourceAddress,
        attributes: BTreeMap<String, ModelValue>,
        services: Vec<ServiceName>,
        index: Option<usize>,
    ) -> ControllerResult<()> {
        self.tree.add(address, attributes, services, index)?;
        if let Some(node) = self.tree.get(address) {
            self.changes.push(ModelChange::Added {
                address: address.clone(),
                node: detached(node),
            });
        }
        Ok(())
    }

    /// Remove a subtree, returning a copy of it
    pub fn remove(&mut self, address: &ResourceAddress) -> ControllerResult<ResourceNode> {
        let (position, node) = self.tree.remove(address)?;
        self.changes.push(ModelChange::Removed {
            address: address.clone(),
            node: node.clone(),
            position,
        });
        Ok(node)
    }

    pub fn write(&mut self, address: &ResourceAddress, name: &str, value: ModelValue) -> ControllerResult<()> {
        let previous = self.tree.write_attribute(address, name, value)?;
        if let Some(node) = self.tree.get(address) {
            self.changes.push(ModelChange::AttributeWritten {
                address: address.clone(),
                name: name.to_string(),
                previous,
                node: detached(node),
            });
        }
        Ok(())
    }
}

/// Runtime-phase access to the service graph
pub struct RuntimeContext<'a> {
    graph: &'a mut ServiceGraph,
    factory: &'a dyn ServiceFactory,
    changes: &'a mut Vec<ServiceChange>,
}

impl<'a> RuntimeContext<'a> {
    pub fn new(
        graph: &'a mut ServiceGraph,
        factory: &'a dyn ServiceFactory,
        changes: &'a mut Vec<ServiceChange>,
    ) -> Self {
        Self {
            graph,
            factory,
            changes,
        }
    }

    pub fn graph(&self) -> &ServiceGraph {
        &*self.graph
    }

    /// Create and install a service; it starts once its dependencies are up
    pub fn install(&mut self, spec: ServiceSpec) -> ControllerResult<()> {
        let service = self.factory.create(&spec);
        let name = spec.name.clone();
        self.graph.install(spec, service)?;
        self.changes.push(ServiceChange::Installed { name });
        Ok(())
    }

    pub async fn remove(&mut self, name: &ServiceName, cascade: bool) -> ControllerResult<()> {
        let removed = self.graph.remove(name, cascade).await?;
        self.changes.push(ServiceChange::Removed(removed));
        Ok(())
    }

    pub async fn reconfigure(
        &mut self,
        name: &ServiceName,
        config: BTreeMap<String, ModelValue>,
    ) -> ControllerResult<()> {
        let previous = self.graph.reconfigure(name, config).await?;
        self.changes.push(ServiceChange::Reconfigured {
            name: name.clone(),
            previous,
        });
        Ok(())
    }

    /// Replace a service with a new instance built from `spec`
    ///
    /// Dependents are stopped with it and come back once the new instance
    /// is up.
    pub async fn restart(&mut self, spec: ServiceSpec) -> ControllerResult<()> {
        self.remove(&spec.name, true).await?;
        self.install(spec)
    }

    /// Start everything that can start; the first failure fails the step
    pub async fn start_ready(&mut self) -> ControllerResult<Vec<ServiceName>> {
        let report = self.graph.start_ready().await;
        match report.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(report.started),
        }
    }
}
