// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Tree
//!
//! Exclusive owner of all resource nodes. Mutations are local and
//! synchronous; nothing here touches services.

use std::collections::BTreeMap;

use super::node::{ResourceNode, ResourceSnapshot};
use super::value::ModelValue;
use crate::address::ResourceAddress;
use crate::errors::{ControllerError, ControllerResult};
use crate::service::ServiceName;

/// Hierarchical store of named resources
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTree {
    root: ResourceNode,
}

impl ResourceTree {
    /// Empty tree whose root is the named subsystem
    pub fn new(subsystem: impl Into<String>) -> Self {
        Self {
            root: ResourceNode::new("subsystem", subsystem),
        }
    }

    pub fn exists(&self, address: &ResourceAddress) -> bool {
        self.get(address).is_some()
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceNode> {
        address
            .segments()
            .iter()
            .try_fold(&self.root, |node, element| node.child(element))
    }

    fn get_mut(&mut self, address: &ResourceAddress) -> Option<&mut ResourceNode> {
        let mut node = &mut self.root;
        for element in address.segments() {
            node = node.child_mut(element)?;
        }
        Some(node)
    }

    fn parent_mut(&mut self, address: &ResourceAddress) -> ControllerResult<&mut ResourceNode> {
        let parent = address
            .parent()
            .ok_or_else(|| ControllerError::Validation("the root cannot be added or removed".to_string()))?;
        self.get_mut(&parent)
            .ok_or(ControllerError::ResourceNotFound(parent))
    }

    /// Add a node at `address`
    ///
    /// `index` positions the node among existing siblings of the same type.
    /// Returns the absolute position among all siblings.
    pub fn add(
        &mut self,
        address: &ResourceAddress,
        attributes: BTreeMap<String, ModelValue>,
        services: Vec<ServiceName>,
        index: Option<usize>,
    ) -> ControllerResult<usize> {
        if self.exists(address) {
            return Err(ControllerError::DuplicateResource(address.clone()));
        }
        let element = address
            .last()
            .cloned()
            .ok_or_else(|| ControllerError::Validation("the root cannot be added".to_string()))?;
        let parent = self.parent_mut(address)?;
        let node = ResourceNode::new(element.key, element.value)
            .with_attributes(attributes)
            .with_services(services);
        Ok(parent.insert_child(node, index))
    }

    /// Remove the node at `address` together with its descendants
    ///
    /// Returns the absolute sibling position and the detached subtree so the
    /// removal can be undone with [`ResourceTree::restore`].
    pub fn remove(&mut self, address: &ResourceAddress) -> ControllerResult<(usize, ResourceNode)> {
        let element = address
            .last()
            .cloned()
            .ok_or_else(|| ControllerError::Validation("the root cannot be removed".to_string()))?;
        let not_found = || ControllerError::ResourceNotFound(address.clone());
        let parent = self.parent_mut(address).map_err(|_| not_found())?;
        parent.remove_child(&element).ok_or_else(not_found)
    }

    /// Reinsert a previously removed subtree at its original position
    pub fn restore(
        &mut self,
        address: &ResourceAddress,
        node: ResourceNode,
        position: usize,
    ) -> ControllerResult<()> {
        if self.exists(address) {
            return Err(ControllerError::DuplicateResource(address.clone()));
        }
        let parent = self.parent_mut(address)?;
        parent.restore_child(node, position);
        Ok(())
    }

    /// Set or clear an attribute, returning the previous value
    pub fn write_attribute(
        &mut self,
        address: &ResourceAddress,
        name: &str,
        value: ModelValue,
    ) -> ControllerResult<ModelValue> {
        let node = self
            .get_mut(address)
            .ok_or_else(|| ControllerError::ResourceNotFound(address.clone()))?;
        let previous = if value.is_defined() {
            node.attributes.insert(name.to_string(), value)
        } else {
            node.attributes.remove(name)
        };
        Ok(previous.unwrap_or_default())
    }

    /// Read a snapshot of the node at `address`
    pub fn read(&self, address: &ResourceAddress, recursive: bool) -> ControllerResult<ResourceSnapshot> {
        self.get(address)
            .map(|node| node.snapshot(address, recursive))
            .ok_or_else(|| ControllerError::ResourceNotFound(address.clone()))
    }

    /// Names of children of `resource_type` under `address`, in order
    pub fn child_names(&self, address: &ResourceAddress, resource_type: &str) -> Vec<String> {
        self.get(address)
            .map(|node| {
                node.children_of_type(resource_type)
                    .map(|child| child.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every service referenced from any node
    pub fn referenced_services(&self) -> Vec<ServiceName> {
        self.root.subtree_services()
    }

    /// Drop every resource
    pub fn clear(&mut self) {
        self.root.children.clear();
    }

    pub fn root(&self) -> &ResourceNode {
        &self.root
    }
}
