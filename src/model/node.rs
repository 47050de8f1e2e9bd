// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Nodes and Snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::value::ModelValue;
use crate::address::{PathElement, ResourceAddress};
use crate::service::ServiceName;

/// A node of the resource tree
///
/// Children keep their insertion order, which is the protocol layering order
/// for protocols. `services` are non-owning references to the services this
/// node caused to exist; the service graph owns the services themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    pub resource_type: String,
    pub name: String,
    pub attributes: BTreeMap<String, ModelValue>,
    pub children: Vec<ResourceNode>,
    pub services: Vec<ServiceName>,
}

impl ResourceNode {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: BTreeMap<String, ModelValue>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceName>) -> Self {
        self.services = services;
        self
    }

    /// Segment naming this node under its parent
    pub fn element(&self) -> PathElement {
        PathElement {
            key: self.resource_type.clone(),
            value: self.name.clone(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&ModelValue> {
        self.attributes.get(name)
    }

    pub fn child(&self, element: &PathElement) -> Option<&ResourceNode> {
        self.children
            .iter()
            .find(|child| child.resource_type == element.key && child.name == element.value)
    }

    pub fn child_mut(&mut self, element: &PathElement) -> Option<&mut ResourceNode> {
        self.children
            .iter_mut()
            .find(|child| child.resource_type == element.key && child.name == element.value)
    }

    pub fn children_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a ResourceNode> + 'a {
        self.children
            .iter()
            .filter(move |child| child.resource_type == resource_type)
    }

    /// Insert a child; `index` counts among siblings of the same type
    ///
    /// Returns the absolute position the child was stored at.
    pub fn insert_child(&mut self, child: ResourceNode, index: Option<usize>) -> usize {
        let position = match index {
            Some(index) => {
                let same_type: Vec<usize> = self
                    .children
                    .iter()
                    .enumerate()
                    .filter(|(_, existing)| existing.resource_type == child.resource_type)
                    .map(|(i, _)| i)
                    .collect();
                match same_type.get(index) {
                    Some(&absolute) => absolute,
                    None => self.children.len(),
                }
            }
            None => self.children.len(),
        };
        self.children.insert(position, child);
        position
    }

    /// Reinsert a child at an absolute position
    pub fn restore_child(&mut self, child: ResourceNode, position: usize) {
        let position = position.min(self.children.len());
        self.children.insert(position, child);
    }

    /// Detach a child, returning its absolute position and subtree
    pub fn remove_child(&mut self, element: &PathElement) -> Option<(usize, ResourceNode)> {
        let position = self
            .children
            .iter()
            .position(|child| child.resource_type == element.key && child.name == element.value)?;
        Some((position, self.children.remove(position)))
    }

    /// Service references of this node and all descendants
    pub fn subtree_services(&self) -> Vec<ServiceName> {
        let mut services = self.services.clone();
        for child in &self.children {
            services.extend(child.subtree_services());
        }
        services
    }

    /// Snapshot of this node at `address`
    pub fn snapshot(&self, address: &ResourceAddress, recursive: bool) -> ResourceSnapshot {
        let children = self
            .children
            .iter()
            .map(|child| {
                let child_address = address.append(child.element());
                if recursive {
                    child.snapshot(&child_address, true)
                } else {
                    ResourceSnapshot::shallow(child_address, child)
                }
            })
            .collect();

        ResourceSnapshot {
            address: address.clone(),
            resource_type: self.resource_type.clone(),
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            children,
            aliases: Vec::new(),
        }
    }
}

/// Read-only view of a resource returned by introspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub address: ResourceAddress,
    pub resource_type: String,
    pub name: String,
    pub attributes: BTreeMap<String, ModelValue>,
    pub children: Vec<ResourceSnapshot>,
    /// Legacy addresses naming the same resource, when requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<ResourceAddress>,
}

impl ResourceSnapshot {
    fn shallow(address: ResourceAddress, node: &ResourceNode) -> Self {
        Self {
            address,
            resource_type: node.resource_type.clone(),
            name: node.name.clone(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            aliases: Vec::new(),
        }
    }

    pub fn child(&self, resource_type: &str, name: &str) -> Option<&ResourceSnapshot> {
        self.children
            .iter()
            .find(|child| child.resource_type == resource_type && child.name == name)
    }

    /// Names of children of a type, in order
    pub fn child_names(&self, resource_type: &str) -> Vec<&str> {
        self.children
            .iter()
            .filter(|child| child.resource_type == resource_type)
            .map(|child| child.name.as_str())
            .collect()
    }

    /// Render as a nested object, the shape `read-resource` returns
    pub fn to_model(&self) -> ModelValue {
        let mut entries: BTreeMap<String, ModelValue> = self.attributes.clone();
        for child in &self.children {
            let group = entries
                .entry(child.resource_type.clone())
                .or_insert_with(|| ModelValue::Object(BTreeMap::new()));
            if let ModelValue::Object(group) = group {
                group.insert(child.name.clone(), child.to_model());
            }
        }
        ModelValue::Object(entries)
    }
}
