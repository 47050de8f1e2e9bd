// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transport Resource
//!
//! `/stack=S/transport=TYPE`, at most one per stack. Everything else in the
//! stack runs on top of the transport, so removing it stops the stack's
//! running services instead of refusing; they start again once a transport
//! is back.

use std::collections::BTreeMap;

use crate::address::ResourceAddress;
use crate::errors::{ControllerError, ControllerResult};
use crate::model::{AttributeDefinition, AttributeEffect, ModelValue, ResourceNode, ResourceTree, ValueType};
use crate::service::{ServiceKind, ServiceSpec};

use super::{segment, ResourceHandler, ServiceNames};

pub struct TransportHandler {
    names: ServiceNames,
    attributes: Vec<AttributeDefinition>,
}

impl TransportHandler {
    pub fn new(names: ServiceNames) -> Self {
        Self {
            names,
            attributes: vec![
                AttributeDefinition::new("socket-binding", ValueType::String).effect(AttributeEffect::Restart),
                AttributeDefinition::new("diagnostics-socket-binding", ValueType::String)
                    .effect(AttributeEffect::Restart),
                AttributeDefinition::new("site", ValueType::String).effect(AttributeEffect::Reload),
                AttributeDefinition::new("rack", ValueType::String).effect(AttributeEffect::Reload),
                AttributeDefinition::new("machine", ValueType::String).effect(AttributeEffect::Reload),
                AttributeDefinition::new("properties", ValueType::StringMap).effect(AttributeEffect::Restart),
            ],
        }
    }
}

impl ResourceHandler for TransportHandler {
    fn resource_type(&self) -> &'static str {
        "transport"
    }

    fn parent_type(&self) -> &'static str {
        "stack"
    }

    fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    fn cascade_on_remove(&self) -> bool {
        true
    }

    fn validate_add(
        &self,
        tree: &ResourceTree,
        address: &ResourceAddress,
        _attributes: &BTreeMap<String, ModelValue>,
    ) -> ControllerResult<()> {
        let stack = address.parent().unwrap_or_default();
        match tree.child_names(&stack, self.resource_type()).first() {
            Some(existing) => Err(ControllerError::DuplicateResource(
                stack.child(self.resource_type(), existing)?,
            )),
            None => Ok(()),
        }
    }

    fn service_specs(&self, address: &ResourceAddress, node: &ResourceNode) -> ControllerResult<Vec<ServiceSpec>> {
        let stack = segment(address, "stack")?;
        let mut config = node.attributes.clone();
        config.insert("type".to_string(), ModelValue::from(node.name.as_str()));
        Ok(vec![
            ServiceSpec::new(self.names.transport(stack), ServiceKind::Transport).with_config(config)
        ])
    }
}
