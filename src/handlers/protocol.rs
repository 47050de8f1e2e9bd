// Copyright (c) 2025 - Cowboy AI, Inc.
//! Protocol Resource
//!
//! `/stack=S/protocol=TYPE`. Protocols keep their insertion order, which is
//! the layering order of the stack; `add-index` inserts at a position among
//! the existing protocols instead of appending.

use crate::address::ResourceAddress;
use crate::errors::ControllerResult;
use crate::model::{AttributeDefinition, AttributeEffect, ModelValue, ResourceNode, ValueType};
use crate::service::{ServiceKind, ServiceSpec};

use super::{segment, ResourceHandler, ServiceNames};

pub struct ProtocolHandler {
    names: ServiceNames,
    attributes: Vec<AttributeDefinition>,
}

impl ProtocolHandler {
    pub fn new(names: ServiceNames) -> Self {
        Self {
            names,
            attributes: vec![
                AttributeDefinition::new("socket-binding", ValueType::String).effect(AttributeEffect::Restart),
                AttributeDefinition::new("properties", ValueType::StringMap).effect(AttributeEffect::Restart),
            ],
        }
    }
}

impl ResourceHandler for ProtocolHandler {
    fn resource_type(&self) -> &'static str {
        "protocol"
    }

    fn parent_type(&self) -> &'static str {
        "stack"
    }

    fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    fn service_specs(&self, address: &ResourceAddress, node: &ResourceNode) -> ControllerResult<Vec<ServiceSpec>> {
        let stack = segment(address, "stack")?;
        let mut config = node.attributes.clone();
        config.insert("type".to_string(), ModelValue::from(node.name.as_str()));
        Ok(vec![ServiceSpec::new(self.names.protocol(stack, &node.name), ServiceKind::Protocol)
            .with_config(config)
            .depends_on(self.names.transport(stack))])
    }
}
