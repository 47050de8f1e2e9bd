// Copyright (c) 2025 - Cowboy AI, Inc.
//! Channel Resource
//!
//! `/channel=C` is a running channel created from a stack's channel factory.
//! While it is up, the stack it uses cannot be removed.

use crate::address::ResourceAddress;
use crate::alias::ROOT_TYPE;
use crate::errors::{ControllerError, ControllerResult};
use crate::model::{AttributeDefinition, AttributeEffect, ModelValue, ResourceNode, ValueType};
use crate::service::{ServiceKind, ServiceSpec};

use super::{ResourceHandler, ServiceNames};

pub struct ChannelHandler {
    names: ServiceNames,
    attributes: Vec<AttributeDefinition>,
}

impl ChannelHandler {
    pub fn new(names: ServiceNames) -> Self {
        Self {
            names,
            attributes: vec![
                AttributeDefinition::new("stack", ValueType::String)
                    .required()
                    .effect(AttributeEffect::Restart),
                AttributeDefinition::new("cluster", ValueType::String).effect(AttributeEffect::Restart),
                AttributeDefinition::new("statistics-enabled", ValueType::Bool)
                    .default_value(false)
                    .effect(AttributeEffect::Reload),
            ],
        }
    }
}

impl ResourceHandler for ChannelHandler {
    fn resource_type(&self) -> &'static str {
        "channel"
    }

    fn parent_type(&self) -> &'static str {
        ROOT_TYPE
    }

    fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    fn service_specs(&self, _address: &ResourceAddress, node: &ResourceNode) -> ControllerResult<Vec<ServiceSpec>> {
        let stack = node
            .attribute("stack")
            .and_then(ModelValue::as_str)
            .ok_or_else(|| ControllerError::MissingParameter("stack".to_string()))?;

        let mut config = node.attributes.clone();
        config
            .entry("cluster".to_string())
            .or_insert_with(|| ModelValue::from(node.name.as_str()));
        Ok(vec![ServiceSpec::new(self.names.channel(&node.name), ServiceKind::Channel)
            .with_config(config)
            .depends_on(self.names.channel_factory(stack))])
    }
}
