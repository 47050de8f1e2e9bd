// Copyright (c) 2025 - Cowboy AI, Inc.
//! Stack Resource
//!
//! `/stack=S` owns the stack's channel factory. An add may carry the
//! transport and protocols inline:
//!
//! ```text
//! add(stack=S, transport={type=UDP}, protocols=[{type=MPING},{type=FLUSH}])
//!   ≡ add(stack=S); add(stack=S/transport=UDP);
//!     add(stack=S/protocol=MPING); add(stack=S/protocol=FLUSH)
//! ```

use crate::address::ResourceAddress;
use crate::alias::ROOT_TYPE;
use crate::errors::{ControllerError, ControllerResult};
use crate::model::{AttributeDefinition, AttributeEffect, ModelValue, ResourceNode, ValueType};
use crate::operation::Operation;
use crate::service::{ServiceKind, ServiceSpec};

use super::{segment, ResourceHandler, ServiceNames, ADD_INDEX};

pub const TRANSPORT_PARAMETER: &str = "transport";
pub const PROTOCOLS_PARAMETER: &str = "protocols";

pub struct StackHandler {
    names: ServiceNames,
    attributes: Vec<AttributeDefinition>,
}

impl StackHandler {
    pub fn new(names: ServiceNames) -> Self {
        Self {
            names,
            attributes: vec![AttributeDefinition::new("statistics-enabled", ValueType::Bool)
                .default_value(false)
                .effect(AttributeEffect::Reload)],
        }
    }
}

/// Follow-up add for an inline `{type=X, ...}` child specification
fn inline_child(stack: &ResourceAddress, child_type: &str, spec: &ModelValue) -> ControllerResult<Operation> {
    let mut parameters = spec
        .as_object()
        .cloned()
        .ok_or_else(|| ControllerError::InvalidValue {
            name: child_type.to_string(),
            reason: format!("expected an object, got {}", spec.type_name()),
        })?;
    let protocol = parameters
        .remove("type")
        .ok_or_else(|| ControllerError::MissingParameter(format!("{}.type", child_type)))?;
    let protocol = protocol.as_str().ok_or_else(|| ControllerError::InvalidValue {
        name: format!("{}.type", child_type),
        reason: "expected a protocol name".to_string(),
    })?;

    let mut operation = Operation::add(stack.child(child_type, protocol)?);
    operation.parameters = parameters;
    Ok(operation)
}

impl ResourceHandler for StackHandler {
    fn resource_type(&self) -> &'static str {
        "stack"
    }

    fn parent_type(&self) -> &'static str {
        ROOT_TYPE
    }

    fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    fn structural_parameters(&self) -> &'static [&'static str] {
        &[ADD_INDEX, TRANSPORT_PARAMETER, PROTOCOLS_PARAMETER]
    }

    fn expand(&self, operation: &mut Operation) -> ControllerResult<Vec<Operation>> {
        let mut follow_ups = Vec::new();

        match operation.parameters.remove(TRANSPORT_PARAMETER) {
            None | Some(ModelValue::Undefined) => {}
            Some(transport) => follow_ups.push(inline_child(&operation.address, "transport", &transport)?),
        }

        match operation.parameters.remove(PROTOCOLS_PARAMETER) {
            None | Some(ModelValue::Undefined) => {}
            Some(ModelValue::List(protocols)) => {
                for protocol in &protocols {
                    follow_ups.push(inline_child(&operation.address, "protocol", protocol)?);
                }
            }
            Some(other) => {
                return Err(ControllerError::InvalidValue {
                    name: PROTOCOLS_PARAMETER.to_string(),
                    reason: format!("expected a list, got {}", other.type_name()),
                })
            }
        }

        Ok(follow_ups)
    }

    fn service_specs(&self, address: &ResourceAddress, node: &ResourceNode) -> ControllerResult<Vec<ServiceSpec>> {
        let stack = segment(address, "stack")?;
        let mut config = node.attributes.clone();
        config.insert("stack".to_string(), ModelValue::from(stack));
        Ok(vec![ServiceSpec::new(self.names.channel_factory(stack), ServiceKind::ChannelFactory)
            .with_config(config)
            .depends_on(self.names.transport(stack))])
    }
}
