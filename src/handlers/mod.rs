// Copyright (c) 2025 - Cowboy AI, Inc.
//! Operation Handlers
//!
//! One [`ResourceHandler`] per resource type, looked up by the type of the
//! address's leaf segment.
//!
//! # Architecture
//!
//! ```text
//! Operation ──> HandlerRegistry ──> ResourceHandler
//!                                      │
//!                   model phase        │        runtime phase
//!              ModelContext (tree) <───┴───> RuntimeContext (graph)
//!                   │                                │
//!                   └──── ModelChange ──> drives ────┘
//! ```
//!
//! The model phase validates parameters and mutates the tree. The runtime
//! phase is driven by the model changes the step produced: an added node
//! installs its services, a removed subtree removes them in reverse
//! dependency order, a written attribute reloads or restarts them according
//! to the attribute's [`AttributeEffect`].
//!
//! Handlers are mostly declarative: a resource type names its attributes,
//! its parent type, and the services a node owns. The default trait methods
//! do the rest.

pub mod channel;
pub mod context;
pub mod protocol;
pub mod registry;
pub mod stack;
pub mod thread_pool;
pub mod transport;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::address::ResourceAddress;
use crate::alias::ROOT_TYPE;
use crate::errors::{ControllerError, ControllerResult};
use crate::model::{
    validate_parameters, AttributeDefinition, AttributeEffect, ModelValue, ResourceNode, ResourceTree,
};
use crate::operation::Operation;
use crate::service::{ServiceName, ServiceSpec};

pub use channel::ChannelHandler;
pub use context::{ModelContext, RuntimeContext};
pub use protocol::ProtocolHandler;
pub use registry::HandlerRegistry;
pub use stack::StackHandler;
pub use thread_pool::ThreadPoolHandler;
pub use transport::TransportHandler;

/// Parameter positioning a child among siblings of its type
pub const ADD_INDEX: &str = "add-index";

/// Naming scheme of the services owned by protocol-stack resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceNames {
    root: ServiceName,
}

impl ServiceNames {
    pub fn new(subsystem: &str) -> Self {
        Self {
            root: ServiceName::new(subsystem),
        }
    }

    pub fn stack(&self, stack: &str) -> ServiceName {
        self.root.append("stack").append(stack)
    }

    pub fn channel_factory(&self, stack: &str) -> ServiceName {
        self.stack(stack).append("channel-factory")
    }

    pub fn transport(&self, stack: &str) -> ServiceName {
        self.stack(stack).append("transport")
    }

    pub fn protocol(&self, stack: &str, protocol: &str) -> ServiceName {
        self.stack(stack).append("protocol").append(protocol)
    }

    pub fn thread_pool(&self, stack: &str, pool: &str) -> ServiceName {
        self.transport(stack).append("thread-pool").append(pool)
    }

    pub fn channel(&self, channel: &str) -> ServiceName {
        self.root.append("channel").append(channel)
    }
}

/// Value of the segment `key`, which the address must contain
pub(crate) fn segment<'a>(address: &'a ResourceAddress, key: &str) -> ControllerResult<&'a str> {
    address
        .value_of(key)
        .ok_or_else(|| ControllerError::Validation(format!("{} has no {} segment", address, key)))
}

/// Parse the optional `add-index` parameter
pub(crate) fn add_index(operation: &Operation) -> ControllerResult<Option<usize>> {
    let value = match operation.parameter(ADD_INDEX) {
        None | Some(ModelValue::Undefined) => return Ok(None),
        Some(value) => value,
    };
    let index = match value {
        ModelValue::Int(n) => Some(*n),
        ModelValue::String(s) => s.parse::<i64>().ok(),
        _ => None,
    };
    match index {
        Some(n) if n >= 0 => Ok(Some(n as usize)),
        _ => Err(ControllerError::InvalidValue {
            name: ADD_INDEX.to_string(),
            reason: format!("{} is not a position", value),
        }),
    }
}

/// Per-resource-type add, remove and write-attribute logic
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Type keyed by the leaf segment
    fn resource_type(&self) -> &'static str;

    /// Type of the parent resource
    fn parent_type(&self) -> &'static str;

    fn attributes(&self) -> &[AttributeDefinition];

    /// Add parameters the handler consumes itself instead of storing
    fn structural_parameters(&self) -> &'static [&'static str] {
        &[ADD_INDEX]
    }

    /// Whether removing a node stops dependents outside its subtree
    /// instead of failing while they are up
    fn cascade_on_remove(&self) -> bool {
        false
    }

    /// Services owned by a node of this type
    fn service_specs(&self, address: &ResourceAddress, node: &ResourceNode) -> ControllerResult<Vec<ServiceSpec>>;

    /// Split inline child specifications off an add
    ///
    /// Returns follow-up adds that run right after this one, in order.
    fn expand(&self, _operation: &mut Operation) -> ControllerResult<Vec<Operation>> {
        Ok(Vec::new())
    }

    /// Type-specific add checks against the current tree
    fn validate_add(
        &self,
        _tree: &ResourceTree,
        _address: &ResourceAddress,
        _attributes: &BTreeMap<String, ModelValue>,
    ) -> ControllerResult<()> {
        Ok(())
    }

    /// Cross-attribute checks against a node's attributes after a write
    fn validate_write(
        &self,
        _address: &ResourceAddress,
        _attributes: &BTreeMap<String, ModelValue>,
    ) -> ControllerResult<()> {
        Ok(())
    }

    fn attribute(&self, name: &str) -> ControllerResult<&AttributeDefinition> {
        self.attributes()
            .iter()
            .find(|definition| definition.name == name)
            .ok_or_else(|| ControllerError::UnknownAttribute {
                resource_type: self.resource_type().to_string(),
                name: name.to_string(),
            })
    }

    fn model_add(&self, ctx: &mut ModelContext<'_>, operation: &Operation) -> ControllerResult<()> {
        let address = &operation.address;
        let element = address
            .last()
            .ok_or_else(|| ControllerError::Validation("the root cannot be added".to_string()))?;
        let parent = address.parent().unwrap_or_default();
        let parent_type = parent.resource_type().unwrap_or(ROOT_TYPE);
        if parent_type != self.parent_type() {
            return Err(ControllerError::Validation(format!(
                "{} must be a child of {}, not {}",
                self.resource_type(),
                self.parent_type(),
                parent_type
            )));
        }

        let attributes = validate_parameters(
            self.resource_type(),
            self.attributes(),
            &operation.parameters,
            self.structural_parameters(),
        )?;
        let index = add_index(operation)?;
        self.validate_add(ctx.tree(), address, &attributes)?;

        let node = ResourceNode::new(element.key.clone(), element.value.clone()).with_attributes(attributes);
        let services = self
            .service_specs(address, &node)?
            .into_iter()
            .map(|spec| spec.name)
            .collect();
        ctx.add(address, node.attributes, services, index)
    }

    fn model_remove(&self, ctx: &mut ModelContext<'_>, operation: &Operation) -> ControllerResult<()> {
        ctx.remove(&operation.address).map(|_| ())
    }

    fn model_write(
        &self,
        ctx: &mut ModelContext<'_>,
        address: &ResourceAddress,
        name: &str,
        value: &ModelValue,
    ) -> ControllerResult<()> {
        let definition = self.attribute(name)?;
        let value = match definition.validate(value)? {
            ModelValue::Undefined => definition.default.clone().unwrap_or_default(),
            value => value,
        };
        let mut attributes = ctx
            .tree()
            .get(address)
            .ok_or_else(|| ControllerError::ResourceNotFound(address.clone()))?
            .attributes
            .clone();
        attributes.insert(name.to_string(), value.clone());
        self.validate_write(address, &attributes)?;
        ctx.write(address, name, value)
    }

    /// Current value of an attribute, or its default
    fn read_attribute(&self, tree: &ResourceTree, address: &ResourceAddress, name: &str) -> ControllerResult<ModelValue> {
        let definition = self.attribute(name)?;
        let node = tree
            .get(address)
            .ok_or_else(|| ControllerError::ResourceNotFound(address.clone()))?;
        Ok(node
            .attribute(name)
            .cloned()
            .or_else(|| definition.default.clone())
            .unwrap_or_default())
    }

    /// Install the services of an added node
    async fn runtime_added(
        &self,
        ctx: &mut RuntimeContext<'_>,
        address: &ResourceAddress,
        node: &ResourceNode,
    ) -> ControllerResult<()> {
        for spec in self.service_specs(address, node)? {
            ctx.install(spec)?;
        }
        Ok(())
    }

    /// Remove the services of a removed subtree, dependents first
    async fn runtime_removed(&self, ctx: &mut RuntimeContext<'_>, node: &ResourceNode) -> ControllerResult<()> {
        let order = ctx.graph().removal_order(&node.subtree_services());
        for name in order {
            if ctx.graph().snapshot(&name).is_installed() {
                ctx.remove(&name, self.cascade_on_remove()).await?;
            }
        }
        Ok(())
    }

    /// Push a written attribute to the node's services
    async fn runtime_written(
        &self,
        ctx: &mut RuntimeContext<'_>,
        address: &ResourceAddress,
        node: &ResourceNode,
        name: &str,
    ) -> ControllerResult<()> {
        let effect = self.attribute(name)?.effect;
        if effect == AttributeEffect::ModelOnly {
            return Ok(());
        }
        for spec in self.service_specs(address, node)? {
            if !ctx.graph().snapshot(&spec.name).is_installed() {
                continue;
            }
            match effect {
                AttributeEffect::Reload => ctx.reconfigure(&spec.name, spec.config).await?,
                AttributeEffect::Restart => ctx.restart(spec).await?,
                AttributeEffect::ModelOnly => {}
            }
        }
        Ok(())
    }
}
