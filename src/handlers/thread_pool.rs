// Copyright (c) 2025 - Cowboy AI, Inc.
//! Thread Pool Resource
//!
//! `/stack=S/transport=TYPE/thread-pool=NAME` for the transport's `default`,
//! `internal`, `oob` and `timer` pools. Sizing and keep-alive are pushed to
//! the running pool; the queue length needs a new pool.

use std::collections::BTreeMap;

use crate::address::ResourceAddress;
use crate::errors::{ControllerError, ControllerResult};
use crate::model::{AttributeDefinition, AttributeEffect, ModelValue, ResourceNode, ResourceTree, ValueType};
use crate::service::{ServiceKind, ServiceSpec};

use super::{segment, ResourceHandler, ServiceNames};

/// Pools a transport may configure
pub const POOL_NAMES: [&str; 4] = ["default", "internal", "oob", "timer"];

pub struct ThreadPoolHandler {
    names: ServiceNames,
    attributes: Vec<AttributeDefinition>,
}

impl ThreadPoolHandler {
    pub fn new(names: ServiceNames) -> Self {
        Self {
            names,
            attributes: vec![
                AttributeDefinition::new("min-threads", ValueType::Int)
                    .min(0)
                    .default_value(20)
                    .effect(AttributeEffect::Reload),
                AttributeDefinition::new("max-threads", ValueType::Int)
                    .min(1)
                    .default_value(300)
                    .effect(AttributeEffect::Reload),
                AttributeDefinition::new("keepalive-time", ValueType::Int)
                    .min(0)
                    .default_value(60_000)
                    .effect(AttributeEffect::Reload),
                AttributeDefinition::new("queue-length", ValueType::Int)
                    .min(0)
                    .default_value(100)
                    .effect(AttributeEffect::Restart),
            ],
        }
    }
}

impl ThreadPoolHandler {
    fn sizing(&self, attributes: &BTreeMap<String, ModelValue>, name: &str) -> Option<i64> {
        attributes
            .get(name)
            .filter(|value| value.is_defined())
            .or_else(|| self.attribute(name).ok().and_then(|definition| definition.default.as_ref()))
            .and_then(ModelValue::as_int)
    }

    /// min-threads must not exceed max-threads
    fn check_sizing(&self, attributes: &BTreeMap<String, ModelValue>) -> ControllerResult<()> {
        let min = self.sizing(attributes, "min-threads");
        let max = self.sizing(attributes, "max-threads");
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ControllerError::InvalidValue {
                    name: "min-threads".to_string(),
                    reason: format!("{} exceeds max-threads {}", min, max),
                });
            }
        }
        Ok(())
    }
}

impl ResourceHandler for ThreadPoolHandler {
    fn resource_type(&self) -> &'static str {
        "thread-pool"
    }

    fn parent_type(&self) -> &'static str {
        "transport"
    }

    fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    fn validate_add(
        &self,
        _tree: &ResourceTree,
        address: &ResourceAddress,
        attributes: &BTreeMap<String, ModelValue>,
    ) -> ControllerResult<()> {
        let pool = address.name().unwrap_or_default();
        if !POOL_NAMES.contains(&pool) {
            return Err(ControllerError::InvalidValue {
                name: "thread-pool".to_string(),
                reason: format!("'{}' is not one of {:?}", pool, POOL_NAMES),
            });
        }

        self.check_sizing(attributes)
    }

    fn validate_write(
        &self,
        _address: &ResourceAddress,
        attributes: &BTreeMap<String, ModelValue>,
    ) -> ControllerResult<()> {
        self.check_sizing(attributes)
    }

    fn service_specs(&self, address: &ResourceAddress, node: &ResourceNode) -> ControllerResult<Vec<ServiceSpec>> {
        let stack = segment(address, "stack")?;
        Ok(vec![ServiceSpec::new(self.names.thread_pool(stack, &node.name), ServiceKind::ThreadPool)
            .with_config(node.attributes.clone())
            .depends_on(self.names.transport(stack))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn pool(name: &str) -> ResourceAddress {
        ResourceAddress::from_pairs(&[("stack", "s"), ("transport", "UDP"), ("thread-pool", name)]).unwrap()
    }

    #[test_case("default", true ; "default pool")]
    #[test_case("oob", true ; "oob pool")]
    #[test_case("timer", true ; "timer pool")]
    #[test_case("bulk", false ; "unknown pool")]
    fn test_pool_names(name: &str, accepted: bool) {
        let handler = ThreadPoolHandler::new(ServiceNames::new("jgroups"));
        let tree = ResourceTree::new("jgroups");
        let result = handler.validate_add(&tree, &pool(name), &BTreeMap::new());
        assert_eq!(result.is_ok(), accepted);
    }

    #[test]
    fn test_min_above_max_rejected() {
        let handler = ThreadPoolHandler::new(ServiceNames::new("jgroups"));
        let tree = ResourceTree::new("jgroups");
        let mut attributes = BTreeMap::new();
        attributes.insert("min-threads".to_string(), ModelValue::Int(50));
        attributes.insert("max-threads".to_string(), ModelValue::Int(10));
        assert!(handler.validate_add(&tree, &pool("default"), &attributes).is_err());
    }

    #[test_case("min-threads", 500, false ; "min above default max")]
    #[test_case("max-threads", 10, false ; "max below default min")]
    #[test_case("min-threads", 300, true ; "min equal to max")]
    fn test_write_keeps_min_below_max(name: &str, value: i64, accepted: bool) {
        let handler = ThreadPoolHandler::new(ServiceNames::new("jgroups"));
        let mut attributes = BTreeMap::new();
        attributes.insert("min-threads".to_string(), ModelValue::Int(20));
        attributes.insert("max-threads".to_string(), ModelValue::Int(300));
        attributes.insert(name.to_string(), ModelValue::Int(value));
        assert_eq!(handler.validate_write(&pool("default"), &attributes).is_ok(), accepted);
    }

    #[test]
    fn test_keepalive_write_reloads() {
        let handler = ThreadPoolHandler::new(ServiceNames::new("jgroups"));
        assert_eq!(
            handler.attribute("keepalive-time").unwrap().effect,
            AttributeEffect::Reload
        );
        assert_eq!(
            handler.attribute("queue-length").unwrap().effect,
            AttributeEffect::Restart
        );
    }
}
