// Copyright (c) 2025 - Cowboy AI, Inc.
//! Protocol Stack Subsystem
//!
//! Wires the resource types and their legacy aliases.
//!
//! ```text
//! /                                    subsystem
//! ├── stack=S                          channel factory
//! │   ├── transport=TYPE               transport (one per stack)
//! │   │   └── thread-pool=NAME         default | internal | oob | timer
//! │   └── protocol=TYPE ...            protocol layers, in order
//! └── channel=C                        channel on stack S
//! ```
//!
//! Legacy views:
//!
//! - `stack=S/transport=TRANSPORT` names the stack's transport; a legacy add
//!   takes the transport type from its `type` parameter and replaces an
//!   existing transport of another type in the same step
//! - `keepalive-seconds` on a thread pool is `keepalive-time` in seconds
//! - `property-list` (a list of single-entry objects) is `properties`
//! - `add-protocol` / `remove-protocol` on a stack add or remove a protocol

use std::sync::Arc;

use crate::address::PathElement;
use crate::alias::{AddressAlias, AliasKey, AliasResolver, AttributeAlias};
use crate::config::ControllerConfig;
use crate::errors::ControllerResult;
use crate::handlers::{
    ChannelHandler, HandlerRegistry, ProtocolHandler, ServiceNames, StackHandler, ThreadPoolHandler,
    TransportHandler,
};
use crate::model::ModelValue;

/// Name of the legacy singleton transport segment
pub const LEGACY_TRANSPORT: &str = "TRANSPORT";

/// Handlers, aliases and naming of the subsystem
pub struct Subsystem {
    pub registry: HandlerRegistry,
    pub aliases: AliasResolver,
    pub names: ServiceNames,
}

impl Subsystem {
    pub fn build(config: &ControllerConfig) -> ControllerResult<Self> {
        let names = ServiceNames::new(&config.subsystem);
        let registry = handlers(&names)?;
        let aliases = if config.legacy_aliases {
            legacy_aliases()?
        } else {
            AliasResolver::new()
        };
        Ok(Self {
            registry,
            aliases,
            names,
        })
    }
}

pub fn handlers(names: &ServiceNames) -> ControllerResult<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(StackHandler::new(names.clone())))?;
    registry.register(Arc::new(TransportHandler::new(names.clone())))?;
    registry.register(Arc::new(ProtocolHandler::new(names.clone())))?;
    registry.register(Arc::new(ThreadPoolHandler::new(names.clone())))?;
    registry.register(Arc::new(ChannelHandler::new(names.clone())))?;
    Ok(registry)
}

fn seconds_to_millis(value: &ModelValue) -> Option<ModelValue> {
    value.as_int()?.checked_mul(1000).map(ModelValue::Int)
}

/// Only whole seconds have a legacy form
fn millis_to_seconds(value: &ModelValue) -> Option<ModelValue> {
    value
        .as_int()
        .filter(|ms| ms % 1000 == 0)
        .map(|ms| ModelValue::Int(ms / 1000))
}

/// Legacy lists must be sorted by key without duplicates, the order the
/// canonical map presents them in
fn property_list_to_map(value: &ModelValue) -> Option<ModelValue> {
    let items = value.as_list()?;
    let map = value.to_string_map()?;
    if map.len() != items.len() {
        return None;
    }
    let sorted = items
        .iter()
        .zip(map.keys())
        .all(|(item, key)| item.get(key).is_some());
    sorted.then(|| ModelValue::from(map))
}

fn map_to_property_list(value: &ModelValue) -> Option<ModelValue> {
    let map = value.to_string_map()?;
    Some(ModelValue::List(
        map.into_iter()
            .map(|(key, value)| ModelValue::object([(key, value)]))
            .collect(),
    ))
}

pub fn legacy_aliases() -> ControllerResult<AliasResolver> {
    let mut aliases = AliasResolver::new();

    aliases.register_address(
        AddressAlias::new(
            "stack",
            PathElement::new("transport", LEGACY_TRANSPORT)?,
            "transport",
            AliasKey::FromParameter("type".to_string()),
        )
        .replacing(),
    )?;

    aliases.register_attribute(
        AttributeAlias::new(
            "thread-pool",
            "keepalive-seconds",
            "keepalive-time",
            seconds_to_millis,
            millis_to_seconds,
        )
        .with_samples(vec![ModelValue::Int(0), ModelValue::Int(1), ModelValue::Int(60), ModelValue::Int(3600)])
        .with_canonical_samples(vec![
            ModelValue::Int(0),
            ModelValue::Int(999),
            ModelValue::Int(1000),
            ModelValue::Int(1500),
            ModelValue::Int(60_000),
        ]),
    )?;

    let property_samples = vec![
        ModelValue::List(Vec::new()),
        ModelValue::List(vec![
            ModelValue::object([("enable_bundling", "true")]),
            ModelValue::object([("ip_ttl", "2")]),
        ]),
    ];
    let property_map_samples = vec![
        ModelValue::object(Vec::<(String, String)>::new()),
        ModelValue::object([("enable_bundling", "true"), ("ip_ttl", "2")]),
    ];
    for resource_type in ["transport", "protocol"] {
        aliases.register_attribute(
            AttributeAlias::new(
                resource_type,
                "property-list",
                "properties",
                property_list_to_map,
                map_to_property_list,
            )
            .with_samples(property_samples.clone())
            .with_canonical_samples(property_map_samples.clone()),
        )?;
    }

    Ok(aliases)
}
