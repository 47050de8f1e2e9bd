// Copyright (c) 2025 - Cowboy AI, Inc.
//! Handler Registry

use std::collections::HashMap;
use std::sync::Arc;

use super::ResourceHandler;
use crate::address::ResourceAddress;
use crate::errors::{ControllerError, ControllerResult};

/// Resource handlers keyed by resource type
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) -> ControllerResult<()> {
        let resource_type = handler.resource_type();
        if self.handlers.contains_key(resource_type) {
            return Err(ControllerError::Validation(format!(
                "a handler for '{}' is already registered",
                resource_type
            )));
        }
        self.handlers.insert(resource_type, handler);
        Ok(())
    }

    pub fn get(&self, resource_type: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.handlers.get(resource_type).cloned()
    }

    /// Handler for the leaf segment of `address`
    pub fn handler_for(&self, address: &ResourceAddress) -> ControllerResult<Arc<dyn ResourceHandler>> {
        let resource_type = address
            .resource_type()
            .ok_or_else(|| ControllerError::UnknownResourceType("subsystem".to_string()))?;
        self.get(resource_type)
            .ok_or_else(|| ControllerError::UnknownResourceType(resource_type.to_string()))
    }

    /// Registered types, sorted
    pub fn resource_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.handlers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}
