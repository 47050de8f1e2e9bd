// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer
//!
//! Long-lived runtime services kept consistent with the management model.
//!
//! # Architecture
//!
//! ```text
//! Operation Handler (runtime phase)
//!     ↓
//! ServiceGraph  ── owns ──> ServiceEntry { spec, Arc<dyn Service>, state }
//!     ↓
//! Service collaborator (start / stop / reconfigure)
//! ```
//!
//! The graph treats services as opaque: it only knows their names,
//! dependencies and lifecycle state. What a service actually does (open
//! sockets, spin up thread pools) lives behind the [`Service`] trait, and the
//! [`ServiceFactory`] decides which implementation backs a [`ServiceSpec`].
//!
//! # Ordering
//!
//! Installs and starts happen in dependency order, removals in reverse
//! dependency order. Rollback relies on this.

pub mod factory;
pub mod graph;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::ModelValue;

pub use factory::{LoggingService, LoggingServiceFactory, ServiceFactory};
pub use graph::{RemovedService, ServiceDescriptor, ServiceGraph, StartReport};

/// Dotted service name, e.g. `jgroups.stack.udp.channel-factory`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of a sub-service, `self.part`
    pub fn append(&self, part: &str) -> Self {
        Self(format!("{}.{}", self.0, part))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `self` equals `prefix` or is one of its sub-services
    pub fn is_under(&self, prefix: &ServiceName) -> bool {
        self.0 == prefix.0 || self.0.starts_with(&format!("{}.", prefix.0))
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a service provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    ChannelFactory,
    Transport,
    Protocol,
    ThreadPool,
    Channel,
}

/// Everything needed to create and wire a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: ServiceName,
    pub kind: ServiceKind,
    pub config: BTreeMap<String, ModelValue>,
    pub dependencies: Vec<ServiceName>,
}

impl ServiceSpec {
    pub fn new(name: ServiceName, kind: ServiceKind) -> Self {
        Self {
            name,
            kind,
            config: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: BTreeMap<String, ModelValue>) -> Self {
        self.config = config;
        self
    }

    pub fn depends_on(mut self, dependency: ServiceName) -> Self {
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }
}

/// Failure reported by a service collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ServiceFailure(pub String);

/// External runtime service with a start/stop lifecycle
///
/// Calls may complete asynchronously; the graph awaits each one before
/// moving on.
#[async_trait]
pub trait Service: Send + Sync {
    /// Start the service
    async fn start(&self) -> Result<(), ServiceFailure>;

    /// Stop the service
    async fn stop(&self) -> Result<(), ServiceFailure>;

    /// Apply a reloadable configuration change without restarting
    async fn reconfigure(&self, _config: &BTreeMap<String, ModelValue>) -> Result<(), ServiceFailure> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_hierarchy() {
        let stack = ServiceName::new("jgroups.stack.udp");
        let transport = stack.append("transport");
        assert_eq!(transport.as_str(), "jgroups.stack.udp.transport");
        assert!(transport.is_under(&stack));
        assert!(!ServiceName::new("jgroups.stack.udp2").is_under(&stack));
    }

    #[test]
    fn test_spec_dependencies_are_unique() {
        let dependency = ServiceName::new("a");
        let spec = ServiceSpec::new(ServiceName::new("b"), ServiceKind::Protocol)
            .depends_on(dependency.clone())
            .depends_on(dependency);
        assert_eq!(spec.dependencies.len(), 1);
    }
}
