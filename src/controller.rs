// Copyright (c) 2025 - Cowboy AI, Inc.
//! Controller
//!
//! Owns the resource tree and the service graph and serializes every
//! submission through one execution lock. Reads take the same lock, so a
//! reader never observes a transaction half way.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::address::ResourceAddress;
use crate::alias::AliasResolver;
use crate::config::ControllerConfig;
use crate::errors::{ControllerError, ControllerResult, InconsistentState};
use crate::handlers::{HandlerRegistry, ServiceNames};
use crate::model::{ResourceSnapshot, ResourceTree};
use crate::operation::{ExecutionOptions, Operation, OperationOutcome, ReadOptions};
use crate::service::graph::ServiceDescriptor;
use crate::service::{LoggingServiceFactory, ServiceFactory, ServiceGraph, ServiceName};
use crate::state_machine::ServiceState;
use crate::subsystem::Subsystem;
use crate::transaction::TransactionCoordinator;

struct ControllerState {
    tree: ResourceTree,
    graph: ServiceGraph,
    shut_down: bool,
}

/// Transactional controller for one protocol-stack subsystem
pub struct Controller {
    state: Mutex<ControllerState>,
    registry: HandlerRegistry,
    aliases: AliasResolver,
    factory: Arc<dyn ServiceFactory>,
    names: ServiceNames,
    config: ControllerConfig,
}

impl Controller {
    /// Controller whose services only log their lifecycle
    pub fn new(config: ControllerConfig) -> ControllerResult<Self> {
        Self::with_factory(config, Arc::new(LoggingServiceFactory))
    }

    pub fn with_factory(config: ControllerConfig, factory: Arc<dyn ServiceFactory>) -> ControllerResult<Self> {
        let Subsystem {
            registry,
            aliases,
            names,
        } = Subsystem::build(&config)?;
        let state = ControllerState {
            tree: ResourceTree::new(config.subsystem.clone()),
            graph: ServiceGraph::new(config.start_timeout, config.stop_timeout),
            shut_down: false,
        };
        info!(
            subsystem = %config.subsystem,
            legacy_aliases = config.legacy_aliases,
            "controller ready"
        );
        Ok(Self {
            state: Mutex::new(state),
            registry,
            aliases,
            factory,
            names,
            config,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn names(&self) -> &ServiceNames {
        &self.names
    }

    /// Execute one operation or composite as a single transaction
    pub async fn submit(&self, operation: Operation) -> Result<OperationOutcome, InconsistentState> {
        self.submit_with(operation, ExecutionOptions::default()).await
    }

    /// Execute with a rollback hook or a cancellation token
    pub async fn submit_with(
        &self,
        operation: Operation,
        options: ExecutionOptions,
    ) -> Result<OperationOutcome, InconsistentState> {
        let mut state = self.state.lock().await;
        if state.shut_down {
            warn!(operation = operation.kind.name(), address = %operation.address, "submission after shutdown");
            return Ok(OperationOutcome::Failed {
                failure: ControllerError::ShutDown,
            });
        }

        let ControllerState { tree, graph, .. } = &mut *state;
        TransactionCoordinator::new(&self.registry, &self.aliases, self.factory.as_ref())
            .execute(tree, graph, operation, &options)
            .await
    }

    /// Read a resource through either a canonical or a legacy address
    pub async fn read_resource(
        &self,
        address: &ResourceAddress,
        options: ReadOptions,
    ) -> ControllerResult<ResourceSnapshot> {
        let state = self.state.lock().await;
        if state.shut_down {
            return Err(ControllerError::ShutDown);
        }
        let canonical = self.aliases.resolve(address, &state.tree)?;
        let mut snapshot = state.tree.read(&canonical, options.recursive)?;
        if options.include_aliases {
            self.aliases.project_snapshot(&mut snapshot, &state.tree);
        }
        Ok(snapshot)
    }

    /// Current lifecycle state; `Uninstalled` for unknown services
    pub async fn service_state(&self, name: &ServiceName) -> ServiceState {
        self.state.lock().await.graph.snapshot(name)
    }

    pub async fn service_descriptor(&self, name: &ServiceName) -> Option<ServiceDescriptor> {
        self.state.lock().await.graph.descriptor(name)
    }

    /// Installed services, sorted by name
    pub async fn installed_services(&self) -> Vec<ServiceName> {
        self.state.lock().await.graph.installed()
    }

    /// Legacy addresses the canonical `address` can also be reached through
    pub async fn aliases_of(&self, address: &ResourceAddress) -> Vec<ResourceAddress> {
        let state = self.state.lock().await;
        self.aliases.project(address, &state.tree)
    }

    /// Stop every service, dependents first, and close the controller
    ///
    /// Later submissions fail with [`ControllerError::ShutDown`]. A second
    /// call is a no-op.
    pub async fn shutdown(&self) -> ControllerResult<()> {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return Ok(());
        }
        state.shut_down = true;

        let failures = state.graph.shutdown().await;
        state.tree.clear();
        if let Some(first) = failures.first() {
            error!(failures = ?failures, "controller shut down with service failures");
            return Err(first.clone());
        }
        info!(subsystem = %self.config.subsystem, "controller shut down");
        Ok(())
    }
}
