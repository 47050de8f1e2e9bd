// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transactional configuration and service lifecycle for protocol stacks
//!
//! A hierarchical management model (stacks, transports, protocols, thread
//! pools, channels) is kept consistent with the live services it describes.
//! Every mutation runs as a two-phase transaction: the model phase validates
//! and edits the tree, the runtime phase installs, removes, reloads and
//! restarts services. A failure anywhere rolls both back.
//!
//! ```no_run
//! use cim_stack_controller::{Controller, ControllerConfig, ModelValue, Operation, ResourceAddress};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let controller = Controller::new(ControllerConfig::default())?;
//! let stack = ResourceAddress::from_pairs(&[("stack", "udp")])?;
//! let outcome = controller
//!     .submit(Operation::add(stack).with_parameter(
//!         "transport",
//!         ModelValue::object([("type", "UDP")]),
//!     ))
//!     .await?;
//! assert!(outcome.is_success());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod alias;
pub mod config;
pub mod controller;
pub mod errors;
pub mod handlers;
pub mod model;
pub mod operation;
pub mod service;
pub mod state_machine;
pub mod subsystem;
pub mod telemetry;
pub mod transaction;

// Re-export commonly used types
pub use address::{PathElement, ResourceAddress};
pub use alias::{AddressAlias, AliasKey, AliasResolver, AttributeAlias};
pub use config::ControllerConfig;
pub use controller::Controller;
pub use errors::{ControllerError, ControllerResult, InconsistentState};
pub use handlers::{HandlerRegistry, ResourceHandler, ServiceNames};
pub use model::{AttributeEffect, ModelValue, ResourceSnapshot, ResourceTree};
pub use operation::{ExecutionOptions, Operation, OperationKind, OperationOutcome, OperationResult, ReadOptions};
pub use service::{
    LoggingServiceFactory, Service, ServiceDescriptor, ServiceFailure, ServiceFactory, ServiceGraph, ServiceKind,
    ServiceName, ServiceSpec,
};
pub use state_machine::{ServiceState, TransactionState};
pub use telemetry::init_tracing;
