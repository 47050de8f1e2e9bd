// Copyright (c) 2025 - Cowboy AI, Inc.
//! Management Operations
//!
//! An [`Operation`] targets one resource address. Composites bundle several
//! operations that commit or roll back together.
//!
//! ```rust
//! use cim_stack_controller::address::ResourceAddress;
//! use cim_stack_controller::operation::Operation;
//!
//! let stack = ResourceAddress::from_pairs(&[("stack", "tcp")]).unwrap();
//! let transport = stack.child("transport", "TCP").unwrap();
//! let composite = Operation::composite(vec![
//!     Operation::add(stack),
//!     Operation::add(transport).with_parameter("socket-binding", "jgroups-tcp"),
//! ]);
//! assert_eq!(composite.steps().len(), 2);
//! ```

use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use crate::address::ResourceAddress;
use crate::errors::ControllerError;
use crate::model::{ModelValue, ResourceSnapshot};

/// Options of a `read-resource`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Include the whole subtree instead of child names only
    pub recursive: bool,
    /// List legacy addresses that name each resource
    pub include_aliases: bool,
}

impl ReadOptions {
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            include_aliases: false,
        }
    }

    pub fn with_aliases(mut self) -> Self {
        self.include_aliases = true;
        self
    }
}

/// What an operation does
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    Add,
    Remove,
    WriteAttribute { name: String, value: ModelValue },
    ReadAttribute { name: String },
    ReadResource(ReadOptions),
    /// Legacy `add-protocol(type=X)` on a stack
    AddProtocol,
    /// Legacy `remove-protocol(type=X)` on a stack
    RemoveProtocol,
    Composite(Vec<Operation>),
}

impl OperationKind {
    /// Management name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Remove => "remove",
            OperationKind::WriteAttribute { .. } => "write-attribute",
            OperationKind::ReadAttribute { .. } => "read-attribute",
            OperationKind::ReadResource(_) => "read-resource",
            OperationKind::AddProtocol => "add-protocol",
            OperationKind::RemoveProtocol => "remove-protocol",
            OperationKind::Composite(_) => "composite",
        }
    }
}

/// A management request against one address
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub address: ResourceAddress,
    pub kind: OperationKind,
    pub parameters: BTreeMap<String, ModelValue>,
}

impl Operation {
    pub fn new(address: ResourceAddress, kind: OperationKind) -> Self {
        Self {
            address,
            kind,
            parameters: BTreeMap::new(),
        }
    }

    pub fn add(address: ResourceAddress) -> Self {
        Self::new(address, OperationKind::Add)
    }

    pub fn remove(address: ResourceAddress) -> Self {
        Self::new(address, OperationKind::Remove)
    }

    pub fn write_attribute(address: ResourceAddress, name: &str, value: impl Into<ModelValue>) -> Self {
        Self::new(
            address,
            OperationKind::WriteAttribute {
                name: name.to_string(),
                value: value.into(),
            },
        )
    }

    /// Clear an attribute back to its default
    pub fn undefine_attribute(address: ResourceAddress, name: &str) -> Self {
        Self::write_attribute(address, name, ModelValue::Undefined)
    }

    pub fn read_attribute(address: ResourceAddress, name: &str) -> Self {
        Self::new(
            address,
            OperationKind::ReadAttribute {
                name: name.to_string(),
            },
        )
    }

    pub fn read_resource(address: ResourceAddress, options: ReadOptions) -> Self {
        Self::new(address, OperationKind::ReadResource(options))
    }

    /// Legacy protocol add on a stack
    pub fn add_protocol(stack: ResourceAddress, protocol_type: &str) -> Self {
        Self::new(stack, OperationKind::AddProtocol).with_parameter("type", protocol_type)
    }

    /// Legacy protocol removal on a stack
    pub fn remove_protocol(stack: ResourceAddress, protocol_type: &str) -> Self {
        Self::new(stack, OperationKind::RemoveProtocol).with_parameter("type", protocol_type)
    }

    /// Ordered batch applied atomically
    pub fn composite(steps: Vec<Operation>) -> Self {
        Self::new(ResourceAddress::root(), OperationKind::Composite(steps))
    }

    pub fn with_parameter(mut self, name: &str, value: impl Into<ModelValue>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ModelValue> {
        self.parameters.get(name)
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self.kind,
            OperationKind::ReadAttribute { .. } | OperationKind::ReadResource(_)
        )
    }

    /// Flatten into primitive steps; nested composites are inlined
    pub fn steps(self) -> Vec<Operation> {
        match self.kind {
            OperationKind::Composite(steps) => steps.into_iter().flat_map(Operation::steps).collect(),
            _ => vec![self],
        }
    }
}

/// Successful result of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Empty,
    Value(ModelValue),
    Resource(ResourceSnapshot),
    /// One result per composite step
    Composite(Vec<OperationResult>),
}

/// Outcome reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Success { result: OperationResult },
    Failed { failure: ControllerError },
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success { .. })
    }

    pub fn failure(&self) -> Option<&ControllerError> {
        match self {
            OperationOutcome::Failed { failure } => Some(failure),
            OperationOutcome::Success { .. } => None,
        }
    }

    pub fn result(&self) -> Option<&OperationResult> {
        match self {
            OperationOutcome::Success { result } => Some(result),
            OperationOutcome::Failed { .. } => None,
        }
    }
}

/// Per-submission execution controls
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Roll back once runtime step `k` (1-based) has completed
    pub abort_after_runtime_step: Option<usize>,
    /// Cancels the transaction if triggered before commit
    pub cancel: Option<CancellationToken>,
}

impl ExecutionOptions {
    pub fn abort_after_runtime_step(mut self, step: usize) -> Self {
        self.abort_after_runtime_step = Some(step);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> ResourceAddress {
        ResourceAddress::from_pairs(&[("stack", "s1")]).unwrap()
    }

    #[test]
    fn test_nested_composites_are_flattened() {
        let inner = Operation::composite(vec![
            Operation::add(stack()),
            Operation::remove(stack()),
        ]);
        let outer = Operation::composite(vec![inner, Operation::add(stack())]);
        let kinds: Vec<&str> = outer.steps().iter().map(|op| op.kind.name()).collect();
        assert_eq!(kinds, vec!["add", "remove", "add"]);
    }

    #[test]
    fn test_legacy_protocol_operation_carries_type() {
        let op = Operation::add_protocol(stack(), "MPING");
        assert_eq!(op.parameter("type"), Some(&ModelValue::from("MPING")));
        assert_eq!(op.kind.name(), "add-protocol");
    }

    #[test]
    fn test_cancellation_flag() {
        let token = CancellationToken::new();
        let options = ExecutionOptions::default().with_cancellation(token.clone());
        assert!(!options.is_cancelled());
        token.cancel();
        assert!(options.is_cancelled());
    }
}
