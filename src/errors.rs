//! Error types for controller operations

use thiserror::Error;
use uuid::Uuid;

use crate::address::ResourceAddress;
use crate::service::ServiceName;

/// Errors that can occur while executing management operations
///
/// Every variant except the alias-authoring ones is recovered by the
/// transaction coordinator and reported to the caller as a failed outcome.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    /// Generic parameter or request validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// A required parameter was not supplied
    #[error("Missing required parameter '{0}'")]
    MissingParameter(String),

    /// A parameter or attribute value is not legal for its definition
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    /// Attribute is not declared by the resource type
    #[error("Unknown attribute '{name}' for resource type '{resource_type}'")]
    UnknownAttribute { resource_type: String, name: String },

    /// No handler registered for the leaf segment's type
    #[error("Unknown resource type '{0}'")]
    UnknownResourceType(String),

    /// Operation name is not supported by the target resource
    #[error("Operation '{operation}' not supported at {address}")]
    UnsupportedOperation {
        operation: String,
        address: ResourceAddress,
    },

    /// Address does not name a live resource
    #[error("Resource not found: {0}")]
    ResourceNotFound(ResourceAddress),

    /// Address already names a live resource
    #[error("Duplicate resource: {0}")]
    DuplicateResource(ResourceAddress),

    /// Service cannot start because dependencies are not up
    #[error("Service {service} has unsatisfied dependencies: {missing:?}")]
    DependencyUnsatisfied {
        service: ServiceName,
        missing: Vec<ServiceName>,
    },

    /// Service cannot be removed while dependents are up
    #[error("Service {service} still has active dependents: {dependents:?}")]
    DependentsStillActive {
        service: ServiceName,
        dependents: Vec<ServiceName>,
    },

    /// Service is not installed
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceName),

    /// Service is already installed
    #[error("Service already installed: {0}")]
    AlreadyInstalled(ServiceName),

    /// Service collaborator failed to start
    #[error("Service {service} failed to start: {reason}")]
    ServiceStart { service: ServiceName, reason: String },

    /// Service collaborator failed to stop
    #[error("Service {service} failed to stop: {reason}")]
    ServiceStop { service: ServiceName, reason: String },

    /// Service lifecycle call did not complete in time
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Lifecycle state machine rejected a transition
    #[error("Invalid lifecycle transition: {0}")]
    InvalidTransition(String),

    /// Fixed aliases form a cycle
    #[error("Alias cycle detected: {0}")]
    AliasCycle(String),

    /// Attribute alias transforms do not round trip
    #[error("Alias transform for '{alias}' is not lossless for {value}")]
    AliasTransformMismatch { alias: String, value: String },

    /// Transaction was marked rollback-only after its runtime phase
    #[error("Rollback requested after runtime step {0}")]
    RollbackRequested(usize),

    /// Transaction was cancelled before commit
    #[error("Transaction cancelled")]
    Cancelled,

    /// Controller has been shut down
    #[error("Controller is shut down")]
    ShutDown,
}

/// Result type for controller operations
pub type ControllerResult<T> = Result<T, ControllerError>;

impl ControllerError {
    /// Whether the failure was detected before any mutation happened
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ControllerError::Validation(_)
                | ControllerError::MissingParameter(_)
                | ControllerError::InvalidValue { .. }
                | ControllerError::UnknownAttribute { .. }
                | ControllerError::UnknownResourceType(_)
                | ControllerError::UnsupportedOperation { .. }
        )
    }

    /// Whether the failure came from the service layer
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            ControllerError::DependencyUnsatisfied { .. }
                | ControllerError::DependentsStillActive { .. }
                | ControllerError::ServiceNotFound(_)
                | ControllerError::AlreadyInstalled(_)
                | ControllerError::ServiceStart { .. }
                | ControllerError::ServiceStop { .. }
                | ControllerError::Timeout(_)
        )
    }
}

impl From<crate::address::AddressError> for ControllerError {
    fn from(err: crate::address::AddressError) -> Self {
        ControllerError::Validation(err.to_string())
    }
}

impl From<crate::state_machine::TransitionError> for ControllerError {
    fn from(err: crate::state_machine::TransitionError) -> Self {
        ControllerError::InvalidTransition(err.to_string())
    }
}

/// Live services no longer match any consistent model snapshot
///
/// Raised when a compensating action fails during rollback. This is never
/// folded into an ordinary failed outcome; it requires operator intervention.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Inconsistent state after rollback of transaction {transaction}: {cause}; compensation failures: {failures:?}")]
pub struct InconsistentState {
    /// Transaction whose rollback failed
    pub transaction: Uuid,

    /// Failure that triggered the rollback
    pub cause: ControllerError,

    /// Compensating actions that failed
    pub failures: Vec<ControllerError>,
}
