// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Lifecycle State Machine
//!
//! # States
//!
//! - Uninstalled: never installed in the graph
//! - Installing: installed, not (or no longer) up; waits for dependencies
//! - Up: started
//! - Stopping: stop in progress
//! - Removed: removed from the graph (may be installed again)
//!
//! # Inputs
//!
//! - Install: Uninstalled | Removed → Installing
//! - Start: Installing → Up
//! - Stop: Up → Stopping
//! - StopCompleted: Stopping → Installing
//! - StopFailed: Stopping → Up
//! - Remove: Installing → Removed
//!
//! A running service has to be stopped before it can be removed, which is
//! what gives removal its `up → stopping → removed` shape.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// Lifecycle state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Uninstalled,
    Installing,
    Up,
    Stopping,
    Removed,
}

impl ServiceState {
    /// Whether the service is present in the graph
    pub fn is_installed(&self) -> bool {
        matches!(
            self,
            ServiceState::Installing | ServiceState::Up | ServiceState::Stopping
        )
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceState::Uninstalled => "uninstalled",
            ServiceState::Installing => "installing",
            ServiceState::Up => "up",
            ServiceState::Stopping => "stopping",
            ServiceState::Removed => "removed",
        };
        write!(f, "{}", label)
    }
}

/// Service lifecycle input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    Install,
    Start,
    Stop,
    StopCompleted,
    StopFailed,
    Remove,
}

impl StateMachine for ServiceState {
    type Input = ServiceCommand;
    type Output = ();

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use ServiceCommand::*;
        use ServiceState::*;

        let next = match (self, input) {
            (Uninstalled | Removed, Install) => Installing,
            (Installing, Start) => Up,
            (Up, Stop) => Stopping,
            (Stopping, StopCompleted) => Installing,
            (Stopping, StopFailed) => Up,
            (Installing, Remove) => Removed,
            _ => return Err(TransitionError::invalid(self, input)),
        };
        Ok((next, ()))
    }
}
