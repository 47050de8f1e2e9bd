// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Generic state machine types for the two lifecycles the controller drives:
//! a service's install/start/stop/remove lifecycle and a transaction's
//! model-phase/runtime-phase/commit lifecycle. Transitions are pure
//! functions; the graph and the coordinator apply them and reject anything
//! the machine does not allow.
//!
//! # State Machine Type
//!
//! Both lifecycles are **Mealy machines**: the output depends on the current
//! state and the input.
//!
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! # Example
//!
//! ```rust
//! use cim_stack_controller::state_machine::{StateMachine, ServiceCommand, ServiceState};
//!
//! let (state, _) = ServiceState::Uninstalled
//!     .transition(&ServiceCommand::Install)
//!     .unwrap();
//! assert_eq!(state, ServiceState::Installing);
//! assert!(!state.can_transition(&ServiceCommand::Stop));
//! ```

pub mod service_lifecycle;
pub mod transaction_lifecycle;

pub use service_lifecycle::{ServiceCommand, ServiceState};
pub use transaction_lifecycle::{TransactionInput, TransactionState, TransitionOutput};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state with this input is not allowed
    #[error("Invalid transition from {from} on {input}")]
    InvalidTransition { from: String, input: String },

    /// Terminal state reached, nothing further is accepted
    #[error("State {0} is terminal")]
    Terminal(String),
}

impl TransitionError {
    pub(crate) fn invalid(from: impl std::fmt::Debug, input: impl std::fmt::Debug) -> Self {
        TransitionError::InvalidTransition {
            from: format!("{:?}", from),
            input: format!("{:?}", input),
        }
    }
}

/// Trait for finite state machines with typed states, inputs and outputs
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }

    /// Whether no further input is accepted
    fn is_terminal(&self) -> bool {
        false
    }
}

/// Recorded state change
#[derive(Debug, Clone)]
pub struct Transition<S, I> {
    pub from: S,
    pub to: S,
    pub input: I,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// State machine that keeps its transition history
///
/// The transaction coordinator uses this to keep an auditable trail of the
/// phases a unit of work went through.
#[derive(Debug, Clone)]
pub struct StateMachineWithHistory<FSM: StateMachine> {
    current: FSM,
    history: Vec<Transition<FSM, FSM::Input>>,
}

impl<FSM: StateMachine> StateMachineWithHistory<FSM> {
    pub fn new(initial: FSM) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    /// Apply `input`, recording the transition on success
    pub fn apply(
        &mut self,
        input: FSM::Input,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> TransitionResult<FSM::Output> {
        let (to, output) = self.current.transition(&input)?;
        self.history.push(Transition {
            from: self.current.clone(),
            to: to.clone(),
            input,
            timestamp,
        });
        self.current = to;
        Ok(output)
    }

    pub fn history(&self) -> &[Transition<FSM, FSM::Input>] {
        &self.history
    }

    pub fn current(&self) -> &FSM {
        &self.current
    }

    /// States visited so far, starting with the initial one
    pub fn path(&self) -> Vec<FSM> {
        let mut path = Vec::with_capacity(self.history.len() + 1);
        match self.history.first() {
            Some(first) => path.push(first.from.clone()),
            None => path.push(self.current.clone()),
        }
        path.extend(self.history.iter().map(|transition| transition.to.clone()));
        path
    }
}
