// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transaction Lifecycle State Machine
//!
//! ```text
//! Pending → ModelPhase → RuntimePhase → Committed
//!    │          │             │
//!    └──────────┴─────────────┴──→ RollingBack → RolledBack
//! ```
//!
//! Committed and RolledBack are terminal. A failure during the runtime phase
//! is critical: services may already have changed and must be compensated.

use serde::{Deserialize, Serialize};

use super::{StateMachine, TransitionError, TransitionResult};

/// Phase of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    Pending,
    ModelPhase,
    RuntimePhase,
    Committed,
    RollingBack,
    RolledBack,
}

/// Transaction lifecycle input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionInput {
    BeginModel,
    BeginRuntime,
    Commit,
    Fail { reason: String },
    RollbackComplete,
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutput {
    /// Warnings generated during transition
    pub warnings: Vec<String>,

    /// Whether runtime state has to be compensated
    pub is_critical: bool,
}

impl TransitionOutput {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            is_critical: false,
        }
    }

    pub fn with_warnings(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: false,
        }
    }

    pub fn critical(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: true,
        }
    }
}

impl StateMachine for TransactionState {
    type Input = TransactionInput;
    type Output = TransitionOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        use TransactionInput::*;
        use TransactionState::*;

        if self.is_terminal() {
            return Err(TransitionError::Terminal(format!("{:?}", self)));
        }

        match (self, input) {
            (Pending, BeginModel) => Ok((ModelPhase, TransitionOutput::ok())),
            (ModelPhase, BeginRuntime) => Ok((RuntimePhase, TransitionOutput::ok())),
            (RuntimePhase, Commit) => Ok((Committed, TransitionOutput::ok())),
            (Pending | ModelPhase, Fail { reason }) => Ok((
                RollingBack,
                TransitionOutput::with_warnings(vec![reason.clone()]),
            )),
            (RuntimePhase, Fail { reason }) => {
                Ok((RollingBack, TransitionOutput::critical(vec![reason.clone()])))
            }
            (RollingBack, RollbackComplete) => Ok((RolledBack, TransitionOutput::ok())),
            _ => Err(TransitionError::invalid(self, input)),
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::RolledBack)
    }
}
