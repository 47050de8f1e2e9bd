// Copyright (c) 2025 - Cowboy AI, Inc.
//! Transactions
//!
//! Every submission runs as one transaction, whether it holds a single
//! operation or a composite.
//!
//! # Lifecycle
//!
//! ```text
//! PENDING → MODEL_PHASE → RUNTIME_PHASE → COMMITTED
//!     └──────────┴──────────────┴──→ ROLLING_BACK → ROLLED_BACK
//! ```
//!
//! The phases are tracked with a [`StateMachineWithHistory`], so a finished
//! transaction can report the exact path it took.

pub mod coordinator;
pub mod record;

use chrono::Utc;
use uuid::Uuid;

use crate::errors::ControllerResult;
use crate::state_machine::{
    StateMachineWithHistory, TransactionInput, TransactionState, TransitionOutput,
};

pub use coordinator::TransactionCoordinator;
pub use record::{ModelChange, ServiceChange, StepRecord, TransactionRecord};

/// One unit of work in flight
#[derive(Debug)]
pub struct Transaction {
    id: Uuid,
    lifecycle: StateMachineWithHistory<TransactionState>,
    record: TransactionRecord,
}

impl Transaction {
    pub fn begin() -> Self {
        Self {
            id: Uuid::now_v7(),
            lifecycle: StateMachineWithHistory::new(TransactionState::Pending),
            record: TransactionRecord::default(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        *self.lifecycle.current()
    }

    /// Phases visited so far
    pub fn path(&self) -> Vec<TransactionState> {
        self.lifecycle.path()
    }

    pub fn record(&self) -> &TransactionRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut TransactionRecord {
        &mut self.record
    }

    pub fn advance(&mut self, input: TransactionInput) -> ControllerResult<TransitionOutput> {
        Ok(self.lifecycle.apply(input, Utc::now())?)
    }
}
