// Copyright (c) 2025 - Cowboy AI, Inc.
//! Tracing setup for embedders and the test suite

use tracing_subscriber::EnvFilter;

use crate::config::ControllerConfig;
use crate::errors::{ControllerError, ControllerResult};

/// Install a global fmt subscriber
///
/// `RUST_LOG` wins over the configured directive. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &ControllerConfig) -> ControllerResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_directive)
            .map_err(|e| ControllerError::Validation(format!("invalid log directive: {}", e)))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| ControllerError::Validation(format!("tracing already initialized: {}", e)))
}
