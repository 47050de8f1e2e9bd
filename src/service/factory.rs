// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Factory
//!
//! Creates the runtime object behind a [`ServiceSpec`]. The controller ships
//! a logging implementation; embedders plug in services that do real work.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Service, ServiceFailure, ServiceKind, ServiceName, ServiceSpec};
use crate::model::ModelValue;

/// Creates services for specs
pub trait ServiceFactory: Send + Sync {
    fn create(&self, spec: &ServiceSpec) -> Arc<dyn Service>;
}

/// Factory producing [`LoggingService`]s
#[derive(Debug, Clone, Default)]
pub struct LoggingServiceFactory;

impl ServiceFactory for LoggingServiceFactory {
    fn create(&self, spec: &ServiceSpec) -> Arc<dyn Service> {
        Arc::new(LoggingService {
            name: spec.name.clone(),
            kind: spec.kind,
        })
    }
}

/// Service that only records its lifecycle in the trace log
///
/// Start and stop run on a tokio worker and are awaited, mirroring services
/// whose startup work happens off the caller's task.
#[derive(Debug, Clone)]
pub struct LoggingService {
    name: ServiceName,
    kind: ServiceKind,
}

#[async_trait]
impl Service for LoggingService {
    async fn start(&self) -> Result<(), ServiceFailure> {
        let name = self.name.clone();
        let kind = self.kind;
        tokio::spawn(async move {
            info!(service = %name, ?kind, "service started");
        })
        .await
        .map_err(|e| ServiceFailure(e.to_string()))
    }

    async fn stop(&self) -> Result<(), ServiceFailure> {
        let name = self.name.clone();
        tokio::spawn(async move {
            info!(service = %name, "service stopped");
        })
        .await
        .map_err(|e| ServiceFailure(e.to_string()))
    }

    async fn reconfigure(&self, config: &BTreeMap<String, ModelValue>) -> Result<(), ServiceFailure> {
        debug!(service = %self.name, ?config, "service reconfigured");
        Ok(())
    }
}
