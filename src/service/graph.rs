// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Dependency Graph
//!
//! Registry of installed services with dependency edges. Every lifecycle
//! change goes through the [`ServiceState`] state machine, so the graph
//! cannot, for instance, remove a service that is still up without stopping
//! it first.
//!
//! # Dependency Rules
//!
//! - A service starts only when every dependency is up
//! - A service with up dependents cannot be stopped or removed unless the
//!   caller cascades; cascading stops dependents (dependents first) and
//!   leaves them installed, waiting for the dependency to return
//! - [`ServiceGraph::start_ready`] starts every waiting service whose
//!   dependencies are up, wave by wave; services within a wave start
//!   concurrently

use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Service, ServiceKind, ServiceName, ServiceSpec};
use crate::errors::{ControllerError, ControllerResult};
use crate::model::ModelValue;
use crate::state_machine::{ServiceCommand, ServiceState, StateMachine};

struct ServiceEntry {
    spec: ServiceSpec,
    service: Arc<dyn Service>,
    state: ServiceState,
}

/// Read-only view of one service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub name: ServiceName,
    pub kind: ServiceKind,
    pub state: ServiceState,
    pub config: BTreeMap<String, ModelValue>,
    pub dependencies: Vec<ServiceName>,
    pub dependents: Vec<ServiceName>,
}

/// A service taken out of the graph, kept so it can be reinstalled
#[derive(Clone)]
pub struct RemovedService {
    pub spec: ServiceSpec,
    pub service: Arc<dyn Service>,
    pub was_up: bool,
    /// Dependents stopped by a cascading removal, dependents first
    pub stopped_dependents: Vec<ServiceName>,
}

impl fmt::Debug for RemovedService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemovedService")
            .field("spec", &self.spec)
            .field("was_up", &self.was_up)
            .field("stopped_dependents", &self.stopped_dependents)
            .finish()
    }
}

/// Outcome of [`ServiceGraph::start_ready`]
#[derive(Debug, Default)]
pub struct StartReport {
    pub started: Vec<ServiceName>,
    pub failures: Vec<ControllerError>,
}

/// Registry of named services and their dependency edges
pub struct ServiceGraph {
    entries: HashMap<ServiceName, ServiceEntry>,
    dependencies: HashMap<ServiceName, BTreeSet<ServiceName>>,
    start_timeout: Duration,
    stop_timeout: Duration,
}

impl ServiceGraph {
    pub fn new(start_timeout: Duration, stop_timeout: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            dependencies: HashMap::new(),
            start_timeout,
            stop_timeout,
        }
    }

    /// Record that `service` requires `depends_on` to be up before it starts
    pub fn declare_dependency(&mut self, service: &ServiceName, depends_on: &ServiceName) {
        self.dependencies
            .entry(service.clone())
            .or_default()
            .insert(depends_on.clone());
    }

    /// Install a service; it stays `installing` until started
    ///
    /// The spec's dependencies replace any edges recorded for an earlier
    /// installation under the same name.
    pub fn install(&mut self, spec: ServiceSpec, service: Arc<dyn Service>) -> ControllerResult<()> {
        let state = self.snapshot(&spec.name);
        if state.is_installed() {
            return Err(ControllerError::AlreadyInstalled(spec.name));
        }
        let (next, ()) = state.transition(&ServiceCommand::Install)?;

        self.dependencies
            .insert(spec.name.clone(), spec.dependencies.iter().cloned().collect());
        debug!(service = %spec.name, dependencies = ?spec.dependencies, "service installed");
        self.entries.insert(
            spec.name.clone(),
            ServiceEntry {
                spec,
                service,
                state: next,
            },
        );
        Ok(())
    }

    /// Current lifecycle state; `uninstalled` for unknown names
    pub fn snapshot(&self, name: &ServiceName) -> ServiceState {
        self.entries
            .get(name)
            .map(|entry| entry.state)
            .unwrap_or(ServiceState::Uninstalled)
    }

    pub fn is_up(&self, name: &ServiceName) -> bool {
        self.snapshot(name) == ServiceState::Up
    }

    pub fn spec(&self, name: &ServiceName) -> Option<&ServiceSpec> {
        self.entries
            .get(name)
            .filter(|entry| entry.state.is_installed())
            .map(|entry| &entry.spec)
    }

    pub fn descriptor(&self, name: &ServiceName) -> Option<ServiceDescriptor> {
        let entry = self.entries.get(name)?;
        Some(ServiceDescriptor {
            name: name.clone(),
            kind: entry.spec.kind,
            state: entry.state,
            config: entry.spec.config.clone(),
            dependencies: self.dependencies_of(name),
            dependents: self.dependents_of(name),
        })
    }

    /// Names of all installed services, sorted
    pub fn installed(&self) -> Vec<ServiceName> {
        let mut names: Vec<ServiceName> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.state.is_installed())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn dependencies_of(&self, name: &ServiceName) -> Vec<ServiceName> {
        self.dependencies
            .get(name)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Installed services that directly depend on `name`
    pub fn dependents_of(&self, name: &ServiceName) -> Vec<ServiceName> {
        let mut dependents: Vec<ServiceName> = self
            .dependencies
            .iter()
            .filter(|(dependent, deps)| deps.contains(name) && self.snapshot(dependent).is_installed())
            .map(|(dependent, _)| dependent.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// Dependencies of `name` that are not up
    pub fn missing_dependencies(&self, name: &ServiceName) -> Vec<ServiceName> {
        self.dependencies_of(name)
            .into_iter()
            .filter(|dependency| !self.is_up(dependency))
            .collect()
    }

    /// Order `names` so that dependencies come before dependents
    pub fn install_order(&self, names: &[ServiceName]) -> Vec<ServiceName> {
        let wanted: BTreeSet<ServiceName> = names.iter().cloned().collect();
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(wanted.len());
        for name in &wanted {
            self.visit(name, &wanted, &mut visited, &mut order);
        }
        order
    }

    /// Order `names` so that dependents come before dependencies
    pub fn removal_order(&self, names: &[ServiceName]) -> Vec<ServiceName> {
        let mut order = self.install_order(names);
        order.reverse();
        order
    }

    fn visit(
        &self,
        name: &ServiceName,
        wanted: &BTreeSet<ServiceName>,
        visited: &mut HashSet<ServiceName>,
        order: &mut Vec<ServiceName>,
    ) {
        if !visited.insert(name.clone()) {
            return;
        }
        if let Some(deps) = self.dependencies.get(name) {
            for dependency in deps {
                self.visit(dependency, wanted, visited, order);
            }
        }
        if wanted.contains(name) {
            order.push(name.clone());
        }
    }

    fn apply(&mut self, name: &ServiceName, command: ServiceCommand) -> ControllerResult<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| ControllerError::ServiceNotFound(name.clone()))?;
        let (next, ()) = entry.state.transition(&command)?;
        entry.state = next;
        Ok(())
    }

    fn installed_entry(&self, name: &ServiceName) -> ControllerResult<&ServiceEntry> {
        self.entries
            .get(name)
            .filter(|entry| entry.state.is_installed())
            .ok_or_else(|| ControllerError::ServiceNotFound(name.clone()))
    }

    /// Start a service whose dependencies are all up
    pub async fn start(&mut self, name: &ServiceName) -> ControllerResult<()> {
        let entry = self.installed_entry(name)?;
        if entry.state == ServiceState::Up {
            return Ok(());
        }
        if !entry.state.can_transition(&ServiceCommand::Start) {
            return Err(ControllerError::InvalidTransition(format!(
                "cannot start {} while {}",
                name, entry.state
            )));
        }
        let missing = self.missing_dependencies(name);
        if !missing.is_empty() {
            return Err(ControllerError::DependencyUnsatisfied {
                service: name.clone(),
                missing,
            });
        }

        let service = entry.service.clone();
        call_start(name, service, self.start_timeout).await?;
        self.apply(name, ServiceCommand::Start)?;
        info!(service = %name, "service up");
        Ok(())
    }

    /// Up services that depend on `name`, directly or transitively
    fn active_dependents_closure(&self, name: &ServiceName) -> Vec<ServiceName> {
        let mut found = BTreeSet::new();
        let mut pending = vec![name.clone()];
        while let Some(current) = pending.pop() {
            for dependent in self.dependents_of(&current) {
                if self.is_up(&dependent) && found.insert(dependent.clone()) {
                    pending.push(dependent);
                }
            }
        }
        found.into_iter().collect()
    }

    async fn stop_one(&mut self, name: &ServiceName) -> ControllerResult<()> {
        let service = self.installed_entry(name)?.service.clone();
        self.apply(name, ServiceCommand::Stop)?;
        match call_stop(name, service, self.stop_timeout).await {
            Ok(()) => {
                self.apply(name, ServiceCommand::StopCompleted)?;
                info!(service = %name, "service down");
                Ok(())
            }
            Err(err) => {
                self.apply(name, ServiceCommand::StopFailed)?;
                warn!(service = %name, error = %err, "service failed to stop");
                Err(err)
            }
        }
    }

    /// Stop a service, leaving it installed
    ///
    /// Returns every service stopped, dependents first and `name` last.
    pub async fn stop(&mut self, name: &ServiceName, cascade: bool) -> ControllerResult<Vec<ServiceName>> {
        if self.installed_entry(name)?.state != ServiceState::Up {
            return Ok(Vec::new());
        }

        let dependents = self.active_dependents_closure(name);
        if !dependents.is_empty() && !cascade {
            let direct: Vec<ServiceName> = self
                .dependents_of(name)
                .into_iter()
                .filter(|dependent| self.is_up(dependent))
                .collect();
            return Err(ControllerError::DependentsStillActive {
                service: name.clone(),
                dependents: direct,
            });
        }

        let mut stopped = Vec::with_capacity(dependents.len() + 1);
        for dependent in self.removal_order(&dependents) {
            self.stop_one(&dependent).await?;
            stopped.push(dependent);
        }
        self.stop_one(name).await?;
        stopped.push(name.clone());
        Ok(stopped)
    }

    /// Remove a service: `up → stopping → removed`
    pub async fn remove(&mut self, name: &ServiceName, cascade: bool) -> ControllerResult<RemovedService> {
        let was_up = self.installed_entry(name)?.state == ServiceState::Up;
        let mut stopped = self.stop(name, cascade).await?;
        stopped.retain(|stopped_name| stopped_name != name);

        self.apply(name, ServiceCommand::Remove)?;
        let entry = self.installed_or_removed(name)?;
        debug!(service = %name, "service removed");
        Ok(RemovedService {
            spec: entry.spec.clone(),
            service: entry.service.clone(),
            was_up,
            stopped_dependents: stopped,
        })
    }

    fn installed_or_removed(&self, name: &ServiceName) -> ControllerResult<&ServiceEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| ControllerError::ServiceNotFound(name.clone()))
    }

    /// Start every installed service whose dependencies are up
    pub async fn start_ready(&mut self) -> StartReport {
        let mut report = StartReport::default();
        let mut failed: HashSet<ServiceName> = HashSet::new();

        loop {
            let mut ready: Vec<(ServiceName, Arc<dyn Service>)> = self
                .entries
                .iter()
                .filter(|(name, entry)| {
                    entry.state == ServiceState::Installing
                        && !failed.contains(*name)
                        && self.missing_dependencies(name).is_empty()
                })
                .map(|(name, entry)| (name.clone(), entry.service.clone()))
                .collect();
            if ready.is_empty() {
                break;
            }
            ready.sort_by(|a, b| a.0.cmp(&b.0));

            let limit = self.start_timeout;
            let results = join_all(
                ready
                    .iter()
                    .map(|(name, service)| call_start(name, service.clone(), limit)),
            )
            .await;

            for ((name, _), result) in ready.into_iter().zip(results) {
                match result.and_then(|()| self.apply(&name, ServiceCommand::Start)) {
                    Ok(()) => {
                        info!(service = %name, "service up");
                        report.started.push(name);
                    }
                    Err(err) => {
                        warn!(service = %name, error = %err, "waiting service failed to start");
                        failed.insert(name);
                        report.failures.push(err);
                    }
                }
            }
        }
        report
    }

    /// Replace a service's configuration, pushing it to the running service
    ///
    /// Returns the previous configuration.
    pub async fn reconfigure(
        &mut self,
        name: &ServiceName,
        config: BTreeMap<String, ModelValue>,
    ) -> ControllerResult<BTreeMap<String, ModelValue>> {
        let entry = self.installed_entry(name)?;
        if entry.state == ServiceState::Up {
            let service = entry.service.clone();
            match tokio::time::timeout(self.start_timeout, service.reconfigure(&config)).await {
                Ok(Ok(())) => {}
                Ok(Err(failure)) => {
                    return Err(ControllerError::ServiceStart {
                        service: name.clone(),
                        reason: format!("reconfiguration failed: {}", failure),
                    })
                }
                Err(_) => return Err(ControllerError::Timeout(format!("reconfiguration of {}", name))),
            }
        }

        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| ControllerError::ServiceNotFound(name.clone()))?;
        debug!(service = %name, "service configuration replaced");
        Ok(std::mem::replace(&mut entry.spec.config, config))
    }

    /// Stop and remove every service, dependents first
    pub async fn shutdown(&mut self) -> Vec<ControllerError> {
        let mut failures = Vec::new();
        for name in self.removal_order(&self.installed()) {
            if let Err(err) = self.remove(&name, true).await {
                failures.push(err);
            }
        }
        failures
    }
}

async fn call_start(name: &ServiceName, service: Arc<dyn Service>, limit: Duration) -> ControllerResult<()> {
    match tokio::time::timeout(limit, service.start()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(failure)) => Err(ControllerError::ServiceStart {
            service: name.clone(),
            reason: failure.0,
        }),
        Err(_) => Err(ControllerError::Timeout(format!("start of {}", name))),
    }
}

async fn call_stop(name: &ServiceName, service: Arc<dyn Service>, limit: Duration) -> ControllerResult<()> {
    match tokio::time::timeout(limit, service.stop()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(failure)) => Err(ControllerError::ServiceStop {
            service: name.clone(),
            reason: failure.0,
        }),
        Err(_) => Err(ControllerError::Timeout(format!("stop of {}", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceFailure;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Probe {
        name: String,
        events: Arc<Mutex<Vec<String>>>,
        fail_start: bool,
        hang: bool,
    }

    #[async_trait]
    impl Service for Probe {
        async fn start(&self) -> Result<(), ServiceFailure> {
            if self.hang {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.fail_start {
                return Err(ServiceFailure("refused".to_string()));
            }
            self.events.lock().unwrap().push(format!("start {}", self.name));
            Ok(())
        }

        async fn stop(&self) -> Result<(), ServiceFailure> {
            self.events.lock().unwrap().push(format!("stop {}", self.name));
            Ok(())
        }
    }

    fn graph() -> ServiceGraph {
        ServiceGraph::new(Duration::from_millis(200), Duration::from_millis(200))
    }

    fn name(s: &str) -> ServiceName {
        ServiceName::new(s)
    }

    fn install(graph: &mut ServiceGraph, events: &Arc<Mutex<Vec<String>>>, service: &str, deps: &[&str]) {
        let mut spec = ServiceSpec::new(name(service), ServiceKind::Protocol);
        for dep in deps {
            spec = spec.depends_on(name(dep));
        }
        let probe = Probe {
            name: service.to_string(),
            events: events.clone(),
            ..Default::default()
        };
        graph.install(spec, Arc::new(probe)).unwrap();
    }

    #[tokio::test]
    async fn test_install_twice_fails() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "transport", &[]);
        let again = graph.install(
            ServiceSpec::new(name("transport"), ServiceKind::Transport),
            Arc::new(Probe::default()),
        );
        assert_eq!(again, Err(ControllerError::AlreadyInstalled(name("transport"))));
    }

    #[tokio::test]
    async fn test_start_requires_dependencies() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "factory", &["transport"]);

        let result = graph.start(&name("factory")).await;
        assert_eq!(
            result,
            Err(ControllerError::DependencyUnsatisfied {
                service: name("factory"),
                missing: vec![name("transport")],
            })
        );
        assert_eq!(graph.snapshot(&name("factory")), ServiceState::Installing);
    }

    #[tokio::test]
    async fn test_start_ready_follows_dependency_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "channel", &["factory"]);
        install(&mut graph, &events, "factory", &["transport"]);
        install(&mut graph, &events, "transport", &[]);

        let report = graph.start_ready().await;
        assert_eq!(report.started, vec![name("transport"), name("factory"), name("channel")]);
        assert!(report.failures.is_empty());
        assert_eq!(
            *events.lock().unwrap(),
            vec!["start transport", "start factory", "start channel"]
        );
    }

    #[tokio::test]
    async fn test_remove_with_active_dependents() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "transport", &[]);
        install(&mut graph, &events, "factory", &["transport"]);
        install(&mut graph, &events, "channel", &["factory"]);
        graph.start_ready().await;

        let blocked = graph.remove(&name("transport"), false).await;
        assert!(matches!(blocked, Err(ControllerError::DependentsStillActive { .. })));
        assert!(graph.is_up(&name("transport")));

        let removed = graph.remove(&name("transport"), true).await.unwrap();
        assert!(removed.was_up);
        assert_eq!(removed.stopped_dependents, vec![name("channel"), name("factory")]);
        assert_eq!(graph.snapshot(&name("transport")), ServiceState::Removed);
        assert_eq!(graph.snapshot(&name("factory")), ServiceState::Installing);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "start transport",
                "start factory",
                "start channel",
                "stop channel",
                "stop factory",
                "stop transport"
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_twice_fails() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "transport", &[]);
        graph.remove(&name("transport"), false).await.unwrap();
        assert!(matches!(
            graph.remove(&name("transport"), false).await,
            Err(ControllerError::ServiceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reinstall_after_remove_restarts_waiting_dependents() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "transport", &[]);
        install(&mut graph, &events, "factory", &["transport"]);
        graph.start_ready().await;

        let removed = graph.remove(&name("transport"), true).await.unwrap();
        graph.install(removed.spec, removed.service).unwrap();
        let report = graph.start_ready().await;
        assert_eq!(report.started, vec![name("transport"), name("factory")]);
    }

    #[tokio::test]
    async fn test_start_failure_leaves_service_installing() {
        let mut graph = graph();
        let probe = Probe {
            name: "broken".to_string(),
            fail_start: true,
            ..Default::default()
        };
        graph
            .install(ServiceSpec::new(name("broken"), ServiceKind::Transport), Arc::new(probe))
            .unwrap();
        let result = graph.start(&name("broken")).await;
        assert!(matches!(result, Err(ControllerError::ServiceStart { .. })));
        assert_eq!(graph.snapshot(&name("broken")), ServiceState::Installing);
    }

    #[tokio::test]
    async fn test_start_timeout() {
        let mut graph = ServiceGraph::new(Duration::from_millis(20), Duration::from_millis(20));
        let probe = Probe {
            name: "slow".to_string(),
            hang: true,
            ..Default::default()
        };
        graph
            .install(ServiceSpec::new(name("slow"), ServiceKind::Transport), Arc::new(probe))
            .unwrap();
        assert!(matches!(
            graph.start(&name("slow")).await,
            Err(ControllerError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_reconfigure_keeps_service_up() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "pool", &[]);
        graph.start(&name("pool")).await.unwrap();

        let mut config = BTreeMap::new();
        config.insert("keepalive-time".to_string(), ModelValue::Int(999));
        let previous = graph.reconfigure(&name("pool"), config.clone()).await.unwrap();
        assert!(previous.is_empty());
        assert!(graph.is_up(&name("pool")));
        assert_eq!(graph.descriptor(&name("pool")).unwrap().config, config);
        assert_eq!(*events.lock().unwrap(), vec!["start pool"]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_dependents_first() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut graph = graph();
        install(&mut graph, &events, "transport", &[]);
        install(&mut graph, &events, "factory", &["transport"]);
        graph.start_ready().await;
        events.lock().unwrap().clear();

        assert!(graph.shutdown().await.is_empty());
        assert!(graph.installed().is_empty());
        assert_eq!(*events.lock().unwrap(), vec!["stop factory", "stop transport"]);
    }
}
