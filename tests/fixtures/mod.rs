// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-stack-controller
//!
//! Provides a service factory that records every lifecycle call and can be
//! told to fail the start or stop of named services, plus the addresses and
//! operations the integration tests share.
//!
//! # Design Principles
//! - Fixtures are the ONLY place that builds the recurring operations
//! - Every service call is observable through the [`Recorder`]
//! - Failures are switched on per service name, never at random

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use cim_stack_controller::{
    Controller, ControllerConfig, ModelValue, Operation, ResourceAddress, Service, ServiceFactory, ServiceFailure,
    ServiceName, ServiceSpec,
};

pub const STACK: &str = "maximal2";

/// One observed service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Stop(String),
    Reconfigure(String),
}

/// Shared log of service calls and failure switches
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    failing_starts: Mutex<HashSet<String>>,
    failing_stops: Mutex<HashSet<String>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn starts_of(&self, service: &str) -> usize {
        self.count(|call| call == &Call::Start(service.to_string()))
    }

    pub fn stops_of(&self, service: &str) -> usize {
        self.count(|call| call == &Call::Stop(service.to_string()))
    }

    pub fn reconfigures_of(&self, service: &str) -> usize {
        self.count(|call| call == &Call::Reconfigure(service.to_string()))
    }

    pub fn fail_start(&self, service: &str) {
        self.failing_starts.lock().unwrap().insert(service.to_string());
    }

    pub fn fail_stop(&self, service: &str) {
        self.failing_stops.lock().unwrap().insert(service.to_string());
    }

    pub fn heal(&self) {
        self.failing_starts.lock().unwrap().clear();
        self.failing_stops.lock().unwrap().clear();
    }

    fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| matches(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

/// Factory whose services report to a shared [`Recorder`]
#[derive(Debug, Clone, Default)]
pub struct RecordingServiceFactory {
    pub recorder: Arc<Recorder>,
}

impl ServiceFactory for RecordingServiceFactory {
    fn create(&self, spec: &ServiceSpec) -> Arc<dyn Service> {
        Arc::new(RecordingService {
            name: spec.name.to_string(),
            recorder: self.recorder.clone(),
        })
    }
}

struct RecordingService {
    name: String,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl Service for RecordingService {
    async fn start(&self) -> Result<(), ServiceFailure> {
        tokio::task::yield_now().await;
        if self.recorder.failing_starts.lock().unwrap().contains(&self.name) {
            return Err(ServiceFailure(format!("{} refused to start", self.name)));
        }
        self.recorder.record(Call::Start(self.name.clone()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServiceFailure> {
        tokio::task::yield_now().await;
        if self.recorder.failing_stops.lock().unwrap().contains(&self.name) {
            return Err(ServiceFailure(format!("{} refused to stop", self.name)));
        }
        self.recorder.record(Call::Stop(self.name.clone()));
        Ok(())
    }

    async fn reconfigure(&self, _config: &BTreeMap<String, ModelValue>) -> Result<(), ServiceFailure> {
        self.recorder.record(Call::Reconfigure(self.name.clone()));
        Ok(())
    }
}

/// Controller backed by a recording factory
pub fn controller() -> (Controller, Arc<Recorder>) {
    controller_with(ControllerConfig::default())
}

pub fn controller_with(config: ControllerConfig) -> (Controller, Arc<Recorder>) {
    let factory = RecordingServiceFactory::default();
    let recorder = factory.recorder.clone();
    let controller = Controller::with_factory(config, Arc::new(factory)).expect("controller should build");
    (controller, recorder)
}

pub fn address(path: &str) -> ResourceAddress {
    path.parse().expect("Invalid address in test fixture")
}

pub fn stack_address(stack: &str) -> ResourceAddress {
    address(&format!("/stack={}", stack))
}

pub fn service(name: &str) -> ServiceName {
    ServiceName::new(name)
}

pub fn channel_factory(stack: &str) -> ServiceName {
    service(&format!("jgroups.stack.{}.channel-factory", stack))
}

pub fn transport_service(stack: &str) -> ServiceName {
    service(&format!("jgroups.stack.{}.transport", stack))
}

pub fn protocol_service(stack: &str, protocol: &str) -> ServiceName {
    service(&format!("jgroups.stack.{}.protocol.{}", stack, protocol))
}

/// Single-call stack add with an inline transport and protocols
pub fn structured_stack_add(stack: &str, transport: &str, protocols: &[&str]) -> Operation {
    Operation::add(stack_address(stack))
        .with_parameter("transport", ModelValue::object([("type", transport)]))
        .with_parameter(
            "protocols",
            protocols
                .iter()
                .map(|protocol| ModelValue::object([("type", *protocol)]))
                .collect::<Vec<_>>(),
        )
}

/// The same stack built as a composite of separate adds
pub fn composite_stack_add(stack: &str, transport: &str, protocols: &[&str]) -> Operation {
    let stack_address = stack_address(stack);
    let mut steps = vec![
        Operation::add(stack_address.clone()),
        Operation::add(stack_address.child("transport", transport).expect("valid transport")),
    ];
    steps.extend(
        protocols
            .iter()
            .map(|protocol| Operation::add(stack_address.child("protocol", protocol).expect("valid protocol"))),
    );
    Operation::composite(steps)
}

/// Legacy address of a stack's transport
pub fn legacy_transport(stack: &str) -> ResourceAddress {
    address(&format!("/stack={}/transport=TRANSPORT", stack))
}
