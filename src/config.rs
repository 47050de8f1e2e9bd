// Copyright (c) 2025 - Cowboy AI, Inc.
//! Controller configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{ControllerError, ControllerResult};

/// Prefix of the environment variables read by [`ControllerConfig::from_env`]
pub const ENV_PREFIX: &str = "STACK_CONTROLLER_";

/// Configuration for a [`crate::Controller`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Subsystem name; roots the resource tree and every service name
    pub subsystem: String,
    /// Upper bound for a single service start
    pub start_timeout: Duration,
    /// Upper bound for a single service stop
    pub stop_timeout: Duration,
    /// Accept legacy addresses and attribute names
    pub legacy_aliases: bool,
    /// Log filter used when `RUST_LOG` is not set
    pub log_directive: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            subsystem: "jgroups".to_string(),
            start_timeout: Duration::from_secs(30),
            stop_timeout: Duration::from_secs(30),
            legacy_aliases: true,
            log_directive: "info".to_string(),
        }
    }
}

impl ControllerConfig {
    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_legacy_aliases(mut self, enabled: bool) -> Self {
        self.legacy_aliases = enabled;
        self
    }

    pub fn with_log_directive(mut self, directive: impl Into<String>) -> Self {
        self.log_directive = directive.into();
        self
    }

    /// Load configuration from `STACK_CONTROLLER_*` environment variables
    ///
    /// Unset variables keep their defaults:
    /// `SUBSYSTEM`, `START_TIMEOUT_MS`, `STOP_TIMEOUT_MS`, `LEGACY_ALIASES`, `LOG`.
    pub fn from_env() -> ControllerResult<Self> {
        Self::from_lookup(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ControllerResult<Self> {
        let mut config = Self::default();

        if let Some(subsystem) = lookup("SUBSYSTEM") {
            config.subsystem = subsystem;
        }
        if let Some(ms) = lookup("START_TIMEOUT_MS") {
            config.start_timeout = Duration::from_millis(parse(&ms, "START_TIMEOUT_MS")?);
        }
        if let Some(ms) = lookup("STOP_TIMEOUT_MS") {
            config.stop_timeout = Duration::from_millis(parse(&ms, "STOP_TIMEOUT_MS")?);
        }
        if let Some(enabled) = lookup("LEGACY_ALIASES") {
            config.legacy_aliases = parse(&enabled, "LEGACY_ALIASES")?;
        }
        if let Some(directive) = lookup("LOG") {
            config.log_directive = directive;
        }
        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &str) -> ControllerResult<T> {
    raw.trim().parse().map_err(|_| ControllerError::InvalidValue {
        name: format!("{}{}", ENV_PREFIX, key),
        reason: format!("cannot parse '{}'", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.subsystem, "jgroups");
        assert!(config.legacy_aliases);
        assert_eq!(config.start_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder() {
        let config = ControllerConfig::default()
            .with_subsystem("clustering")
            .with_start_timeout(Duration::from_millis(250))
            .with_legacy_aliases(false);
        assert_eq!(config.subsystem, "clustering");
        assert_eq!(config.start_timeout, Duration::from_millis(250));
        assert!(!config.legacy_aliases);
    }

    #[test]
    fn test_from_lookup() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("START_TIMEOUT_MS", "1500"),
            ("LEGACY_ALIASES", "false"),
            ("LOG", "cim_stack_controller=debug"),
        ]))
        .unwrap();
        assert_eq!(config.start_timeout, Duration::from_millis(1500));
        assert!(!config.legacy_aliases);
        assert_eq!(config.log_directive, "cim_stack_controller=debug");
        assert_eq!(config.subsystem, "jgroups");
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = ControllerConfig::from_lookup(lookup(&[("STOP_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(ControllerError::InvalidValue { .. })));
    }

    #[test]
    fn test_serde_round_trip_keeps_defaults_for_missing_fields() {
        let config: ControllerConfig = serde_json::from_str(r#"{"subsystem":"x"}"#).unwrap();
        assert_eq!(config.subsystem, "x");
        assert_eq!(config.stop_timeout, Duration::from_secs(30));
    }
}
